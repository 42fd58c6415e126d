//! Indexing, slicing and item assignment.

use std::rc::Rc;

use super::{Args, Interpreter};
use crate::error::{raise, ExcKind, Exception, RtResult};
use crate::value::{DictKind, ListObj, RangeObj, SeqKind, Value};

/// An evaluated subscript.
pub(crate) enum Index {
    Item(Value),
    Slice {
        lower: Option<i64>,
        upper: Option<i64>,
        step: Option<i64>,
    },
}

impl Interpreter<'_> {
    pub(crate) fn get_item(&mut self, object: &Value, index: &Index) -> RtResult<Value> {
        match (object, index) {
            (Value::List(list), Index::Item(i)) => {
                let items = list.items.borrow();
                let pos = sequence_index(i, items.len(), object.type_name())?;
                pos.and_then(|pos| items.get(pos).cloned())
                    .ok_or_else(|| out_of_range(object.type_name()))
            }
            (Value::List(list), Index::Slice { lower, upper, step }) => {
                if list.kind == SeqKind::Deque {
                    return raise(ExcKind::TypeError, "sequence index must be integer, not 'slice'");
                }
                let items = list.snapshot();
                let picked = slice_positions(items.len(), *lower, *upper, *step)?
                    .into_iter()
                    .map(|pos| items[pos].clone())
                    .collect();
                Ok(Value::list(picked))
            }
            (Value::Tuple(items), Index::Item(i)) => sequence_index(i, items.len(), "tuple")?
                .and_then(|pos| items.get(pos).cloned())
                .ok_or_else(|| out_of_range("tuple")),
            (Value::Tuple(items), Index::Slice { lower, upper, step }) => {
                let picked = slice_positions(items.len(), *lower, *upper, *step)?
                    .into_iter()
                    .map(|pos| items[pos].clone())
                    .collect();
                Ok(Value::tuple(picked))
            }
            (Value::Str(text), Index::Item(i)) => {
                let len = text.chars().count();
                sequence_index(i, len, "string")?
                    .and_then(|pos| text.chars().nth(pos))
                    .map(|c| Value::str(c.encode_utf8(&mut [0; 4])))
                    .ok_or_else(|| out_of_range("string"))
            }
            (Value::Str(text), Index::Slice { lower, upper, step }) => {
                let chars: Vec<char> = text.chars().collect();
                let picked: String = slice_positions(chars.len(), *lower, *upper, *step)?
                    .into_iter()
                    .map(|pos| chars[pos])
                    .collect();
                Ok(Value::str(picked))
            }
            (Value::Range(range), Index::Item(i)) => sequence_index(i, range.len(), "range object")?
                .and_then(|pos| range.get(pos))
                .map(Value::Int)
                .ok_or_else(|| out_of_range("range object")),
            (Value::Range(range), Index::Slice { lower, upper, step }) => {
                let (start, stop, step) = adjust_slice(range.len(), *lower, *upper, *step)?;
                Ok(Value::Range(RangeObj {
                    start: range.start + start * range.step,
                    stop: range.start + stop * range.step,
                    step: range.step * step,
                }))
            }
            (Value::Dict(dict), Index::Item(key)) => {
                if let Some(value) = dict.get(key)? {
                    return Ok(value);
                }
                match &dict.kind {
                    DictKind::DefaultDict(factory) if !matches!(factory, Value::None) => {
                        let value = self.call_value(factory, Args::default())?;
                        dict.insert(key.clone(), value.clone())?;
                        Ok(value)
                    }
                    DictKind::Counter => Ok(Value::Int(0)),
                    _ => Err(Exception::with_args(ExcKind::KeyError, vec![key.clone()])),
                }
            }
            (Value::Instance(instance), Index::Item(key)) => {
                match instance.class.lookup("__getitem__") {
                    Some(method) => self.call_value(
                        &method,
                        Args::positional(vec![object.clone(), key.clone()]),
                    ),
                    None => not_subscriptable(object),
                }
            }
            (Value::Dict(_), Index::Slice { .. }) => {
                raise(ExcKind::TypeError, "unhashable type: 'slice'")
            }
            _ => not_subscriptable(object),
        }
    }

    pub(crate) fn set_item(&mut self, object: &Value, index: &Index, value: Value) -> RtResult<()> {
        match (object, index) {
            (Value::List(list), Index::Item(i)) => {
                let mut items = list.items.borrow_mut();
                let len = items.len();
                match sequence_index(i, len, object.type_name())? {
                    Some(pos) if pos < len => {
                        items[pos] = value;
                        Ok(())
                    }
                    _ => raise(
                        ExcKind::IndexError,
                        format!("{} assignment index out of range", object.type_name()),
                    ),
                }
            }
            (Value::List(list), Index::Slice { lower, upper, step }) => {
                let replacement = self.iter_values(&value)?;
                assign_slice(list, *lower, *upper, *step, replacement)
            }
            (Value::Dict(dict), Index::Item(key)) => dict.insert(key.clone(), value),
            (Value::Instance(instance), Index::Item(key)) => {
                match instance.class.lookup("__setitem__") {
                    Some(method) => {
                        self.call_value(
                            &method,
                            Args::positional(vec![object.clone(), key.clone(), value]),
                        )?;
                        Ok(())
                    }
                    None => no_item_assignment(object),
                }
            }
            _ => no_item_assignment(object),
        }
    }

    pub(crate) fn del_item(&mut self, object: &Value, index: &Index) -> RtResult<()> {
        match (object, index) {
            (Value::List(list), Index::Item(i)) => {
                let mut items = list.items.borrow_mut();
                let len = items.len();
                match sequence_index(i, len, object.type_name())? {
                    Some(pos) if pos < len => {
                        items.remove(pos);
                        Ok(())
                    }
                    _ => raise(
                        ExcKind::IndexError,
                        format!("{} assignment index out of range", object.type_name()),
                    ),
                }
            }
            (Value::List(list), Index::Slice { lower, upper, step }) => {
                let len = list.len();
                let mut doomed = slice_positions(len, *lower, *upper, *step)?;
                doomed.sort_unstable();
                let mut items = list.items.borrow_mut();
                for pos in doomed.into_iter().rev() {
                    items.remove(pos);
                }
                Ok(())
            }
            (Value::Dict(dict), Index::Item(key)) => match dict.remove(key)? {
                Some(_) => Ok(()),
                None => Err(Exception::with_args(ExcKind::KeyError, vec![key.clone()])),
            },
            (Value::Instance(instance), Index::Item(key)) => {
                match instance.class.lookup("__delitem__") {
                    Some(method) => {
                        self.call_value(&method, Args::positional(vec![object.clone(), key.clone()]))?;
                        Ok(())
                    }
                    None => raise(
                        ExcKind::TypeError,
                        format!("'{}' object doesn't support item deletion", object.type_name()),
                    ),
                }
            }
            _ => raise(
                ExcKind::TypeError,
                format!("'{}' object doesn't support item deletion", object.type_name()),
            ),
        }
    }
}

fn assign_slice(
    list: &Rc<ListObj>,
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
    replacement: Vec<Value>,
) -> RtResult<()> {
    let len = list.len();
    if step.unwrap_or(1) == 1 {
        let (start, stop, _) = adjust_slice(len, lower, upper, step)?;
        let start = start as usize;
        let stop = (stop as usize).max(start);
        list.items.borrow_mut().splice(start..stop, replacement);
        return Ok(());
    }
    let positions = slice_positions(len, lower, upper, step)?;
    if positions.len() != replacement.len() {
        return raise(
            ExcKind::ValueError,
            format!(
                "attempt to assign sequence of size {} to extended slice of size {}",
                replacement.len(),
                positions.len()
            ),
        );
    }
    let mut items = list.items.borrow_mut();
    for (pos, value) in positions.into_iter().zip(replacement) {
        items[pos] = value;
    }
    Ok(())
}

/// Resolves a possibly negative integer index. `Ok(None)` means out of
/// range.
pub(crate) fn sequence_index(index: &Value, len: usize, type_name: &str) -> RtResult<Option<usize>> {
    let Some(i) = index.as_int() else {
        return raise(
            ExcKind::TypeError,
            format!(
                "{type_name} indices must be integers or slices, not {}",
                index.type_name()
            ),
        );
    };
    let pos = if i < 0 { i + len as i64 } else { i };
    Ok((pos >= 0 && (pos as usize) < len).then_some(pos as usize))
}

/// Clamps slice bounds against a sequence length; the result follows the
/// usual `start, stop, step` conventions, with `stop` possibly `-1` for a
/// descending slice running to the front.
pub(crate) fn adjust_slice(
    len: usize,
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
) -> RtResult<(i64, i64, i64)> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return raise(ExcKind::ValueError, "slice step cannot be zero");
    }
    let len = len as i64;
    let clamp = |bound: i64| -> i64 {
        if bound < 0 {
            let bound = bound + len;
            if bound < 0 {
                if step < 0 {
                    -1
                } else {
                    0
                }
            } else {
                bound
            }
        } else if bound >= len {
            if step < 0 {
                len - 1
            } else {
                len
            }
        } else {
            bound
        }
    };
    let (start, stop) = if step > 0 {
        (lower.map_or(0, clamp), upper.map_or(len, clamp))
    } else {
        (lower.map_or(len - 1, clamp), upper.map_or(-1, clamp))
    };
    Ok((start, stop, step))
}

/// The positions a slice selects, in selection order.
pub(crate) fn slice_positions(
    len: usize,
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
) -> RtResult<Vec<usize>> {
    let (start, stop, step) = adjust_slice(len, lower, upper, step)?;
    let mut out = Vec::new();
    let mut pos = start;
    while (step > 0 && pos < stop) || (step < 0 && pos > stop) {
        out.push(pos as usize);
        match pos.checked_add(step) {
            Some(next) => pos = next,
            None => break,
        }
    }
    Ok(out)
}

fn out_of_range(type_name: &str) -> Exception {
    Exception::new(ExcKind::IndexError, format!("{type_name} index out of range"))
}

fn not_subscriptable<T>(object: &Value) -> RtResult<T> {
    raise(
        ExcKind::TypeError,
        format!("'{}' object is not subscriptable", object.type_name()),
    )
}

fn no_item_assignment<T>(object: &Value) -> RtResult<T> {
    raise(
        ExcKind::TypeError,
        format!("'{}' object does not support item assignment", object.type_name()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_indices_resolve_from_the_end() {
        assert_eq!(sequence_index(&Value::Int(-1), 3, "list").unwrap(), Some(2));
        assert_eq!(sequence_index(&Value::Int(3), 3, "list").unwrap(), None);
        assert_eq!(sequence_index(&Value::Int(-4), 3, "list").unwrap(), None);
        assert!(sequence_index(&Value::str("0"), 3, "list").is_err());
    }

    #[test]
    fn slices_select_positions() {
        assert_eq!(slice_positions(5, Some(1), Some(4), None).unwrap(), vec![1, 2, 3]);
        assert_eq!(slice_positions(5, None, None, Some(-1)).unwrap(), vec![4, 3, 2, 1, 0]);
        assert_eq!(slice_positions(5, None, None, Some(2)).unwrap(), vec![0, 2, 4]);
        assert_eq!(slice_positions(5, Some(-2), None, None).unwrap(), vec![3, 4]);
        assert_eq!(slice_positions(5, Some(10), Some(20), None).unwrap(), Vec::<usize>::new());
        assert!(slice_positions(5, None, None, Some(0)).is_err());
    }
}
