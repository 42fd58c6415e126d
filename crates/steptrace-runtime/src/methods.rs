//! Methods of the built-in types.
//!
//! Attribute lookup on a built-in value resolves through
//! [`native_method`] to a [`Method::Native`](crate::value::Method) bound to
//! the receiver; calling it dispatches here by receiver type and name.
//!
//! Methods that compare elements (`remove`, `index`, `count`, `sort`) may
//! run user code, so they work on a snapshot of the container and never hold
//! a borrow across the comparison.

use std::rc::Rc;

use steptrace_syntax::ast::BinOp;

use crate::error::{raise, ExcKind, Exception, RtResult};
use crate::format;
use crate::interp::{Args, Interpreter};
use crate::sort;
use crate::value::{DictKind, DictObj, End, IterObj, ListObj, SeqKind, SetObj, Value};

const LIST: &[&str] = &[
    "append", "extend", "insert", "pop", "remove", "index", "count", "reverse", "sort", "clear",
    "copy",
];

const DEQUE: &[&str] = &[
    "append", "appendleft", "extend", "extendleft", "pop", "popleft", "remove", "index", "count",
    "reverse", "rotate", "clear", "copy",
];

const DICT: &[&str] = &[
    "get", "keys", "values", "items", "pop", "popitem", "setdefault", "update", "clear", "copy",
];

const COUNTER: &[&str] = &["most_common", "elements", "subtract", "total"];

const SET: &[&str] = &[
    "add", "remove", "discard", "pop", "clear", "copy", "update", "union", "intersection",
    "difference", "symmetric_difference", "issubset", "issuperset", "isdisjoint",
];

const STR: &[&str] = &[
    "join", "split", "rsplit", "splitlines", "strip", "lstrip", "rstrip", "upper", "lower",
    "title", "capitalize", "swapcase", "replace", "startswith", "endswith", "find", "rfind",
    "index", "count", "isdigit", "isalpha", "isalnum", "isspace", "isupper", "islower", "format",
    "zfill", "center", "ljust", "rjust",
];

const TUPLE: &[&str] = &["count", "index"];

fn find(table: &'static [&'static str], name: &str) -> Option<&'static str> {
    table.iter().copied().find(|m| *m == name)
}

/// The native method `name` of `object`, if its type has one.
pub(crate) fn native_method(object: &Value, name: &str) -> Option<&'static str> {
    match object {
        Value::List(list) => match list.kind {
            SeqKind::List => find(LIST, name),
            SeqKind::Deque => find(DEQUE, name),
        },
        Value::Dict(dict) => {
            let counter = matches!(dict.kind, DictKind::Counter).then(|| find(COUNTER, name));
            counter.flatten().or_else(|| find(DICT, name))
        }
        Value::Set(_) => find(SET, name),
        Value::Str(_) => find(STR, name),
        Value::Tuple(_) => find(TUPLE, name),
        Value::Float(_) => find(&["is_integer"], name),
        Value::Exception(_) | Value::Instance(_) => find(&["__init__"], name),
        _ => None,
    }
}

fn int_arg(value: &Value) -> RtResult<i64> {
    value.as_int().ok_or_else(|| {
        Exception::new(
            ExcKind::TypeError,
            format!("'{}' object cannot be interpreted as an integer", value.type_name()),
        )
    })
}

fn str_arg<'a>(method: &str, value: &'a Value) -> RtResult<&'a str> {
    match value {
        Value::Str(text) => Ok(text),
        other => raise(
            ExcKind::TypeError,
            format!("{method}() argument must be str, not {}", other.type_name()),
        ),
    }
}

/// Resolves optional `start`/`end` arguments against a length.
fn window(args: &[Value], len: usize) -> RtResult<(usize, usize)> {
    let clamp = |value: Option<&Value>, default: usize| -> RtResult<usize> {
        match value {
            None | Some(Value::None) => Ok(default),
            Some(value) => {
                let i = int_arg(value)?;
                let len = len as i64;
                let pos = if i < 0 { (i + len).max(0) } else { i.min(len) };
                Ok(pos as usize)
            }
        }
    };
    Ok((clamp(args.first(), 0)?, clamp(args.get(1), len)?))
}

impl Interpreter<'_> {
    pub(crate) fn call_native(&mut self, receiver: &Value, name: &str, args: Args) -> RtResult<Value> {
        match receiver {
            Value::List(list) if list.kind == SeqKind::Deque => self.deque_method(list, name, args),
            Value::List(list) => self.list_method(list, name, args),
            Value::Dict(dict) => self.dict_method(dict, name, args),
            Value::Set(set) => self.set_method(set, name, args),
            Value::Str(text) => self.str_method(text, name, args),
            Value::Tuple(items) => {
                let items = items.to_vec();
                self.sequence_query(&items, "tuple", name, args)
            }
            Value::Float(f) => {
                args.finish(name)?;
                args.arity(name, 0, 0)?;
                Ok(Value::Bool(f.is_finite() && f.fract() == 0.0))
            }
            Value::Exception(exc) => {
                args.finish("__init__")?;
                *exc.args.borrow_mut() = args.positional;
                Ok(Value::None)
            }
            Value::Instance(_) => {
                if !args.is_empty() {
                    return raise(
                        ExcKind::TypeError,
                        "object.__init__() takes exactly one argument (the instance to initialize)",
                    );
                }
                Ok(Value::None)
            }
            other => raise(
                ExcKind::AttributeError,
                format!("'{}' object has no attribute '{name}'", other.type_name()),
            ),
        }
    }

    /// `count` and `index`, shared by lists, deques and tuples.
    fn sequence_query(&mut self, items: &[Value], type_name: &str, name: &str, args: Args) -> RtResult<Value> {
        args.finish(name)?;
        match name {
            "count" => {
                args.arity(name, 1, 1)?;
                let mut count = 0;
                for item in items {
                    if self.eq(item, &args.positional[0])? {
                        count += 1;
                    }
                }
                Ok(Value::Int(count))
            }
            _ => {
                args.arity(name, 1, 3)?;
                let (start, end) = window(&args.positional[1..], items.len())?;
                for (pos, item) in items.iter().enumerate().take(end).skip(start) {
                    if self.eq(item, &args.positional[0])? {
                        return Ok(Value::Int(pos as i64));
                    }
                }
                let message = match type_name {
                    "list" => format!("{} is not in list", self.repr_of(&args.positional[0])?),
                    other => format!("{other}.index(x): x not in {other}"),
                };
                raise(ExcKind::ValueError, message)
            }
        }
    }

    fn list_method(&mut self, list: &Rc<ListObj>, name: &str, mut args: Args) -> RtResult<Value> {
        if name == "sort" {
            let key = args.keyword("key");
            let reverse = match args.keyword("reverse") {
                Some(value) => self.truthy(&value)?,
                None => false,
            };
            args.finish(name)?;
            if !args.positional.is_empty() {
                return raise(ExcKind::TypeError, "sort() takes no positional arguments");
            }
            let sorted = self.sort_values(list.snapshot(), key.as_ref(), reverse)?;
            *list.items.borrow_mut() = sorted;
            return Ok(Value::None);
        }
        args.finish(name)?;
        match name {
            "append" => {
                args.arity(name, 1, 1)?;
                list.items.borrow_mut().extend(args.positional);
                Ok(Value::None)
            }
            "extend" => {
                args.arity(name, 1, 1)?;
                let items = self.iter_values(&args.positional[0])?;
                list.items.borrow_mut().extend(items);
                Ok(Value::None)
            }
            "insert" => {
                args.arity(name, 2, 2)?;
                let index = int_arg(&args.positional[0])?;
                let mut items = list.items.borrow_mut();
                let len = items.len() as i64;
                let pos = if index < 0 { (index + len).max(0) } else { index.min(len) };
                items.insert(pos as usize, args.positional[1].clone());
                Ok(Value::None)
            }
            "pop" => {
                args.arity(name, 0, 1)?;
                let mut items = list.items.borrow_mut();
                if items.is_empty() {
                    return raise(ExcKind::IndexError, "pop from empty list");
                }
                let len = items.len() as i64;
                let index = match args.positional.first() {
                    Some(value) => int_arg(value)?,
                    None => -1,
                };
                let pos = if index < 0 { index + len } else { index };
                if !(0..len).contains(&pos) {
                    return raise(ExcKind::IndexError, "pop index out of range");
                }
                if pos == 0 && !args.positional.is_empty() {
                    list.note_removal(End::Front);
                } else if pos == len - 1 {
                    list.note_removal(End::Back);
                }
                Ok(items.remove(pos as usize))
            }
            "remove" => {
                args.arity(name, 1, 1)?;
                let items = list.snapshot();
                for (pos, item) in items.iter().enumerate() {
                    if self.eq(item, &args.positional[0])? {
                        let mut items = list.items.borrow_mut();
                        if pos < items.len() {
                            items.remove(pos);
                        }
                        return Ok(Value::None);
                    }
                }
                raise(ExcKind::ValueError, "list.remove(x): x not in list")
            }
            "index" | "count" => {
                let items = list.snapshot();
                self.sequence_query(&items, "list", name, args)
            }
            "reverse" => {
                args.arity(name, 0, 0)?;
                list.items.borrow_mut().reverse();
                Ok(Value::None)
            }
            "clear" => {
                args.arity(name, 0, 0)?;
                list.items.borrow_mut().clear();
                Ok(Value::None)
            }
            "copy" => {
                args.arity(name, 0, 0)?;
                Ok(Value::list(list.snapshot()))
            }
            _ => no_method("list", name),
        }
    }

    fn deque_method(&mut self, deque: &Rc<ListObj>, name: &str, args: Args) -> RtResult<Value> {
        args.finish(name)?;
        match name {
            "appendleft" => {
                args.arity(name, 1, 1)?;
                deque.items.borrow_mut().insert(0, args.positional[0].clone());
                Ok(Value::None)
            }
            "extendleft" => {
                args.arity(name, 1, 1)?;
                let items = self.iter_values(&args.positional[0])?;
                let mut current = deque.items.borrow_mut();
                for item in items {
                    current.insert(0, item);
                }
                Ok(Value::None)
            }
            "pop" | "popleft" => {
                args.arity(name, 0, 0)?;
                let mut items = deque.items.borrow_mut();
                if items.is_empty() {
                    return raise(ExcKind::IndexError, "pop from an empty deque");
                }
                if name == "pop" {
                    deque.note_removal(End::Back);
                    Ok(items.pop().unwrap_or(Value::None))
                } else {
                    deque.note_removal(End::Front);
                    Ok(items.remove(0))
                }
            }
            "rotate" => {
                args.arity(name, 0, 1)?;
                let n = match args.positional.first() {
                    Some(value) => int_arg(value)?,
                    None => 1,
                };
                let mut items = deque.items.borrow_mut();
                let len = items.len() as i64;
                if len > 0 {
                    let shift = n.rem_euclid(len) as usize;
                    items.rotate_right(shift);
                }
                Ok(Value::None)
            }
            "remove" => {
                args.arity(name, 1, 1)?;
                let items = deque.snapshot();
                for (pos, item) in items.iter().enumerate() {
                    if self.eq(item, &args.positional[0])? {
                        let mut items = deque.items.borrow_mut();
                        if pos < items.len() {
                            items.remove(pos);
                        }
                        return Ok(Value::None);
                    }
                }
                let message = format!("{} is not in deque", self.repr_of(&args.positional[0])?);
                raise(ExcKind::ValueError, message)
            }
            "copy" => {
                args.arity(name, 0, 0)?;
                Ok(Value::List(ListObj::deque(deque.snapshot())))
            }
            "index" => {
                let items = deque.snapshot();
                self.sequence_query(&items, "deque", name, args)
            }
            "append" | "extend" | "count" | "reverse" | "clear" => self.list_method(deque, name, args),
            _ => no_method("collections.deque", name),
        }
    }

    fn dict_method(&mut self, dict: &Rc<DictObj>, name: &str, mut args: Args) -> RtResult<Value> {
        if name == "update" {
            args.arity(name, 0, 1)?;
            let counting = matches!(dict.kind, DictKind::Counter);
            if let Some(source) = args.positional.first() {
                if counting {
                    self.count_into(dict, source, 1)?;
                } else {
                    self.fill_dict(dict, source)?;
                }
            }
            for (key, value) in std::mem::take(&mut args.keywords) {
                if counting {
                    let pair = Value::dict(vec![(Value::Str(key), value)])?;
                    self.count_into(dict, &pair, 1)?;
                } else {
                    dict.insert(Value::Str(key), value)?;
                }
            }
            return Ok(Value::None);
        }
        args.finish(name)?;
        match name {
            "get" => {
                args.arity(name, 1, 2)?;
                let found = dict.get(&args.positional[0])?;
                Ok(found.or_else(|| args.positional.get(1).cloned()).unwrap_or(Value::None))
            }
            "keys" => {
                args.arity(name, 0, 0)?;
                Ok(Value::list(dict.keys()))
            }
            "values" => {
                args.arity(name, 0, 0)?;
                Ok(Value::list(dict.values()))
            }
            "items" => {
                args.arity(name, 0, 0)?;
                let pairs = dict
                    .items()
                    .into_iter()
                    .map(|(k, v)| Value::tuple(vec![k, v]))
                    .collect();
                Ok(Value::list(pairs))
            }
            "pop" => {
                args.arity(name, 1, 2)?;
                match (dict.remove(&args.positional[0])?, args.positional.get(1)) {
                    (Some(value), _) => Ok(value),
                    (None, Some(default)) => Ok(default.clone()),
                    (None, None) => Err(Exception::with_args(
                        ExcKind::KeyError,
                        vec![args.positional[0].clone()],
                    )),
                }
            }
            "popitem" => {
                args.arity(name, 0, 0)?;
                let last = dict.entries.borrow_mut().pop();
                match last {
                    Some((_, (key, value))) => Ok(Value::tuple(vec![key, value])),
                    None => raise(ExcKind::KeyError, "popitem(): dictionary is empty"),
                }
            }
            "setdefault" => {
                args.arity(name, 1, 2)?;
                let key = &args.positional[0];
                if let Some(value) = dict.get(key)? {
                    return Ok(value);
                }
                let value = args.positional.get(1).cloned().unwrap_or(Value::None);
                dict.insert(key.clone(), value.clone())?;
                Ok(value)
            }
            "clear" => {
                args.arity(name, 0, 0)?;
                dict.entries.borrow_mut().clear();
                Ok(Value::None)
            }
            "copy" => {
                args.arity(name, 0, 0)?;
                let copy = DictObj::new(dict.kind.clone());
                *copy.entries.borrow_mut() = dict.entries.borrow().clone();
                Ok(Value::Dict(Rc::new(copy)))
            }
            "most_common" => {
                args.arity(name, 0, 1)?;
                let limit = match args.positional.first() {
                    None | Some(Value::None) => None,
                    Some(value) => Some(int_arg(value)?.max(0) as usize),
                };
                // Descending by count; equal counts keep insertion order.
                let by_count = sort::merge_sort(dict.items(), &mut |a: &(Value, Value), b: &(Value, Value)| {
                    self.lt(&b.1, &a.1)
                })?;
                let taken = by_count
                    .into_iter()
                    .take(limit.unwrap_or(usize::MAX))
                    .map(|(key, count)| Value::tuple(vec![key, count]))
                    .collect();
                Ok(Value::list(taken))
            }
            "elements" => {
                args.arity(name, 0, 0)?;
                let mut out = Vec::new();
                for (key, count) in dict.items() {
                    let count = count.as_int().unwrap_or(0);
                    for _ in 0..count.max(0) {
                        out.push(key.clone());
                    }
                }
                Ok(Value::Iterator(IterObj::from_items("itertools.chain", out)))
            }
            "subtract" => {
                args.arity(name, 0, 1)?;
                if let Some(source) = args.positional.first() {
                    self.count_into(dict, source, -1)?;
                }
                Ok(Value::None)
            }
            "total" => {
                args.arity(name, 0, 0)?;
                let mut total = Value::Int(0);
                for value in dict.values() {
                    total = self.binary_op(BinOp::Add, &total, &value)?;
                }
                Ok(total)
            }
            _ => no_method("dict", name),
        }
    }

    fn set_method(&mut self, set: &Rc<SetObj>, name: &str, args: Args) -> RtResult<Value> {
        args.finish(name)?;
        match name {
            "add" => {
                args.arity(name, 1, 1)?;
                set.add(args.positional[0].clone())?;
                Ok(Value::None)
            }
            "remove" => {
                args.arity(name, 1, 1)?;
                if set.remove(&args.positional[0])? {
                    Ok(Value::None)
                } else {
                    Err(Exception::with_args(ExcKind::KeyError, vec![args.positional[0].clone()]))
                }
            }
            "discard" => {
                args.arity(name, 1, 1)?;
                set.remove(&args.positional[0])?;
                Ok(Value::None)
            }
            "pop" => {
                args.arity(name, 0, 0)?;
                let first = set.items.borrow_mut().shift_remove_index(0);
                match first {
                    Some((_, value)) => Ok(value),
                    None => raise(ExcKind::KeyError, "pop from an empty set"),
                }
            }
            "clear" => {
                args.arity(name, 0, 0)?;
                set.items.borrow_mut().clear();
                Ok(Value::None)
            }
            "copy" => {
                args.arity(name, 0, 0)?;
                Ok(Value::Set(Rc::new(SetObj::from_values(set.values())?)))
            }
            "update" => {
                for source in &args.positional {
                    for item in self.iter_values(source)? {
                        set.add(item)?;
                    }
                }
                Ok(Value::None)
            }
            "union" | "intersection" | "difference" | "symmetric_difference" => {
                let mut result = set.values();
                for source in &args.positional {
                    let other = SetObj::from_values(self.iter_values(source)?)?;
                    let current = SetObj::from_values(result)?;
                    result = match name {
                        "union" => {
                            let mut merged = current.values();
                            for item in other.values() {
                                if !current.contains(&item)? {
                                    merged.push(item);
                                }
                            }
                            merged
                        }
                        "intersection" => keep(&current, |item| other.contains(item))?,
                        "difference" => keep(&current, |item| Ok(!other.contains(item)?))?,
                        _ => {
                            let mut merged = keep(&current, |item| Ok(!other.contains(item)?))?;
                            merged.extend(keep(&other, |item| Ok(!current.contains(item)?))?);
                            merged
                        }
                    };
                }
                Ok(Value::Set(Rc::new(SetObj::from_values(result)?)))
            }
            "issubset" | "issuperset" | "isdisjoint" => {
                args.arity(name, 1, 1)?;
                let other = SetObj::from_values(self.iter_values(&args.positional[0])?)?;
                let answer = match name {
                    "issubset" => keep(set, |item| Ok(!other.contains(item)?))?.is_empty(),
                    "issuperset" => keep(&other, |item| Ok(!set.contains(item)?))?.is_empty(),
                    _ => keep(set, |item| other.contains(item))?.is_empty(),
                };
                Ok(Value::Bool(answer))
            }
            _ => no_method("set", name),
        }
    }

    fn str_method(&mut self, text: &Rc<str>, name: &str, mut args: Args) -> RtResult<Value> {
        if name == "format" {
            let keywords = std::mem::take(&mut args.keywords);
            let formatted = format::str_format(text, &args.positional, &keywords, self)?;
            return Ok(Value::str(formatted));
        }
        if name == "split" || name == "rsplit" {
            let sep = args.keyword("sep");
            let maxsplit = args.keyword("maxsplit");
            args.finish(name)?;
            args.arity(name, 0, 2)?;
            let sep = sep.or_else(|| args.positional.first().cloned()).unwrap_or(Value::None);
            let maxsplit = match maxsplit.or_else(|| args.positional.get(1).cloned()) {
                Some(value) => int_arg(&value)?,
                None => -1,
            };
            let limit = usize::try_from(maxsplit).ok();
            let parts = match &sep {
                Value::None => split_whitespace(text, limit, name == "rsplit"),
                Value::Str(sep) if sep.is_empty() => {
                    return raise(ExcKind::ValueError, "empty separator")
                }
                Value::Str(sep) => split_on(text, sep, limit, name == "rsplit"),
                other => {
                    return raise(
                        ExcKind::TypeError,
                        format!("must be str or None, not {}", other.type_name()),
                    )
                }
            };
            return Ok(Value::list(parts.into_iter().map(Value::str).collect()));
        }
        args.finish(name)?;
        let text: &str = text;
        match name {
            "join" => {
                args.arity(name, 1, 1)?;
                let items = self.iter_values(&args.positional[0])?;
                let mut pieces = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::Str(piece) => pieces.push(piece.to_string()),
                        other => {
                            return raise(
                                ExcKind::TypeError,
                                format!(
                                    "sequence item {i}: expected str instance, {} found",
                                    other.type_name()
                                ),
                            )
                        }
                    }
                }
                Ok(Value::str(pieces.join(text)))
            }
            "splitlines" => {
                args.arity(name, 0, 0)?;
                Ok(Value::list(text.lines().map(Value::str).collect()))
            }
            "strip" | "lstrip" | "rstrip" => {
                args.arity(name, 0, 1)?;
                let chars: Option<Vec<char>> = match args.positional.first() {
                    None | Some(Value::None) => None,
                    Some(value) => Some(str_arg(name, value)?.chars().collect()),
                };
                let strip = |c: char| match &chars {
                    Some(set) => set.contains(&c),
                    None => c.is_whitespace(),
                };
                let stripped = match name {
                    "strip" => text.trim_matches(strip),
                    "lstrip" => text.trim_start_matches(strip),
                    _ => text.trim_end_matches(strip),
                };
                Ok(Value::str(stripped))
            }
            "upper" => Ok(Value::str(text.to_uppercase())),
            "lower" => Ok(Value::str(text.to_lowercase())),
            "swapcase" => Ok(Value::str(
                text.chars()
                    .map(|c| {
                        if c.is_uppercase() {
                            c.to_lowercase().to_string()
                        } else {
                            c.to_uppercase().to_string()
                        }
                    })
                    .collect::<String>(),
            )),
            "title" => {
                let mut out = String::with_capacity(text.len());
                let mut previous_cased = false;
                for c in text.chars() {
                    if previous_cased {
                        out.extend(c.to_lowercase());
                    } else {
                        out.extend(c.to_uppercase());
                    }
                    previous_cased = c.is_alphabetic();
                }
                Ok(Value::str(out))
            }
            "capitalize" => {
                let mut chars = text.chars();
                let out = match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
                    None => String::new(),
                };
                Ok(Value::str(out))
            }
            "replace" => {
                args.arity(name, 2, 3)?;
                let old = str_arg(name, &args.positional[0])?;
                let new = str_arg(name, &args.positional[1])?;
                let replaced = match args.positional.get(2).map(int_arg).transpose()? {
                    Some(count) if count >= 0 => text.replacen(old, new, count as usize),
                    _ => text.replace(old, new),
                };
                Ok(Value::str(replaced))
            }
            "startswith" | "endswith" => {
                args.arity(name, 1, 3)?;
                let chars: Vec<char> = text.chars().collect();
                let (start, end) = window(&args.positional[1..], chars.len())?;
                let slice: String = chars[start..end.max(start)].iter().collect();
                let candidates = match &args.positional[0] {
                    Value::Tuple(options) => options.to_vec(),
                    other => vec![other.clone()],
                };
                for candidate in &candidates {
                    let Value::Str(affix) = candidate else {
                        return raise(
                            ExcKind::TypeError,
                            format!(
                                "{name} first arg must be str or a tuple of str, not {}",
                                candidate.type_name()
                            ),
                        );
                    };
                    let hit = if name == "startswith" {
                        slice.starts_with(&**affix)
                    } else {
                        slice.ends_with(&**affix)
                    };
                    if hit {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            "find" | "rfind" | "index" | "count" => {
                args.arity(name, 1, 3)?;
                let needle = str_arg(name, &args.positional[0])?;
                let chars: Vec<char> = text.chars().collect();
                let (start, end) = window(&args.positional[1..], chars.len())?;
                let hay: String = chars[start..end.max(start)].iter().collect();
                if name == "count" {
                    if start > end {
                        return Ok(Value::Int(0));
                    }
                    return Ok(Value::Int(hay.matches(needle).count() as i64));
                }
                let found = if start > end {
                    None
                } else if name == "rfind" {
                    hay.rfind(needle)
                } else {
                    hay.find(needle)
                };
                match found {
                    Some(byte) => Ok(Value::Int((start + hay[..byte].chars().count()) as i64)),
                    None if name == "index" => raise(ExcKind::ValueError, "substring not found"),
                    None => Ok(Value::Int(-1)),
                }
            }
            "isdigit" => Ok(Value::Bool(!text.is_empty() && text.chars().all(|c| c.is_ascii_digit()))),
            "isalpha" => Ok(Value::Bool(!text.is_empty() && text.chars().all(char::is_alphabetic))),
            "isalnum" => Ok(Value::Bool(!text.is_empty() && text.chars().all(char::is_alphanumeric))),
            "isspace" => Ok(Value::Bool(!text.is_empty() && text.chars().all(char::is_whitespace))),
            "isupper" | "islower" => {
                let mut cased = false;
                for c in text.chars() {
                    if (name == "isupper" && c.is_lowercase()) || (name == "islower" && c.is_uppercase()) {
                        return Ok(Value::Bool(false));
                    }
                    cased |= c.is_uppercase() || c.is_lowercase();
                }
                Ok(Value::Bool(cased))
            }
            "zfill" => {
                args.arity(name, 1, 1)?;
                let width = int_arg(&args.positional[0])?.max(0) as usize;
                let len = text.chars().count();
                if len >= width {
                    return Ok(Value::str(text));
                }
                let zeros = "0".repeat(width - len);
                let out = match text.strip_prefix(['+', '-']) {
                    Some(rest) => format!("{}{zeros}{rest}", &text[..1]),
                    None => format!("{zeros}{text}"),
                };
                Ok(Value::str(out))
            }
            "center" | "ljust" | "rjust" => {
                args.arity(name, 1, 2)?;
                let width = int_arg(&args.positional[0])?.max(0) as usize;
                let fill = match args.positional.get(1) {
                    Some(value) => {
                        let fill = str_arg(name, value)?;
                        let mut chars = fill.chars();
                        match (chars.next(), chars.next()) {
                            (Some(c), None) => c,
                            _ => {
                                return raise(
                                    ExcKind::TypeError,
                                    "The fill character must be exactly one character long",
                                )
                            }
                        }
                    }
                    None => ' ',
                };
                let len = text.chars().count();
                let total = width.saturating_sub(len);
                let (left, right) = match name {
                    "ljust" => (0, total),
                    "rjust" => (total, 0),
                    // Odd padding goes left when the width is odd.
                    _ => {
                        let left = total / 2 + (total & width & 1);
                        (left, total - left)
                    }
                };
                let pad = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();
                Ok(Value::str(format!("{}{text}{}", pad(left), pad(right))))
            }
            _ => no_method("str", name),
        }
    }
}

/// The items of `set` for which `pred` holds.
fn keep(set: &SetObj, mut pred: impl FnMut(&Value) -> RtResult<bool>) -> RtResult<Vec<Value>> {
    let mut out = Vec::new();
    for item in set.values() {
        if pred(&item)? {
            out.push(item);
        }
    }
    Ok(out)
}

fn split_on(text: &str, sep: &str, limit: Option<usize>, from_right: bool) -> Vec<String> {
    match (limit, from_right) {
        (None, _) => text.split(sep).map(str::to_string).collect(),
        (Some(n), false) => text.splitn(n + 1, sep).map(str::to_string).collect(),
        (Some(n), true) => {
            let mut parts: Vec<String> = text.rsplitn(n + 1, sep).map(str::to_string).collect();
            parts.reverse();
            parts
        }
    }
}

fn split_whitespace(text: &str, limit: Option<usize>, from_right: bool) -> Vec<String> {
    let Some(limit) = limit else {
        return text.split_whitespace().map(str::to_string).collect();
    };
    if from_right {
        let reversed: String = text.chars().rev().collect();
        let mut parts: Vec<String> = split_whitespace(&reversed, Some(limit), false)
            .into_iter()
            .map(|part| part.chars().rev().collect())
            .collect();
        parts.reverse();
        return parts;
    }
    let mut parts = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        if parts.len() == limit {
            parts.push(rest.to_string());
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        parts.push(rest[..end].to_string());
        rest = rest[end..].trim_start();
    }
    parts
}

fn no_method<T>(type_name: &str, name: &str) -> RtResult<T> {
    raise(
        ExcKind::AttributeError,
        format!("'{type_name}' object has no attribute '{name}'"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_tables_depend_on_kind() {
        let list = Value::list(vec![]);
        let deque = Value::List(ListObj::deque(vec![]));
        assert_eq!(native_method(&list, "append"), Some("append"));
        assert_eq!(native_method(&list, "popleft"), None);
        assert_eq!(native_method(&deque, "popleft"), Some("popleft"));

        let counter = Value::Dict(Rc::new(DictObj::new(DictKind::Counter)));
        let dict = Value::Dict(Rc::new(DictObj::new(DictKind::Dict)));
        assert_eq!(native_method(&counter, "most_common"), Some("most_common"));
        assert_eq!(native_method(&counter, "get"), Some("get"));
        assert_eq!(native_method(&dict, "most_common"), None);
    }

    #[test]
    fn whitespace_split_with_limit() {
        assert_eq!(split_whitespace("  a b  c ", None, false), vec!["a", "b", "c"]);
        assert_eq!(split_whitespace("  a b  c ", Some(1), false), vec!["a", "b  c "]);
        assert_eq!(split_whitespace("a b  c", Some(1), true), vec!["a b", "c"]);
    }

    #[test]
    fn separator_split() {
        assert_eq!(split_on("a,b,,c", ",", None, false), vec!["a", "b", "", "c"]);
        assert_eq!(split_on("a,b,c", ",", Some(1), false), vec!["a", "b,c"]);
        assert_eq!(split_on("a,b,c", ",", Some(1), true), vec!["a,b", "c"]);
    }
}
