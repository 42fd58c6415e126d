//! Operators, comparisons and truthiness.
//!
//! Built-in types are handled natively; instances of user classes go through
//! their dunder methods (`__add__`, `__eq__`, `__lt__`, `__len__`, ...).

use std::cmp::Ordering;
use std::rc::Rc;

use steptrace_syntax::ast::{BinOp, CmpOp, UnaryOp};

use super::{Args, Interpreter};
use crate::error::{raise, ExcKind, RtResult};
use crate::format::{self, ReprHook};
use crate::value::{DictObj, ListObj, SeqKind, SetObj, Value};

/// Nesting depth at which structural comparison gives up.
const MAX_COMPARE_DEPTH: usize = 200;

/// Upper bound on the length of a repeated sequence (`[0] * n`).
const MAX_REPEAT_LEN: usize = 1 << 26;

impl Interpreter<'_> {
    pub(crate) fn truthy(&mut self, value: &Value) -> RtResult<bool> {
        let Value::Instance(instance) = value else {
            return Ok(value.is_truthy());
        };
        if let Some(method) = instance.class.lookup("__bool__") {
            let result = self.call_value(&method, Args::positional(vec![value.clone()]))?;
            return match result {
                Value::Bool(b) => Ok(b),
                other => raise(
                    ExcKind::TypeError,
                    format!("__bool__ should return bool, returned {}", other.type_name()),
                ),
            };
        }
        if let Some(method) = instance.class.lookup("__len__") {
            let result = self.call_value(&method, Args::positional(vec![value.clone()]))?;
            return Ok(result.as_int().unwrap_or(0) != 0);
        }
        Ok(true)
    }

    /// Calls `receiver.<name>(*rest)` if the receiver's class defines it.
    fn call_dunder(&mut self, receiver: &Value, name: &str, rest: &[Value]) -> RtResult<Option<Value>> {
        let method = match receiver {
            Value::Instance(instance) => instance.class.lookup(name),
            Value::Exception(exc) => exc.class.as_ref().and_then(|class| class.lookup(name)),
            _ => None,
        };
        let Some(method) = method else {
            return Ok(None);
        };
        let mut args = vec![receiver.clone()];
        args.extend_from_slice(rest);
        self.call_value(&method, Args::positional(args)).map(Some)
    }

    // -----------------------------------------------------------------------
    // Arithmetic
    // -----------------------------------------------------------------------

    pub(crate) fn binary_op(&mut self, op: BinOp, left: &Value, right: &Value) -> RtResult<Value> {
        if let Some(result) = self.call_dunder(left, dunder(op), std::slice::from_ref(right))? {
            return Ok(result);
        }
        match (left, right) {
            (Value::Bool(a), Value::Bool(b)) if matches!(op, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor) => {
                Ok(Value::Bool(match op {
                    BinOp::BitAnd => a & b,
                    BinOp::BitOr => a | b,
                    _ => a ^ b,
                }))
            }
            (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
                int_op(op, left.as_int().unwrap_or_default(), right.as_int().unwrap_or_default())
            }
            (Value::Int(_) | Value::Bool(_) | Value::Float(_), Value::Int(_) | Value::Bool(_) | Value::Float(_)) => {
                float_op(op, left.as_float().unwrap_or_default(), right.as_float().unwrap_or_default())
                    .unwrap_or_else(|| unsupported(op, left, right))
            }
            (Value::Str(a), Value::Str(b)) if op == BinOp::Add => Ok(Value::str(format!("{a}{b}"))),
            (Value::Str(_), _) if op == BinOp::Add => raise(
                ExcKind::TypeError,
                format!("can only concatenate str (not \"{}\") to str", right.type_name()),
            ),
            (Value::Str(template), _) if op == BinOp::Mod => {
                Ok(Value::str(format::percent_format(template, right, self)?))
            }
            (Value::List(a), Value::List(b)) if op == BinOp::Add && a.kind == b.kind => {
                let mut items = a.snapshot();
                items.extend(b.snapshot());
                Ok(Value::List(match a.kind {
                    SeqKind::List => ListObj::new(items),
                    SeqKind::Deque => ListObj::deque(items),
                }))
            }
            (Value::List(a), _) if op == BinOp::Add && a.kind == SeqKind::List => raise(
                ExcKind::TypeError,
                format!("can only concatenate list (not \"{}\") to list", right.type_name()),
            ),
            (Value::Tuple(a), Value::Tuple(b)) if op == BinOp::Add => {
                Ok(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
            }
            (seq @ (Value::Str(_) | Value::List(_) | Value::Tuple(_)), Value::Int(_) | Value::Bool(_))
                if op == BinOp::Mul =>
            {
                repeat(seq, right.as_int().unwrap_or_default())
            }
            (Value::Int(_) | Value::Bool(_), seq @ (Value::Str(_) | Value::List(_) | Value::Tuple(_)))
                if op == BinOp::Mul =>
            {
                repeat(seq, left.as_int().unwrap_or_default())
            }
            (Value::Set(a), Value::Set(b)) => {
                let result = match op {
                    BinOp::BitOr => set_union(a, b)?,
                    BinOp::BitAnd => set_filter(a, |v| b.contains(v))?,
                    BinOp::Sub => set_filter(a, |v| b.contains(v).map(|found| !found))?,
                    BinOp::BitXor => {
                        let result = set_filter(a, |v| b.contains(v).map(|found| !found))?;
                        for value in b.values() {
                            if !a.contains(&value)? {
                                result.add(value)?;
                            }
                        }
                        result
                    }
                    _ => return unsupported(op, left, right),
                };
                Ok(Value::Set(Rc::new(result)))
            }
            (Value::Dict(a), Value::Dict(b)) if op == BinOp::BitOr => {
                let merged = DictObj::new(a.kind.clone());
                for (k, v) in a.items().into_iter().chain(b.items()) {
                    merged.insert(k, v)?;
                }
                Ok(Value::Dict(Rc::new(merged)))
            }
            _ => unsupported(op, left, right),
        }
    }

    /// `target op= value`: lists, dicts and sets are updated in place, so
    /// every alias observes the change.
    pub(crate) fn inplace_op(&mut self, op: BinOp, left: Value, right: Value) -> RtResult<Value> {
        match (&left, op) {
            (Value::List(list), BinOp::Add) => {
                let items = self.iter_values(&right)?;
                list.items.borrow_mut().extend(items);
                Ok(left)
            }
            (Value::Set(set), BinOp::BitOr) => {
                if let Value::Set(other) = &right {
                    for value in other.values() {
                        set.add(value)?;
                    }
                    return Ok(left);
                }
                self.binary_op(op, &left, &right)
            }
            _ => self.binary_op(op, &left, &right),
        }
    }

    pub(crate) fn unary_op(&mut self, op: UnaryOp, operand: &Value) -> RtResult<Value> {
        let result = match (op, operand) {
            (UnaryOp::Not, value) => Value::Bool(!self.truthy(value)?),
            (UnaryOp::Neg, Value::Int(_) | Value::Bool(_)) => operand
                .as_int()
                .and_then(i64::checked_neg)
                .map(Value::Int)
                .ok_or_else(overflow)?,
            (UnaryOp::Neg, Value::Float(f)) => Value::Float(-f),
            (UnaryOp::Pos, Value::Int(_) | Value::Bool(_)) => Value::Int(operand.as_int().unwrap_or_default()),
            (UnaryOp::Pos, Value::Float(f)) => Value::Float(*f),
            (UnaryOp::Invert, Value::Int(_) | Value::Bool(_)) => Value::Int(!operand.as_int().unwrap_or_default()),
            (UnaryOp::Neg, Value::Instance(_)) => match self.call_dunder(operand, "__neg__", &[])? {
                Some(value) => value,
                None => return bad_operand(op, operand),
            },
            _ => return bad_operand(op, operand),
        };
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Comparison
    // -----------------------------------------------------------------------

    pub(crate) fn compare(&mut self, op: CmpOp, left: &Value, right: &Value) -> RtResult<bool> {
        match op {
            CmpOp::Eq => self.eq(left, right),
            CmpOp::NotEq => Ok(!self.eq(left, right)?),
            CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => self.order(op, left, right, 0),
            CmpOp::In => self.contains(right, left),
            CmpOp::NotIn => Ok(!self.contains(right, left)?),
            CmpOp::Is => Ok(left.is(right)),
            CmpOp::IsNot => Ok(!left.is(right)),
        }
    }

    pub(crate) fn eq(&mut self, left: &Value, right: &Value) -> RtResult<bool> {
        self.eq_at(left, right, 0)
    }

    pub(crate) fn lt(&mut self, left: &Value, right: &Value) -> RtResult<bool> {
        self.order(CmpOp::Lt, left, right, 0)
    }

    fn eq_at(&mut self, left: &Value, right: &Value, depth: usize) -> RtResult<bool> {
        if depth > MAX_COMPARE_DEPTH {
            return raise(
                ExcKind::RecursionError,
                "maximum recursion depth exceeded in comparison",
            );
        }
        for (receiver, other) in [(left, right), (right, left)] {
            if matches!(receiver, Value::Instance(_)) {
                if let Some(result) = self.call_dunder(receiver, "__eq__", std::slice::from_ref(other))? {
                    return self.truthy(&result);
                }
            }
        }
        let equal = match (left, right) {
            (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => left.as_int() == right.as_int(),
            (Value::Int(_) | Value::Bool(_) | Value::Float(_), Value::Int(_) | Value::Bool(_) | Value::Float(_)) => {
                left.as_float() == right.as_float()
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.kind == b.kind
                    && (Rc::ptr_eq(a, b) || self.seq_eq(&a.snapshot(), &b.snapshot(), depth)?)
            }
            (Value::Tuple(a), Value::Tuple(b)) => self.seq_eq(a, b, depth)?,
            (Value::Dict(a), Value::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (key, value) in a.items() {
                    match b.get(&key)? {
                        Some(other) if self.eq_at(&value, &other, depth + 1)? => {}
                        _ => return Ok(false),
                    }
                }
                true
            }
            (Value::Set(a), Value::Set(b)) => a.len() == b.len() && is_subset(a, b)?,
            (Value::Range(a), Value::Range(b)) => {
                let len = a.len();
                len == b.len() && (len == 0 || (a.start == b.start && (len == 1 || a.step == b.step)))
            }
            _ => left.is(right),
        };
        Ok(equal)
    }

    fn seq_eq(&mut self, a: &[Value], b: &[Value], depth: usize) -> RtResult<bool> {
        if a.len() != b.len() {
            return Ok(false);
        }
        for (x, y) in a.iter().zip(b) {
            if !x.is(y) && !self.eq_at(x, y, depth + 1)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn order(&mut self, op: CmpOp, left: &Value, right: &Value, depth: usize) -> RtResult<bool> {
        if depth > MAX_COMPARE_DEPTH {
            return raise(
                ExcKind::RecursionError,
                "maximum recursion depth exceeded in comparison",
            );
        }
        let (name, reflected) = match op {
            CmpOp::Lt => ("__lt__", "__gt__"),
            CmpOp::Le => ("__le__", "__ge__"),
            CmpOp::Gt => ("__gt__", "__lt__"),
            _ => ("__ge__", "__le__"),
        };
        if let Some(result) = self.call_dunder(left, name, std::slice::from_ref(right))? {
            return self.truthy(&result);
        }
        if let Some(result) = self.call_dunder(right, reflected, std::slice::from_ref(left))? {
            return self.truthy(&result);
        }

        let ordering = match (left, right) {
            (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
                left.as_int().cmp(&right.as_int())
            }
            (Value::Int(_) | Value::Bool(_) | Value::Float(_), Value::Int(_) | Value::Bool(_) | Value::Float(_)) => {
                match left.as_float().partial_cmp(&right.as_float()) {
                    Some(ordering) => ordering,
                    None => return Ok(false),
                }
            }
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) if a.kind == b.kind => {
                return self.order_seq(op, &a.snapshot(), &b.snapshot(), depth)
            }
            (Value::Tuple(a), Value::Tuple(b)) => return self.order_seq(op, a, b, depth),
            (Value::Set(a), Value::Set(b)) => {
                return Ok(match op {
                    CmpOp::Le => is_subset(a, b)?,
                    CmpOp::Lt => a.len() < b.len() && is_subset(a, b)?,
                    CmpOp::Ge => is_subset(b, a)?,
                    _ => b.len() < a.len() && is_subset(b, a)?,
                })
            }
            _ => {
                return raise(
                    ExcKind::TypeError,
                    format!(
                        "'{}' not supported between instances of '{}' and '{}'",
                        op.symbol(),
                        left.type_name(),
                        right.type_name()
                    ),
                )
            }
        };
        Ok(holds(op, ordering))
    }

    /// Lexicographic ordering: the first unequal pair decides, otherwise
    /// the shorter sequence is smaller.
    fn order_seq(&mut self, op: CmpOp, a: &[Value], b: &[Value], depth: usize) -> RtResult<bool> {
        for (x, y) in a.iter().zip(b) {
            if x.is(y) || self.eq_at(x, y, depth + 1)? {
                continue;
            }
            return self.order(op, x, y, depth + 1);
        }
        Ok(holds(op, a.len().cmp(&b.len())))
    }

    pub(crate) fn contains(&mut self, container: &Value, item: &Value) -> RtResult<bool> {
        match container {
            Value::List(list) => {
                let items = list.snapshot();
                self.any_equal(&items, item)
            }
            Value::Tuple(items) => self.any_equal(items, item),
            Value::Str(text) => match item {
                Value::Str(needle) => Ok(text.contains(&**needle)),
                other => raise(
                    ExcKind::TypeError,
                    format!(
                        "'in <string>' requires string as left operand, not {}",
                        other.type_name()
                    ),
                ),
            },
            Value::Dict(dict) => dict.contains(item),
            Value::Set(set) => set.contains(item),
            Value::Range(range) => match item {
                Value::Int(_) | Value::Bool(_) => Ok(range.contains(item.as_int().unwrap_or_default())),
                Value::Float(f) if f.fract() == 0.0 => Ok(range.contains(*f as i64)),
                _ => Ok(false),
            },
            Value::Instance(instance) => {
                if let Some(method) = instance.class.lookup("__contains__") {
                    let result = self.call_value(
                        &method,
                        Args::positional(vec![container.clone(), item.clone()]),
                    )?;
                    return self.truthy(&result);
                }
                let items = self.iter_values(container)?;
                self.any_equal(&items, item)
            }
            Value::Iterator(_) => {
                let items = self.iter_values(container)?;
                self.any_equal(&items, item)
            }
            other => raise(
                ExcKind::TypeError,
                format!("argument of type '{}' is not iterable", other.type_name()),
            ),
        }
    }

    fn any_equal(&mut self, items: &[Value], item: &Value) -> RtResult<bool> {
        for candidate in items {
            if candidate.is(item) || self.eq(candidate, item)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub(crate) fn repr_of(&mut self, value: &Value) -> RtResult<String> {
        format::repr(value, self)
    }

    pub(crate) fn str_of(&mut self, value: &Value) -> RtResult<String> {
        format::to_str(value, self)
    }
}

impl ReprHook for Interpreter<'_> {
    fn instance_text(&mut self, value: &Value, as_str: bool) -> RtResult<Option<String>> {
        let name = if as_str { "__str__" } else { "__repr__" };
        match self.call_dunder(value, name, &[])? {
            None => Ok(None),
            Some(Value::Str(text)) => Ok(Some(text.to_string())),
            Some(other) => raise(
                ExcKind::TypeError,
                format!("{name} returned non-string (type {})", other.type_name()),
            ),
        }
    }
}

fn dunder(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "__add__",
        BinOp::Sub => "__sub__",
        BinOp::Mul => "__mul__",
        BinOp::Div => "__truediv__",
        BinOp::FloorDiv => "__floordiv__",
        BinOp::Mod => "__mod__",
        BinOp::Pow => "__pow__",
        BinOp::BitAnd => "__and__",
        BinOp::BitOr => "__or__",
        BinOp::BitXor => "__xor__",
        BinOp::Shl => "__lshift__",
        BinOp::Shr => "__rshift__",
    }
}

fn holds(op: CmpOp, ordering: Ordering) -> bool {
    match op {
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    }
}

fn overflow() -> crate::error::Exception {
    crate::error::Exception::new(ExcKind::OverflowError, "integer result out of range")
}

fn unsupported<T>(op: BinOp, left: &Value, right: &Value) -> RtResult<T> {
    raise(
        ExcKind::TypeError,
        format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ),
    )
}

fn bad_operand<T>(op: UnaryOp, operand: &Value) -> RtResult<T> {
    let symbol = match op {
        UnaryOp::Neg => "-",
        UnaryOp::Pos => "+",
        UnaryOp::Invert => "~",
        UnaryOp::Not => "not",
    };
    raise(
        ExcKind::TypeError,
        format!("bad operand type for unary {symbol}: '{}'", operand.type_name()),
    )
}

pub(crate) fn int_op(op: BinOp, a: i64, b: i64) -> RtResult<Value> {
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => {
            if b == 0 {
                return raise(ExcKind::ZeroDivisionError, "division by zero");
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinOp::FloorDiv => {
            if b == 0 {
                return raise(ExcKind::ZeroDivisionError, "integer division or modulo by zero");
            }
            a.checked_div(b).map(|q| if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q })
        }
        BinOp::Mod => {
            if b == 0 {
                return raise(ExcKind::ZeroDivisionError, "integer division or modulo by zero");
            }
            let r = a.wrapping_rem(b);
            Some(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
        }
        BinOp::Pow => {
            if b < 0 {
                if a == 0 {
                    return raise(
                        ExcKind::ZeroDivisionError,
                        "0.0 cannot be raised to a negative power",
                    );
                }
                return Ok(Value::Float((a as f64).powf(b as f64)));
            }
            u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp))
        }
        BinOp::BitAnd => Some(a & b),
        BinOp::BitOr => Some(a | b),
        BinOp::BitXor => Some(a ^ b),
        BinOp::Shl => {
            if b < 0 {
                return raise(ExcKind::ValueError, "negative shift count");
            }
            if a == 0 {
                Some(0)
            } else if b >= 63 {
                None
            } else {
                let shifted = a << b;
                (shifted >> b == a).then_some(shifted)
            }
        }
        BinOp::Shr => {
            if b < 0 {
                return raise(ExcKind::ValueError, "negative shift count");
            }
            Some(if b >= 64 { if a < 0 { -1 } else { 0 } } else { a >> b })
        }
    };
    result.map(Value::Int).ok_or_else(overflow)
}

/// `None` for operators floats do not support.
pub(crate) fn float_op(op: BinOp, a: f64, b: f64) -> Option<RtResult<Value>> {
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Some(raise(ExcKind::ZeroDivisionError, "float division by zero"));
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Some(raise(ExcKind::ZeroDivisionError, "float floor division by zero"));
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Some(raise(ExcKind::ZeroDivisionError, "float modulo"));
            }
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Some(raise(
                    ExcKind::ZeroDivisionError,
                    "0.0 cannot be raised to a negative power",
                ));
            }
            if a < 0.0 && b.fract() != 0.0 {
                return Some(raise(ExcKind::ValueError, "math domain error"));
            }
            let result = a.powf(b);
            if result.is_infinite() && a.is_finite() && b.is_finite() {
                return Some(raise(ExcKind::OverflowError, "(34, 'Numerical result out of range')"));
            }
            result
        }
        _ => return None,
    };
    Some(Ok(Value::Float(result)))
}

fn repeat(seq: &Value, count: i64) -> RtResult<Value> {
    let count = count.max(0) as usize;
    let len = match seq {
        Value::Str(s) => s.len(),
        Value::List(l) => l.len(),
        Value::Tuple(t) => t.len(),
        _ => 0,
    };
    if len.saturating_mul(count) > MAX_REPEAT_LEN {
        return raise(ExcKind::OverflowError, "repeated sequence is too large");
    }
    Ok(match seq {
        Value::Str(s) => Value::str(s.repeat(count)),
        Value::List(l) => {
            let items = l.snapshot();
            Value::list(items.iter().cloned().cycle().take(items.len() * count).collect())
        }
        Value::Tuple(t) => Value::tuple(t.iter().cloned().cycle().take(t.len() * count).collect()),
        other => other.clone(),
    })
}

fn is_subset(a: &SetObj, b: &SetObj) -> RtResult<bool> {
    for value in a.values() {
        if !b.contains(&value)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn set_union(a: &SetObj, b: &SetObj) -> RtResult<SetObj> {
    let result = SetObj::from_values(a.values())?;
    for value in b.values() {
        result.add(value)?;
    }
    Ok(result)
}

fn set_filter(a: &SetObj, mut keep: impl FnMut(&Value) -> RtResult<bool>) -> RtResult<SetObj> {
    let result = SetObj::new();
    for value in a.values() {
        if keep(&value)? {
            result.add(value)?;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(op: BinOp, a: i64, b: i64) -> RtResult<Value> {
        int_op(op, a, b)
    }

    #[test]
    fn floor_division_and_modulo_round_toward_negative_infinity() {
        assert!(matches!(int(BinOp::FloorDiv, -7, 2), Ok(Value::Int(-4))));
        assert!(matches!(int(BinOp::Mod, -7, 2), Ok(Value::Int(1))));
        assert!(matches!(int(BinOp::Mod, 7, -2), Ok(Value::Int(-1))));
        assert!(matches!(int(BinOp::FloorDiv, 7, 2), Ok(Value::Int(3))));
    }

    #[test]
    fn division_by_zero_messages() {
        let err = int(BinOp::Div, 1, 0).unwrap_err();
        assert_eq!(err.to_string(), "ZeroDivisionError: division by zero");
        let err = int(BinOp::Mod, 1, 0).unwrap_err();
        assert_eq!(err.to_string(), "ZeroDivisionError: integer division or modulo by zero");
        let err = float_op(BinOp::Div, 1.0, 0.0).unwrap().unwrap_err();
        assert_eq!(err.to_string(), "ZeroDivisionError: float division by zero");
    }

    #[test]
    fn integer_overflow_raises() {
        let err = int(BinOp::Mul, i64::MAX, 2).unwrap_err();
        assert_eq!(err.kind(), ExcKind::OverflowError);
        let err = int(BinOp::Pow, 10, 30).unwrap_err();
        assert_eq!(err.kind(), ExcKind::OverflowError);
        assert!(matches!(int(BinOp::Pow, 2, 10), Ok(Value::Int(1024))));
        assert!(matches!(int(BinOp::Pow, 2, -1), Ok(Value::Float(f)) if f == 0.5));
    }

    #[test]
    fn shifts() {
        assert!(matches!(int(BinOp::Shl, 1, 4), Ok(Value::Int(16))));
        assert!(matches!(int(BinOp::Shr, -8, 1), Ok(Value::Int(-4))));
        assert!(int(BinOp::Shl, 1, 63).is_err());
        assert!(int(BinOp::Shl, 1, -1).is_err());
    }

    #[test]
    fn float_modulo_follows_divisor_sign() {
        assert!(matches!(float_op(BinOp::Mod, -1.0, 3.0), Some(Ok(Value::Float(f))) if f == 2.0));
        assert!(float_op(BinOp::BitAnd, 1.0, 1.0).is_none());
    }
}
