//! Built-in functions and types.
//!
//! Every callable the runtime provides natively is a [`Builtin`] variant:
//! global functions (`len`, `print`, ...), the built-in types (`int`, `list`,
//! ...), which double as their own constructors, and the functions exported by
//! the built-in modules (`math.sqrt`, `heapq.heappush`, ...).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use steptrace_syntax::ast::{BinOp, UnaryOp};

use crate::error::{raise, ExcKind, Exception, RtResult};
use crate::format;
use crate::interp::{Args, Interpreter};
use crate::sort;
use crate::value::{
    DictKind, DictObj, HashKey, IterObj, ListObj, RangeObj, SeqKind, SetObj, Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Input,
    Len,
    Range,
    Int,
    Float,
    Str,
    Bool,
    List,
    Tuple,
    Dict,
    Set,
    Abs,
    Min,
    Max,
    Sum,
    Sorted,
    Reversed,
    Enumerate,
    Zip,
    Map,
    Filter,
    Any,
    All,
    IsInstance,
    Type,
    Repr,
    Ord,
    Chr,
    Round,
    Divmod,
    Pow,
    Hash,
    Id,
    Iter,
    Next,
    HasAttr,
    GetAttr,
    SetAttr,
    Super,
    Object,
    Format,
    NoneType,
    Function,
    // math
    MathSqrt,
    MathFloor,
    MathCeil,
    MathLog,
    MathPow,
    MathGcd,
    // collections
    Deque,
    DefaultDict,
    Counter,
    // heapq
    HeapPush,
    HeapPop,
    Heapify,
    // sys
    SysSetRecursionLimit,
    SysGetRecursionLimit,
}

/// Builtins reachable by bare name.
const GLOBAL: &[Builtin] = &[
    Builtin::Print,
    Builtin::Input,
    Builtin::Len,
    Builtin::Range,
    Builtin::Int,
    Builtin::Float,
    Builtin::Str,
    Builtin::Bool,
    Builtin::List,
    Builtin::Tuple,
    Builtin::Dict,
    Builtin::Set,
    Builtin::Abs,
    Builtin::Min,
    Builtin::Max,
    Builtin::Sum,
    Builtin::Sorted,
    Builtin::Reversed,
    Builtin::Enumerate,
    Builtin::Zip,
    Builtin::Map,
    Builtin::Filter,
    Builtin::Any,
    Builtin::All,
    Builtin::IsInstance,
    Builtin::Type,
    Builtin::Repr,
    Builtin::Ord,
    Builtin::Chr,
    Builtin::Round,
    Builtin::Divmod,
    Builtin::Pow,
    Builtin::Hash,
    Builtin::Id,
    Builtin::Iter,
    Builtin::Next,
    Builtin::HasAttr,
    Builtin::GetAttr,
    Builtin::SetAttr,
    Builtin::Super,
    Builtin::Object,
    Builtin::Format,
];

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Input => "input",
            Builtin::Len => "len",
            Builtin::Range => "range",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Str => "str",
            Builtin::Bool => "bool",
            Builtin::List => "list",
            Builtin::Tuple => "tuple",
            Builtin::Dict => "dict",
            Builtin::Set => "set",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sum => "sum",
            Builtin::Sorted => "sorted",
            Builtin::Reversed => "reversed",
            Builtin::Enumerate => "enumerate",
            Builtin::Zip => "zip",
            Builtin::Map => "map",
            Builtin::Filter => "filter",
            Builtin::Any => "any",
            Builtin::All => "all",
            Builtin::IsInstance => "isinstance",
            Builtin::Type => "type",
            Builtin::Repr => "repr",
            Builtin::Ord => "ord",
            Builtin::Chr => "chr",
            Builtin::Round => "round",
            Builtin::Divmod => "divmod",
            Builtin::Pow => "pow",
            Builtin::Hash => "hash",
            Builtin::Id => "id",
            Builtin::Iter => "iter",
            Builtin::Next => "next",
            Builtin::HasAttr => "hasattr",
            Builtin::GetAttr => "getattr",
            Builtin::SetAttr => "setattr",
            Builtin::Super => "super",
            Builtin::Object => "object",
            Builtin::Format => "format",
            Builtin::NoneType => "NoneType",
            Builtin::Function => "function",
            Builtin::MathSqrt => "sqrt",
            Builtin::MathFloor => "floor",
            Builtin::MathCeil => "ceil",
            Builtin::MathLog => "log",
            Builtin::MathPow => "pow",
            Builtin::MathGcd => "gcd",
            Builtin::Deque => "deque",
            Builtin::DefaultDict => "defaultdict",
            Builtin::Counter => "Counter",
            Builtin::HeapPush => "heappush",
            Builtin::HeapPop => "heappop",
            Builtin::Heapify => "heapify",
            Builtin::SysSetRecursionLimit => "setrecursionlimit",
            Builtin::SysGetRecursionLimit => "getrecursionlimit",
        }
    }

    /// Whether this builtin is a type (`type(x)` may return it).
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Builtin::Int
                | Builtin::Float
                | Builtin::Str
                | Builtin::Bool
                | Builtin::List
                | Builtin::Tuple
                | Builtin::Dict
                | Builtin::Set
                | Builtin::Range
                | Builtin::Type
                | Builtin::Object
                | Builtin::Deque
                | Builtin::DefaultDict
                | Builtin::Counter
                | Builtin::NoneType
                | Builtin::Function
        )
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        GLOBAL.iter().copied().find(|b| b.name() == name)
    }
}

/// Resolves a name in the builtin scope.
pub(crate) fn lookup(name: &str) -> Option<Value> {
    if name == "__name__" {
        return Some(Value::str("__main__"));
    }
    if let Some(builtin) = Builtin::from_name(name) {
        return Some(Value::Builtin(builtin));
    }
    ExcKind::from_name(name).map(Value::ExcClass)
}

/// `type(value)`.
pub(crate) fn type_of(value: &Value) -> Value {
    let builtin = match value {
        Value::None => Builtin::NoneType,
        Value::Bool(_) => Builtin::Bool,
        Value::Int(_) => Builtin::Int,
        Value::Float(_) => Builtin::Float,
        Value::Str(_) => Builtin::Str,
        Value::List(list) => match list.kind {
            SeqKind::List => Builtin::List,
            SeqKind::Deque => Builtin::Deque,
        },
        Value::Tuple(_) => Builtin::Tuple,
        Value::Dict(dict) => match dict.kind {
            DictKind::Dict => Builtin::Dict,
            DictKind::DefaultDict(_) => Builtin::DefaultDict,
            DictKind::Counter => Builtin::Counter,
        },
        Value::Set(_) => Builtin::Set,
        Value::Range(_) => Builtin::Range,
        Value::Function(_) | Value::BoundMethod(_) => Builtin::Function,
        Value::Builtin(b) if !b.is_type() => Builtin::Function,
        Value::Builtin(_) | Value::Class(_) | Value::ExcClass(_) => Builtin::Type,
        Value::Instance(instance) => return Value::Class(instance.class.clone()),
        Value::Exception(exc) => {
            return match &exc.class {
                Some(class) => Value::Class(class.clone()),
                None => Value::ExcClass(exc.kind),
            }
        }
        Value::Super(_) | Value::Module(_) | Value::Iterator(_) => Builtin::Object,
    };
    Value::Builtin(builtin)
}

/// `isinstance(value, builtin_type)`.
fn is_builtin_instance(value: &Value, builtin: Builtin) -> bool {
    match builtin {
        Builtin::Object => true,
        Builtin::Int => matches!(value, Value::Int(_) | Value::Bool(_)),
        Builtin::Dict => matches!(value, Value::Dict(_)),
        Builtin::Type => matches!(value, Value::Class(_) | Value::ExcClass(_))
            || matches!(value, Value::Builtin(b) if b.is_type()),
        other => matches!(type_of(value), Value::Builtin(b) if b == other),
    }
}

fn expect_int(value: &Value) -> RtResult<i64> {
    match value {
        Value::Int(_) | Value::Bool(_) => Ok(value.as_int().unwrap_or_default()),
        other => raise(
            ExcKind::TypeError,
            format!(
                "'{}' object cannot be interpreted as an integer",
                other.type_name()
            ),
        ),
    }
}

fn expect_float(function: &str, value: &Value) -> RtResult<f64> {
    value.as_float().ok_or_else(|| {
        Exception::new(
            ExcKind::TypeError,
            format!("{function}() argument must be a real number, not '{}'", value.type_name()),
        )
    })
}

/// Converts an integral float to `int`, as `int()`, `math.floor` and
/// `round` do.
fn float_to_int(f: f64) -> RtResult<Value> {
    if f.is_nan() {
        return raise(ExcKind::ValueError, "cannot convert float NaN to integer");
    }
    if f.is_infinite() {
        return raise(ExcKind::OverflowError, "cannot convert float infinity to integer");
    }
    if f < -9.223_372_036_854_776e18 || f >= 9.223_372_036_854_776e18 {
        return raise(ExcKind::OverflowError, "integer result out of range");
    }
    Ok(Value::Int(f as i64))
}

pub(crate) fn parse_int(text: &str, base: u32) -> Option<i64> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits = match base {
        16 => digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")).unwrap_or(digits),
        8 => digits.strip_prefix("0o").or_else(|| digits.strip_prefix("0O")).unwrap_or(digits),
        2 => digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")).unwrap_or(digits),
        _ => digits,
    };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return None;
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    let magnitude = i128::from_str_radix(&cleaned, base).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).ok()
}

fn parse_float(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();
    let unsigned = lower.trim_start_matches(['+', '-']);
    let negative = lower.starts_with('-');
    let special = match unsigned {
        "inf" | "infinity" => Some(f64::INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    };
    if let Some(value) = special {
        return Some(if negative { -value } else { value });
    }
    if trimmed.contains("__") || trimmed.starts_with('_') || trimmed.ends_with('_') {
        return None;
    }
    trimmed.replace('_', "").parse().ok()
}

fn text_keyword(args: &mut Args, key: &str, default: &str) -> RtResult<String> {
    match args.keyword(key) {
        None | Some(Value::None) => Ok(default.to_string()),
        Some(Value::Str(text)) => Ok(text.to_string()),
        Some(other) => raise(
            ExcKind::TypeError,
            format!("{key} must be None or a string, not {}", other.type_name()),
        ),
    }
}

fn hash_value(value: &Value) -> RtResult<i64> {
    let key = HashKey::of(value)?;
    if let HashKey::Int(i) = key {
        return Ok(i);
    }
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    Ok(hasher.finish() as i64)
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a as i64
}

impl Interpreter<'_> {
    pub(crate) fn call_builtin(&mut self, builtin: Builtin, mut args: Args) -> RtResult<Value> {
        let name = builtin.name();
        match builtin {
            Builtin::Print => {
                let sep = text_keyword(&mut args, "sep", " ")?;
                let end = text_keyword(&mut args, "end", "\n")?;
                args.keyword("flush");
                args.finish(name)?;
                let mut line = String::new();
                for (i, value) in args.positional.iter().enumerate() {
                    if i > 0 {
                        line.push_str(&sep);
                    }
                    line.push_str(&self.str_of(value)?);
                }
                line.push_str(&end);
                self.write_output(&line);
                Ok(Value::None)
            }
            Builtin::Input => {
                args.finish(name)?;
                args.arity(name, 0, 1)?;
                if let Some(prompt) = args.positional.first() {
                    let prompt = self.str_of(prompt)?;
                    self.write_output(&prompt);
                }
                match self.next_input() {
                    Some(value) => Ok(Value::str(self.str_of(&value)?)),
                    None => raise(ExcKind::EOFError, "EOF when reading a line"),
                }
            }
            Builtin::Len => {
                args.finish(name)?;
                args.arity(name, 1, 1)?;
                self.len_of(&args.positional[0]).map(|n| Value::Int(n as i64))
            }
            Builtin::Range => {
                args.finish(name)?;
                args.arity(name, 1, 3)?;
                let ints = args
                    .positional
                    .iter()
                    .map(expect_int)
                    .collect::<RtResult<Vec<_>>>()?;
                let (start, stop, step) = match ints.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step] => (*start, *stop, *step),
                    _ => (0, 0, 1),
                };
                if step == 0 {
                    return raise(ExcKind::ValueError, "range() arg 3 must not be zero");
                }
                Ok(Value::Range(RangeObj { start, stop, step }))
            }
            Builtin::Int => {
                args.finish(name)?;
                args.arity(name, 0, 2)?;
                let Some(value) = args.positional.first() else {
                    return Ok(Value::Int(0));
                };
                if let Some(base) = args.positional.get(1) {
                    let base = expect_int(base)?;
                    let Value::Str(text) = value else {
                        return raise(
                            ExcKind::TypeError,
                            "int() can't convert non-string with explicit base",
                        );
                    };
                    if !(2..=36).contains(&base) {
                        return raise(ExcKind::ValueError, "int() base must be >= 2 and <= 36");
                    }
                    return parse_int(text, base as u32).map(Value::Int).ok_or_else(|| {
                        Exception::new(
                            ExcKind::ValueError,
                            format!(
                                "invalid literal for int() with base {base}: {}",
                                format::str_repr(text)
                            ),
                        )
                    });
                }
                match value {
                    Value::Int(_) | Value::Bool(_) => Ok(Value::Int(value.as_int().unwrap_or_default())),
                    Value::Float(f) => float_to_int(f.trunc()),
                    Value::Str(text) => parse_int(text, 10).map(Value::Int).ok_or_else(|| {
                        Exception::new(
                            ExcKind::ValueError,
                            format!(
                                "invalid literal for int() with base 10: {}",
                                format::str_repr(text)
                            ),
                        )
                    }),
                    other => raise(
                        ExcKind::TypeError,
                        format!(
                            "int() argument must be a string, a bytes-like object or a real number, not '{}'",
                            other.type_name()
                        ),
                    ),
                }
            }
            Builtin::Float => {
                args.finish(name)?;
                args.arity(name, 0, 1)?;
                match args.positional.first() {
                    None => Ok(Value::Float(0.0)),
                    Some(Value::Str(text)) => parse_float(text).map(Value::Float).ok_or_else(|| {
                        Exception::new(
                            ExcKind::ValueError,
                            format!(
                                "could not convert string to float: {}",
                                format::str_repr(text)
                            ),
                        )
                    }),
                    Some(value) => match value.as_float() {
                        Some(f) => Ok(Value::Float(f)),
                        None => raise(
                            ExcKind::TypeError,
                            format!(
                                "float() argument must be a string or a real number, not '{}'",
                                value.type_name()
                            ),
                        ),
                    },
                }
            }
            Builtin::Str => {
                args.finish(name)?;
                args.arity(name, 0, 1)?;
                match args.positional.first() {
                    None => Ok(Value::str("")),
                    Some(value) => Ok(Value::str(self.str_of(value)?)),
                }
            }
            Builtin::Bool => {
                args.finish(name)?;
                args.arity(name, 0, 1)?;
                match args.positional.first() {
                    None => Ok(Value::Bool(false)),
                    Some(value) => Ok(Value::Bool(self.truthy(value)?)),
                }
            }
            Builtin::List | Builtin::Tuple | Builtin::Set | Builtin::Deque => {
                let maxlen = if builtin == Builtin::Deque {
                    args.keyword("maxlen")
                } else {
                    None
                };
                if maxlen.is_some_and(|m| !matches!(m, Value::None)) {
                    return raise(ExcKind::TypeError, "deque(maxlen=...) is not supported");
                }
                args.finish(name)?;
                args.arity(name, 0, 1)?;
                let items = match args.positional.first() {
                    None => Vec::new(),
                    Some(value) => self.iter_values(value)?,
                };
                Ok(match builtin {
                    Builtin::List => Value::list(items),
                    Builtin::Tuple => Value::tuple(items),
                    Builtin::Deque => Value::List(ListObj::deque(items)),
                    _ => Value::Set(Rc::new(SetObj::from_values(items)?)),
                })
            }
            Builtin::Dict => {
                args.arity(name, 0, 1)?;
                let dict = DictObj::new(DictKind::Dict);
                if let Some(source) = args.positional.first() {
                    self.fill_dict(&dict, source)?;
                }
                for (key, value) in std::mem::take(&mut args.keywords) {
                    dict.insert(Value::Str(key), value)?;
                }
                Ok(Value::Dict(Rc::new(dict)))
            }
            Builtin::DefaultDict => {
                args.finish(name)?;
                args.arity(name, 0, 2)?;
                let factory = args.positional.first().cloned().unwrap_or(Value::None);
                if !matches!(
                    factory,
                    Value::None
                        | Value::Builtin(_)
                        | Value::Function(_)
                        | Value::BoundMethod(_)
                        | Value::Class(_)
                ) {
                    return raise(ExcKind::TypeError, "first argument must be callable or None");
                }
                let dict = DictObj::new(DictKind::DefaultDict(factory));
                if let Some(source) = args.positional.get(1) {
                    self.fill_dict(&dict, source)?;
                }
                Ok(Value::Dict(Rc::new(dict)))
            }
            Builtin::Counter => {
                args.arity(name, 0, 1)?;
                let dict = DictObj::new(DictKind::Counter);
                if let Some(source) = args.positional.first() {
                    self.count_into(&dict, source, 1)?;
                }
                for (key, value) in std::mem::take(&mut args.keywords) {
                    dict.insert(Value::Str(key), value)?;
                }
                Ok(Value::Dict(Rc::new(dict)))
            }
            Builtin::Abs => {
                args.finish(name)?;
                args.arity(name, 1, 1)?;
                match &args.positional[0] {
                    Value::Float(f) => Ok(Value::Float(f.abs())),
                    value @ (Value::Int(_) | Value::Bool(_)) => value
                        .as_int()
                        .and_then(i64::checked_abs)
                        .map(Value::Int)
                        .ok_or_else(|| Exception::new(ExcKind::OverflowError, "integer result out of range")),
                    other => raise(
                        ExcKind::TypeError,
                        format!("bad operand type for abs(): '{}'", other.type_name()),
                    ),
                }
            }
            Builtin::Min | Builtin::Max => self.min_max(builtin, args),
            Builtin::Sum => {
                let start = args.keyword("start");
                args.finish(name)?;
                args.arity(name, 1, 2)?;
                let items = self.iter_values(&args.positional[0])?;
                let mut total = start
                    .or_else(|| args.positional.get(1).cloned())
                    .unwrap_or(Value::Int(0));
                if matches!(total, Value::Str(_)) {
                    return raise(
                        ExcKind::TypeError,
                        "sum() can't sum strings [use ''.join(seq) instead]",
                    );
                }
                for item in items {
                    total = self.binary_op(BinOp::Add, &total, &item)?;
                }
                Ok(total)
            }
            Builtin::Sorted => {
                let key = args.keyword("key");
                let reverse = args.keyword("reverse");
                args.finish(name)?;
                args.arity(name, 1, 1)?;
                let items = self.iter_values(&args.positional[0])?;
                let reverse = match reverse {
                    Some(value) => self.truthy(&value)?,
                    None => false,
                };
                let sorted = self.sort_values(items, key.as_ref(), reverse)?;
                Ok(Value::list(sorted))
            }
            Builtin::Reversed => {
                args.finish(name)?;
                args.arity(name, 1, 1)?;
                let source = &args.positional[0];
                if matches!(source, Value::Set(_)) || matches!(source, Value::Iterator(_)) {
                    return raise(
                        ExcKind::TypeError,
                        format!("'{}' object is not reversible", source.type_name()),
                    );
                }
                let mut items = self.iter_values(source)?;
                items.reverse();
                Ok(Value::Iterator(IterObj::from_items("reversed", items)))
            }
            Builtin::Enumerate => {
                let start = args.keyword("start");
                args.finish(name)?;
                args.arity(name, 1, 2)?;
                let start = match start.or_else(|| args.positional.get(1).cloned()) {
                    Some(value) => expect_int(&value)?,
                    None => 0,
                };
                let items = self.iter_values(&args.positional[0])?;
                let pairs = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| Value::tuple(vec![Value::Int(start + i as i64), item]))
                    .collect();
                Ok(Value::Iterator(IterObj::from_items("enumerate", pairs)))
            }
            Builtin::Zip => {
                args.finish(name)?;
                let columns = args
                    .positional
                    .iter()
                    .map(|value| self.iter_values(value))
                    .collect::<RtResult<Vec<_>>>()?;
                let len = columns.iter().map(Vec::len).min().unwrap_or(0);
                let rows = (0..len)
                    .map(|i| Value::tuple(columns.iter().map(|column| column[i].clone()).collect()))
                    .collect();
                Ok(Value::Iterator(IterObj::from_items("zip", rows)))
            }
            Builtin::Map => {
                args.finish(name)?;
                if args.len() < 2 {
                    return raise(ExcKind::TypeError, "map() must have at least two arguments.");
                }
                let func = args.positional[0].clone();
                let columns = args.positional[1..]
                    .iter()
                    .map(|value| self.iter_values(value))
                    .collect::<RtResult<Vec<_>>>()?;
                let len = columns.iter().map(Vec::len).min().unwrap_or(0);
                let mut out = Vec::with_capacity(len);
                for i in 0..len {
                    let call_args = columns.iter().map(|column| column[i].clone()).collect();
                    out.push(self.call_value(&func, Args::positional(call_args))?);
                }
                Ok(Value::Iterator(IterObj::from_items("map", out)))
            }
            Builtin::Filter => {
                args.finish(name)?;
                args.arity(name, 2, 2)?;
                let func = args.positional[0].clone();
                let items = self.iter_values(&args.positional[1])?;
                let mut out = Vec::new();
                for item in items {
                    let keep = match &func {
                        Value::None => item.clone(),
                        func => self.call_value(func, Args::positional(vec![item.clone()]))?,
                    };
                    if self.truthy(&keep)? {
                        out.push(item);
                    }
                }
                Ok(Value::Iterator(IterObj::from_items("filter", out)))
            }
            Builtin::Any | Builtin::All => {
                args.finish(name)?;
                args.arity(name, 1, 1)?;
                let want = builtin == Builtin::Any;
                let mut cursor = self.cursor(&args.positional[0])?;
                while let Some(item) = cursor.next()? {
                    if self.truthy(&item)? == want {
                        return Ok(Value::Bool(want));
                    }
                }
                Ok(Value::Bool(!want))
            }
            Builtin::IsInstance => {
                args.finish(name)?;
                args.arity(name, 2, 2)?;
                isinstance(&args.positional[0], &args.positional[1]).map(Value::Bool)
            }
            Builtin::Type => {
                args.finish(name)?;
                args.arity(name, 1, 1)?;
                Ok(type_of(&args.positional[0]))
            }
            Builtin::Repr => {
                args.finish(name)?;
                args.arity(name, 1, 1)?;
                Ok(Value::str(self.repr_of(&args.positional[0])?))
            }
            Builtin::Ord => {
                args.finish(name)?;
                args.arity(name, 1, 1)?;
                match &args.positional[0] {
                    Value::Str(text) => {
                        let mut chars = text.chars();
                        match (chars.next(), chars.next()) {
                            (Some(c), None) => Ok(Value::Int(c as i64)),
                            _ => raise(
                                ExcKind::TypeError,
                                format!(
                                    "ord() expected a character, but string of length {} found",
                                    text.chars().count()
                                ),
                            ),
                        }
                    }
                    other => raise(
                        ExcKind::TypeError,
                        format!("ord() expected string of length 1, but {} found", other.type_name()),
                    ),
                }
            }
            Builtin::Chr => {
                args.finish(name)?;
                args.arity(name, 1, 1)?;
                let code = expect_int(&args.positional[0])?;
                u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .map(|c| Value::str(c.encode_utf8(&mut [0; 4])))
                    .ok_or_else(|| Exception::new(ExcKind::ValueError, "chr() arg not in range(0x110000)"))
            }
            Builtin::Round => {
                let ndigits = args.keyword("ndigits");
                args.finish(name)?;
                args.arity(name, 1, 2)?;
                let ndigits = match ndigits.or_else(|| args.positional.get(1).cloned()) {
                    None | Some(Value::None) => None,
                    Some(value) => Some(expect_int(&value)?),
                };
                round(&args.positional[0], ndigits)
            }
            Builtin::Divmod => {
                args.finish(name)?;
                args.arity(name, 2, 2)?;
                let (a, b) = (&args.positional[0], &args.positional[1]);
                let quotient = self.binary_op(BinOp::FloorDiv, a, b)?;
                let remainder = self.binary_op(BinOp::Mod, a, b)?;
                Ok(Value::tuple(vec![quotient, remainder]))
            }
            Builtin::Pow | Builtin::MathPow => {
                args.finish(name)?;
                if builtin == Builtin::MathPow {
                    args.arity(name, 2, 2)?;
                    let base = expect_float(name, &args.positional[0])?;
                    let exp = expect_float(name, &args.positional[1])?;
                    return Ok(Value::Float(base.powf(exp)));
                }
                args.arity(name, 2, 3)?;
                match args.positional.get(2) {
                    None => self.binary_op(
                        BinOp::Pow,
                        &args.positional[0],
                        &args.positional[1],
                    ),
                    Some(modulus) => {
                        let base = expect_int(&args.positional[0])?;
                        let exp = expect_int(&args.positional[1])?;
                        let modulus = expect_int(modulus)?;
                        mod_pow(base, exp, modulus).map(Value::Int)
                    }
                }
            }
            Builtin::Hash => {
                args.finish(name)?;
                args.arity(name, 1, 1)?;
                hash_value(&args.positional[0]).map(Value::Int)
            }
            Builtin::Id => {
                args.finish(name)?;
                args.arity(name, 1, 1)?;
                let value = &args.positional[0];
                match value.identity() {
                    Some(id) => Ok(Value::Int(id as i64)),
                    None => hash_value(value).map(Value::Int),
                }
            }
            Builtin::Iter => {
                args.finish(name)?;
                args.arity(name, 1, 1)?;
                let value = &args.positional[0];
                if let Value::Iterator(_) = value {
                    return Ok(value.clone());
                }
                let label = match value {
                    Value::List(list) if list.kind == SeqKind::Deque => "deque_iterator",
                    Value::List(_) => "list_iterator",
                    Value::Tuple(_) => "tuple_iterator",
                    Value::Str(_) => "str_iterator",
                    Value::Dict(_) => "dict_keyiterator",
                    Value::Set(_) => "set_iterator",
                    Value::Range(_) => "range_iterator",
                    _ => "iterator",
                };
                let cursor = self.cursor(value)?;
                Ok(Value::Iterator(IterObj::new(label, cursor)))
            }
            Builtin::Next => {
                args.finish(name)?;
                args.arity(name, 1, 2)?;
                let Value::Iterator(it) = &args.positional[0] else {
                    return raise(
                        ExcKind::TypeError,
                        format!("'{}' object is not an iterator", args.positional[0].type_name()),
                    );
                };
                match it.next()? {
                    Some(item) => Ok(item),
                    None => match args.positional.get(1) {
                        Some(default) => Ok(default.clone()),
                        None => Err(Exception::with_args(ExcKind::StopIteration, Vec::new())),
                    },
                }
            }
            Builtin::HasAttr | Builtin::GetAttr => {
                args.finish(name)?;
                let max = if builtin == Builtin::GetAttr { 3 } else { 2 };
                args.arity(name, 2, max)?;
                let Value::Str(attr) = &args.positional[1] else {
                    return raise(ExcKind::TypeError, "attribute name must be string");
                };
                let result = self.get_attr(&args.positional[0], attr);
                match (builtin, result) {
                    (Builtin::HasAttr, Ok(_)) => Ok(Value::Bool(true)),
                    (Builtin::HasAttr, Err(exc)) if exc.kind() == ExcKind::AttributeError => {
                        Ok(Value::Bool(false))
                    }
                    (_, Err(exc)) if exc.kind() == ExcKind::AttributeError && args.len() == 3 => {
                        Ok(args.positional[2].clone())
                    }
                    (_, result) => result,
                }
            }
            Builtin::SetAttr => {
                args.finish(name)?;
                args.arity(name, 3, 3)?;
                let Value::Str(attr) = &args.positional[1] else {
                    return raise(ExcKind::TypeError, "attribute name must be string");
                };
                self.set_attr(&args.positional[0], attr, args.positional[2].clone())?;
                Ok(Value::None)
            }
            Builtin::Super => {
                args.finish(name)?;
                self.make_super(args)
            }
            Builtin::Object => {
                args.finish(name)?;
                args.arity(name, 0, 0)?;
                Ok(Value::Instance(Rc::new(crate::value::Instance {
                    class: Rc::new(crate::value::Class {
                        name: Rc::from("object"),
                        base: None,
                        attrs: Default::default(),
                    }),
                    attrs: Default::default(),
                })))
            }
            Builtin::Format => {
                args.finish(name)?;
                args.arity(name, 1, 2)?;
                match args.positional.get(1) {
                    Some(Value::Str(spec)) if !spec.is_empty() => Ok(Value::str(format::format_value(
                        &args.positional[0],
                        spec,
                        self,
                    )?)),
                    _ => Ok(Value::str(self.str_of(&args.positional[0])?)),
                }
            }
            Builtin::NoneType | Builtin::Function => raise(
                ExcKind::TypeError,
                format!("cannot create '{name}' instances"),
            ),
            Builtin::MathSqrt | Builtin::MathLog => {
                args.finish(name)?;
                let max = if builtin == Builtin::MathLog { 2 } else { 1 };
                args.arity(name, 1, max)?;
                let x = expect_float(name, &args.positional[0])?;
                let result = match (builtin, args.positional.get(1)) {
                    (Builtin::MathSqrt, _) if x >= 0.0 => Some(x.sqrt()),
                    (Builtin::MathLog, None) if x > 0.0 => Some(x.ln()),
                    (Builtin::MathLog, Some(base)) if x > 0.0 => {
                        let base = expect_float(name, base)?;
                        (base > 0.0 && base != 1.0).then(|| x.ln() / base.ln())
                    }
                    _ => None,
                };
                result
                    .map(Value::Float)
                    .ok_or_else(|| Exception::new(ExcKind::ValueError, "math domain error"))
            }
            Builtin::MathFloor | Builtin::MathCeil => {
                args.finish(name)?;
                args.arity(name, 1, 1)?;
                match &args.positional[0] {
                    value @ (Value::Int(_) | Value::Bool(_)) => Ok(Value::Int(value.as_int().unwrap_or_default())),
                    value => {
                        let x = expect_float(name, value)?;
                        float_to_int(if builtin == Builtin::MathFloor { x.floor() } else { x.ceil() })
                    }
                }
            }
            Builtin::MathGcd => {
                args.finish(name)?;
                let mut result = 0;
                for value in &args.positional {
                    result = gcd(result, expect_int(value)?);
                }
                Ok(Value::Int(result))
            }
            Builtin::HeapPush | Builtin::HeapPop | Builtin::Heapify => {
                args.finish(name)?;
                let expected = if builtin == Builtin::HeapPush { 2 } else { 1 };
                args.arity(name, expected, expected)?;
                let Value::List(list) = &args.positional[0] else {
                    return raise(ExcKind::TypeError, "heap argument must be a list");
                };
                let list = list.clone();
                let mut heap = list.snapshot();
                let mut less = |a: &Value, b: &Value| self.lt(a, b);
                let result = match builtin {
                    Builtin::HeapPush => {
                        sort::heap_push(&mut heap, args.positional[1].clone(), &mut less)?;
                        Value::None
                    }
                    Builtin::HeapPop => match sort::heap_pop(&mut heap, &mut less)? {
                        Some(item) => item,
                        None => return raise(ExcKind::IndexError, "index out of range"),
                    },
                    _ => {
                        sort::heapify(&mut heap, &mut less)?;
                        Value::None
                    }
                };
                *list.items.borrow_mut() = heap;
                Ok(result)
            }
            Builtin::SysSetRecursionLimit => {
                args.finish(name)?;
                args.arity(name, 1, 1)?;
                let limit = expect_int(&args.positional[0])?;
                self.set_recursion_limit(limit)?;
                Ok(Value::None)
            }
            Builtin::SysGetRecursionLimit => {
                args.finish(name)?;
                args.arity(name, 0, 0)?;
                Ok(Value::Int(self.recursion_limit() as i64))
            }
        }
    }

    pub(crate) fn len_of(&mut self, value: &Value) -> RtResult<usize> {
        let len = match value {
            Value::Str(text) => text.chars().count(),
            Value::List(list) => list.len(),
            Value::Tuple(items) => items.len(),
            Value::Dict(dict) => dict.len(),
            Value::Set(set) => set.len(),
            Value::Range(range) => range.len(),
            Value::Instance(instance) => {
                let Some(method) = instance.class.lookup("__len__") else {
                    return raise(
                        ExcKind::TypeError,
                        format!("object of type '{}' has no len()", value.type_name()),
                    );
                };
                let result = self.call_value(&method, Args::positional(vec![value.clone()]))?;
                return match result.as_int() {
                    Some(n) if n >= 0 => Ok(n as usize),
                    Some(_) => raise(ExcKind::ValueError, "__len__() should return >= 0"),
                    None => raise(
                        ExcKind::TypeError,
                        format!(
                            "'{}' object cannot be interpreted as an integer",
                            result.type_name()
                        ),
                    ),
                };
            }
            other => {
                return raise(
                    ExcKind::TypeError,
                    format!("object of type '{}' has no len()", other.type_name()),
                )
            }
        };
        Ok(len)
    }

    /// Copies a mapping, or an iterable of key/value pairs, into `dict`.
    pub(crate) fn fill_dict(&mut self, dict: &DictObj, source: &Value) -> RtResult<()> {
        if let Value::Dict(other) = source {
            for (key, value) in other.items() {
                dict.insert(key, value)?;
            }
            return Ok(());
        }
        for (i, pair) in self.iter_values(source)?.into_iter().enumerate() {
            let items = self.iter_values(&pair).map_err(|_| {
                Exception::new(
                    ExcKind::TypeError,
                    format!("cannot convert dictionary update sequence element #{i} to a sequence"),
                )
            })?;
            let [key, value] = <[Value; 2]>::try_from(items).map_err(|items| {
                Exception::new(
                    ExcKind::ValueError,
                    format!(
                        "dictionary update sequence element #{i} has length {}; 2 is required",
                        items.len()
                    ),
                )
            })?;
            dict.insert(key, value)?;
        }
        Ok(())
    }

    /// Adds `sign` times the count of every element (or mapping entry) of
    /// `source` to a counter.
    pub(crate) fn count_into(&mut self, counter: &DictObj, source: &Value, sign: i64) -> RtResult<()> {
        let increments: Vec<(Value, Value)> = match source {
            Value::Dict(other) => other.items(),
            other => self
                .iter_values(other)?
                .into_iter()
                .map(|item| (item, Value::Int(1)))
                .collect(),
        };
        for (key, amount) in increments {
            let current = counter.get(&key)?.unwrap_or(Value::Int(0));
            let amount = match sign {
                1 => amount,
                _ => self.unary_op(UnaryOp::Neg, &amount)?,
            };
            let updated = self.binary_op(BinOp::Add, &current, &amount)?;
            counter.insert(key, updated)?;
        }
        Ok(())
    }

    fn min_max(&mut self, builtin: Builtin, mut args: Args) -> RtResult<Value> {
        let name = builtin.name();
        let key = args.keyword("key").filter(|k| !matches!(k, Value::None));
        let default = args.keyword("default");
        args.finish(name)?;
        let items = match args.len() {
            0 => {
                return raise(
                    ExcKind::TypeError,
                    format!("{name} expected at least 1 argument, got 0"),
                )
            }
            1 => self.iter_values(&args.positional[0])?,
            _ => {
                if default.is_some() {
                    return raise(
                        ExcKind::TypeError,
                        format!("Cannot specify a default for {name}() with multiple positional arguments"),
                    );
                }
                std::mem::take(&mut args.positional)
            }
        };
        let mut best: Option<(Value, Value)> = None;
        for item in items {
            let rank = match &key {
                Some(key) => self.call_value(key, Args::positional(vec![item.clone()]))?,
                None => item.clone(),
            };
            let replace = match &best {
                None => true,
                Some((best_rank, _)) if builtin == Builtin::Min => self.lt(&rank, best_rank)?,
                Some((best_rank, _)) => self.lt(best_rank, &rank)?,
            };
            if replace {
                best = Some((rank, item));
            }
        }
        match (best, default) {
            (Some((_, item)), _) => Ok(item),
            (None, Some(default)) => Ok(default),
            (None, None) => raise(
                ExcKind::ValueError,
                format!("{name}() iterable argument is empty"),
            ),
        }
    }

    /// Sorts by `key(item)` (or the items themselves), stably.
    pub(crate) fn sort_values(
        &mut self,
        items: Vec<Value>,
        key: Option<&Value>,
        reverse: bool,
    ) -> RtResult<Vec<Value>> {
        let decorated = match key {
            Some(key) if !matches!(key, Value::None) => items
                .into_iter()
                .map(|item| {
                    let rank = self.call_value(key, Args::positional(vec![item.clone()]))?;
                    Ok((rank, item))
                })
                .collect::<RtResult<Vec<_>>>()?,
            _ => items.into_iter().map(|item| (item.clone(), item)).collect(),
        };
        let sorted = sort::merge_sort(decorated, &mut |a: &(Value, Value), b: &(Value, Value)| {
            if reverse {
                self.lt(&b.0, &a.0)
            } else {
                self.lt(&a.0, &b.0)
            }
        })?;
        Ok(sorted.into_iter().map(|(_, item)| item).collect())
    }
}

fn isinstance(value: &Value, class: &Value) -> RtResult<bool> {
    Ok(match class {
        Value::Builtin(builtin) if builtin.is_type() => is_builtin_instance(value, *builtin),
        Value::Class(target) => match value {
            Value::Instance(instance) => instance.class.is_subclass_of(target),
            Value::Exception(exc) => exc
                .class
                .as_ref()
                .is_some_and(|own| own.is_subclass_of(target)),
            _ => false,
        },
        Value::ExcClass(kind) => match value {
            Value::Exception(exc) => exc.kind.is_subclass_of(*kind),
            _ => false,
        },
        Value::Tuple(options) => {
            for option in options.iter() {
                if isinstance(value, option)? {
                    return Ok(true);
                }
            }
            false
        }
        _ => {
            return raise(
                ExcKind::TypeError,
                "isinstance() arg 2 must be a type, a tuple of types, or a union",
            )
        }
    })
}

fn round(value: &Value, ndigits: Option<i64>) -> RtResult<Value> {
    match (value, ndigits) {
        (Value::Int(_) | Value::Bool(_), None) => Ok(Value::Int(value.as_int().unwrap_or_default())),
        (Value::Int(_) | Value::Bool(_), Some(n)) if n >= 0 => Ok(Value::Int(value.as_int().unwrap_or_default())),
        (Value::Int(_) | Value::Bool(_), Some(n)) => {
            let i = value.as_int().unwrap_or_default();
            let Some(factor) = u32::try_from(n.unsigned_abs()).ok().and_then(|e| 10i64.checked_pow(e)) else {
                return Ok(Value::Int(0));
            };
            let rounded = (i as f64 / factor as f64).round_ties_even() as i64;
            rounded
                .checked_mul(factor)
                .map(Value::Int)
                .ok_or_else(|| Exception::new(ExcKind::OverflowError, "integer result out of range"))
        }
        (Value::Float(f), None) => float_to_int(f.round_ties_even()),
        (Value::Float(f), Some(_)) if !f.is_finite() => Ok(Value::Float(*f)),
        (Value::Float(f), Some(n)) if n >= 0 => {
            // Decimal formatting rounds the exact binary value correctly.
            let text = format!("{:.*}", n.min(300) as usize, f);
            Ok(Value::Float(text.parse().unwrap_or(*f)))
        }
        (Value::Float(f), Some(n)) => {
            let factor = 10f64.powi(n.unsigned_abs().min(308) as i32);
            Ok(Value::Float((f / factor).round_ties_even() * factor))
        }
        (other, _) => raise(
            ExcKind::TypeError,
            format!("type {} doesn't define __round__ method", other.type_name()),
        ),
    }
}

fn mod_pow(base: i64, exp: i64, modulus: i64) -> RtResult<i64> {
    if modulus == 0 {
        return raise(ExcKind::ValueError, "pow() 3rd argument cannot be 0");
    }
    if exp < 0 {
        return raise(
            ExcKind::ValueError,
            "pow() 2nd argument cannot be negative when 3rd argument specified",
        );
    }
    let m = modulus as i128;
    let mut result: i128 = 1;
    let mut base = (base as i128).rem_euclid(m);
    let mut exp = exp;
    while exp > 0 {
        if exp & 1 == 1 {
            result = (result * base).rem_euclid(m);
        }
        base = (base * base).rem_euclid(m);
        exp >>= 1;
    }
    // The result takes the sign of the modulus.
    if modulus < 0 && result > 0 {
        result += m;
    }
    Ok(result as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_names_resolve() {
        assert_eq!(Builtin::from_name("len"), Some(Builtin::Len));
        assert_eq!(Builtin::from_name("heappush"), None);
        assert!(matches!(lookup("ValueError"), Some(Value::ExcClass(ExcKind::ValueError))));
        assert!(matches!(lookup("__name__"), Some(Value::Str(s)) if &*s == "__main__"));
        assert!(lookup("undefined_name").is_none());
    }

    #[test]
    fn int_parsing() {
        assert_eq!(parse_int(" 42 ", 10), Some(42));
        assert_eq!(parse_int("-1_000", 10), Some(-1000));
        assert_eq!(parse_int("ff", 16), Some(255));
        assert_eq!(parse_int("0b101", 2), Some(5));
        assert_eq!(parse_int("4.5", 10), None);
        assert_eq!(parse_int("", 10), None);
        assert_eq!(parse_int("99999999999999999999", 10), None);
    }

    #[test]
    fn float_parsing() {
        assert_eq!(parse_float("2.5"), Some(2.5));
        assert_eq!(parse_float(" -inf "), Some(f64::NEG_INFINITY));
        assert!(parse_float("nan").is_some_and(f64::is_nan));
        assert_eq!(parse_float("abc"), None);
    }

    #[test]
    fn rounding() {
        assert!(matches!(round(&Value::Float(2.5), None), Ok(Value::Int(2))));
        assert!(matches!(round(&Value::Float(3.5), None), Ok(Value::Int(4))));
        assert!(matches!(round(&Value::Float(2.675), Some(2)), Ok(Value::Float(f)) if f == 2.67));
        assert!(matches!(round(&Value::Int(1234), Some(-2)), Ok(Value::Int(1200))));
    }

    #[test]
    fn rounding_to_the_most_negative_ndigits() {
        assert!(matches!(round(&Value::Int(5), Some(i64::MIN)), Ok(Value::Int(0))));
        assert!(matches!(round(&Value::Bool(true), Some(i64::MIN)), Ok(Value::Int(0))));
        assert!(matches!(round(&Value::Float(1.5), Some(i64::MIN)), Ok(Value::Float(f)) if f == 0.0));
        assert!(matches!(round(&Value::Float(-2.5e300), Some(i64::MIN + 1)), Ok(Value::Float(f)) if f == 0.0));
    }

    #[test]
    fn modular_pow() {
        assert_eq!(mod_pow(3, 4, 5).unwrap(), 1);
        assert_eq!(mod_pow(-2, 3, 5).unwrap(), 2);
        assert_eq!(mod_pow(2, 3, -3).unwrap(), -1);
        assert!(mod_pow(2, 3, 0).is_err());
    }

    #[test]
    fn types_of_values() {
        assert!(matches!(type_of(&Value::Bool(true)), Value::Builtin(Builtin::Bool)));
        assert!(matches!(type_of(&Value::List(ListObj::deque(vec![]))), Value::Builtin(Builtin::Deque)));
        assert!(is_builtin_instance(&Value::Bool(true), Builtin::Int));
        assert!(!is_builtin_instance(&Value::Int(1), Builtin::Bool));
    }
}
