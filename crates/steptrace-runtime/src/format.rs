//! Text conversions: `repr()`, `str()`, format specs, `%`-formatting and
//! `str.format`.
//!
//! Conversions that might reach a user-defined `__repr__`/`__str__` go
//! through a [`ReprHook`], so the same code serves the interpreter (which
//! calls back into the program) and contexts that must not run user code.

use std::fmt::Write as _;

use crate::error::{raise, ExcKind, Exception, RtResult};
use crate::value::{DictKind, SeqKind, Value};

/// Nesting beyond this renders as `...`.
const MAX_REPR_DEPTH: usize = 200;

pub trait ReprHook {
    /// Text from the instance's own `__str__` (`as_str`) or `__repr__`, if
    /// its class defines one.
    fn instance_text(&mut self, value: &Value, as_str: bool) -> RtResult<Option<String>>;
}

/// A hook that never runs user code.
pub struct NoHook;

impl ReprHook for NoHook {
    fn instance_text(&mut self, _value: &Value, _as_str: bool) -> RtResult<Option<String>> {
        Ok(None)
    }
}

/// `repr(value)`.
pub fn repr(value: &Value, hook: &mut dyn ReprHook) -> RtResult<String> {
    let mut out = String::new();
    let mut path = Vec::new();
    write_repr(&mut out, value, hook, &mut path)?;
    Ok(out)
}

/// `str(value)`.
pub fn to_str(value: &Value, hook: &mut dyn ReprHook) -> RtResult<String> {
    match value {
        Value::Str(s) => Ok(s.to_string()),
        Value::Instance(_) => match hook.instance_text(value, true)? {
            Some(text) => Ok(text),
            None => repr(value, hook),
        },
        Value::Exception(e) => {
            if e.class.is_some() {
                if let Some(text) = hook.instance_text(value, true)? {
                    return Ok(text);
                }
            }
            Ok(crate::error::message_of(e))
        }
        other => repr(other, hook),
    }
}

fn write_repr(
    out: &mut String,
    value: &Value,
    hook: &mut dyn ReprHook,
    path: &mut Vec<usize>,
) -> RtResult<()> {
    let container_id = match value {
        Value::List(_) | Value::Dict(_) | Value::Set(_) => value.identity(),
        _ => None,
    };
    if let Some(id) = container_id {
        if path.contains(&id) {
            out.push_str(match value {
                Value::List(_) => "[...]",
                _ => "{...}",
            });
            return Ok(());
        }
    }
    if path.len() > MAX_REPR_DEPTH {
        out.push_str("...");
        return Ok(());
    }
    if let Some(id) = container_id {
        path.push(id);
    }
    let result = write_repr_inner(out, value, hook, path);
    if container_id.is_some() {
        path.pop();
    }
    result
}

fn write_items(
    out: &mut String,
    items: &[Value],
    hook: &mut dyn ReprHook,
    path: &mut Vec<usize>,
) -> RtResult<()> {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_repr(out, item, hook, path)?;
    }
    Ok(())
}

fn write_repr_inner(
    out: &mut String,
    value: &Value,
    hook: &mut dyn ReprHook,
    path: &mut Vec<usize>,
) -> RtResult<()> {
    match value {
        Value::None => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Int(i) => {
            let _ = write!(out, "{i}");
        }
        Value::Float(f) => out.push_str(&float_repr(*f)),
        Value::Str(s) => out.push_str(&str_repr(s)),
        Value::List(list) => {
            let items = list.snapshot();
            match list.kind {
                SeqKind::List => {
                    out.push('[');
                    write_items(out, &items, hook, path)?;
                    out.push(']');
                }
                SeqKind::Deque => {
                    out.push_str("deque([");
                    write_items(out, &items, hook, path)?;
                    out.push_str("])");
                }
            }
        }
        Value::Tuple(items) => {
            out.push('(');
            write_items(out, items, hook, path)?;
            if items.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        Value::Dict(dict) => {
            let entries = dict.items();
            let (prefix, suffix) = match &dict.kind {
                DictKind::Dict => (String::new(), ""),
                DictKind::DefaultDict(factory) => {
                    let mut prefix = String::from("defaultdict(");
                    write_repr(&mut prefix, factory, hook, path)?;
                    prefix.push_str(", ");
                    (prefix, ")")
                }
                DictKind::Counter => ("Counter(".to_string(), ")"),
            };
            out.push_str(&prefix);
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_repr(out, k, hook, path)?;
                out.push_str(": ");
                write_repr(out, v, hook, path)?;
            }
            out.push('}');
            out.push_str(suffix);
        }
        Value::Set(set) => {
            let items = set.values();
            if items.is_empty() {
                out.push_str("set()");
            } else {
                out.push('{');
                write_items(out, &items, hook, path)?;
                out.push('}');
            }
        }
        Value::Range(r) => {
            if r.step == 1 {
                let _ = write!(out, "range({}, {})", r.start, r.stop);
            } else {
                let _ = write!(out, "range({}, {}, {})", r.start, r.stop, r.step);
            }
        }
        Value::Function(f) => {
            let _ = write!(out, "<function {}>", f.name);
        }
        Value::Builtin(b) if b.is_type() => {
            let _ = write!(out, "<class '{}'>", b.name());
        }
        Value::Builtin(b) => {
            let _ = write!(out, "<built-in function {}>", b.name());
        }
        Value::BoundMethod(m) => {
            let _ = write!(out, "<bound method {}>", m.name());
        }
        Value::Class(c) => {
            let _ = write!(out, "<class '__main__.{}'>", c.name);
        }
        Value::ExcClass(k) => {
            let _ = write!(out, "<class '{}'>", k.name());
        }
        Value::Instance(inst) => match hook.instance_text(value, false)? {
            Some(text) => out.push_str(&text),
            None => {
                let _ = write!(out, "<__main__.{} object>", inst.class.name);
            }
        },
        Value::Exception(exc) => {
            if exc.class.is_some() {
                if let Some(text) = hook.instance_text(value, false)? {
                    out.push_str(&text);
                    return Ok(());
                }
            }
            out.push_str(exc.type_name());
            out.push('(');
            let args = exc.args.borrow().clone();
            write_items(out, &args, hook, path)?;
            out.push(')');
        }
        Value::Super(s) => {
            let _ = write!(out, "<super: <class '{}'>>", s.class.name);
        }
        Value::Module(m) => {
            let _ = write!(out, "<module '{}' (built-in)>", m.name);
        }
        Value::Iterator(it) => {
            let _ = write!(out, "<{} object>", it.name);
        }
    }
    Ok(())
}

/// String literal form, preferring single quotes.
pub fn str_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Shortest round-tripping float text: positional for decimal exponents in
/// `-4..16`, scientific (`1e+16`, `1e-05`) otherwise, and always with a
/// fractional part or exponent.
pub fn float_repr(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let sci = format!("{:e}", x.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();

    let body = if (-4..16).contains(&exp) {
        if exp >= 0 {
            let int_len = exp as usize + 1;
            if digits.len() > int_len {
                format!("{}.{}", &digits[..int_len], &digits[int_len..])
            } else {
                format!("{}{}.0", digits, "0".repeat(int_len - digits.len()))
            }
        } else {
            format!("0.{}{}", "0".repeat((-exp - 1) as usize), digits)
        }
    } else {
        let mantissa = if digits.len() > 1 {
            format!("{}.{}", &digits[..1], &digits[1..])
        } else {
            digits
        };
        format!(
            "{mantissa}e{}{:02}",
            if exp < 0 { '-' } else { '+' },
            exp.unsigned_abs()
        )
    };
    if x < 0.0 {
        format!("-{body}")
    } else {
        body
    }
}

// ---------------------------------------------------------------------------
// Format specs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Spec {
    fill: char,
    align: Option<char>,
    sign: char,
    alternate: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    ty: Option<char>,
}

fn parse_spec(spec: &str) -> RtResult<Spec> {
    let chars: Vec<char> = spec.chars().collect();
    let mut i = 0;
    let mut parsed = Spec {
        fill: ' ',
        align: None,
        sign: '-',
        alternate: false,
        width: 0,
        grouping: None,
        precision: None,
        ty: None,
    };
    let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');

    if chars.len() >= 2 && is_align(chars[1]) {
        parsed.fill = chars[0];
        parsed.align = Some(chars[1]);
        i = 2;
    } else if !chars.is_empty() && is_align(chars[0]) {
        parsed.align = Some(chars[0]);
        i = 1;
    }
    if let Some(&c) = chars.get(i) {
        if matches!(c, '+' | '-' | ' ') {
            parsed.sign = c;
            i += 1;
        }
    }
    if chars.get(i) == Some(&'#') {
        parsed.alternate = true;
        i += 1;
    }
    if chars.get(i) == Some(&'0') {
        if parsed.align.is_none() {
            parsed.fill = '0';
            parsed.align = Some('=');
        }
        i += 1;
    }
    let start = i;
    while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
        i += 1;
    }
    if i > start {
        parsed.width = chars[start..i].iter().collect::<String>().parse().unwrap_or(0);
    }
    if let Some(&c) = chars.get(i) {
        if c == ',' || c == '_' {
            parsed.grouping = Some(c);
            i += 1;
        }
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        let start = i;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
        if i == start {
            return raise(ExcKind::ValueError, "Format specifier missing precision");
        }
        parsed.precision = chars[start..i].iter().collect::<String>().parse().ok();
    }
    if let Some(&c) = chars.get(i) {
        parsed.ty = Some(c);
        i += 1;
    }
    if i != chars.len() {
        return raise(ExcKind::ValueError, "Invalid format specifier");
    }
    Ok(parsed)
}

/// `format(value, spec)` for built-in value types.
pub fn format_value(value: &Value, spec: &str, hook: &mut dyn ReprHook) -> RtResult<String> {
    if spec.is_empty() {
        return to_str(value, hook);
    }
    let parsed = parse_spec(spec)?;
    match value {
        Value::Str(s) => format_str(s, &parsed),
        Value::Bool(b) if parsed.ty.is_none() => format_str(if *b { "True" } else { "False" }, &parsed),
        Value::Bool(_) | Value::Int(_) => {
            let i = value.as_int().unwrap_or_default();
            match parsed.ty {
                Some('e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%') => format_float(i as f64, &parsed),
                _ => format_int(i, &parsed),
            }
        }
        Value::Float(f) => format_float(*f, &parsed),
        other => raise(
            ExcKind::TypeError,
            format!("unsupported format string passed to {}.__format__", other.type_name()),
        ),
    }
}

fn format_str(s: &str, spec: &Spec) -> RtResult<String> {
    if !matches!(spec.ty, None | Some('s')) {
        return raise(
            ExcKind::ValueError,
            format!("Unknown format code '{}' for object of type 'str'", spec.ty.unwrap_or('s')),
        );
    }
    let text: String = match spec.precision {
        Some(p) => s.chars().take(p).collect(),
        None => s.to_string(),
    };
    Ok(pad(&text, "", spec, '<'))
}

fn format_int(i: i64, spec: &Spec) -> RtResult<String> {
    let magnitude = i.unsigned_abs();
    let (digits, prefix) = match spec.ty {
        None | Some('d') | Some('n') => (group(&magnitude.to_string(), spec.grouping), ""),
        Some('b') => (format!("{magnitude:b}"), "0b"),
        Some('o') => (format!("{magnitude:o}"), "0o"),
        Some('x') => (format!("{magnitude:x}"), "0x"),
        Some('X') => (format!("{magnitude:X}"), "0X"),
        Some('c') => {
            let c = u32::try_from(i)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| Exception::new(ExcKind::OverflowError, "%c arg not in range(0x110000)"))?;
            return Ok(pad(&c.to_string(), "", spec, '<'));
        }
        Some(other) => {
            return raise(
                ExcKind::ValueError,
                format!("Unknown format code '{other}' for object of type 'int'"),
            )
        }
    };
    let mut sign = sign_prefix(i < 0, spec.sign).to_string();
    if spec.alternate {
        sign.push_str(prefix);
    }
    Ok(pad(&digits, &sign, spec, '>'))
}

fn format_float(x: f64, spec: &Spec) -> RtResult<String> {
    let negative = x.is_sign_negative() && !x.is_nan();
    let magnitude = x.abs();
    let body = if !magnitude.is_finite() {
        let text = if magnitude.is_nan() { "nan" } else { "inf" };
        if matches!(spec.ty, Some('E' | 'F' | 'G')) {
            text.to_uppercase()
        } else {
            text.to_string()
        }
    } else {
        match spec.ty {
            Some('f') | Some('F') => {
                let p = spec.precision.unwrap_or(6);
                group_fixed(&format!("{magnitude:.p$}"), spec.grouping)
            }
            Some('e') | Some('E') => {
                let text = sci(magnitude, spec.precision.unwrap_or(6));
                if spec.ty == Some('E') {
                    text.to_uppercase()
                } else {
                    text
                }
            }
            Some('%') => {
                let p = spec.precision.unwrap_or(6);
                format!("{}%", group_fixed(&format!("{:.p$}", magnitude * 100.0), spec.grouping))
            }
            Some('g') | Some('G') => general(magnitude, spec.precision.unwrap_or(6), false),
            None => match spec.precision {
                Some(p) => general(magnitude, p, true),
                None => group_fixed(&float_repr(magnitude), spec.grouping),
            },
            Some(other) => {
                return raise(
                    ExcKind::ValueError,
                    format!("Unknown format code '{other}' for object of type 'float'"),
                )
            }
        }
    };
    Ok(pad(&body, sign_prefix(negative, spec.sign), spec, '>'))
}

/// Scientific notation with a signed, at least two digit exponent.
fn sci(x: f64, precision: usize) -> String {
    let text = format!("{x:.precision$e}");
    let (mantissa, exp) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    format!(
        "{mantissa}e{}{:02}",
        if exp < 0 { '-' } else { '+' },
        exp.unsigned_abs()
    )
}

/// The `g` presentation: significant digits, trailing zeros removed.
fn general(x: f64, precision: usize, keep_point: bool) -> String {
    let p = precision.max(1);
    if x == 0.0 {
        return if keep_point { "0.0" } else { "0" }.to_string();
    }
    let exp = format!("{:.*e}", p - 1, x)
        .split_once('e')
        .and_then(|(_, e)| e.parse::<i32>().ok())
        .unwrap_or(0);
    if exp < -4 || exp >= p as i32 {
        let s = sci(x, p - 1);
        match s.split_once('e') {
            Some((m, e)) => format!("{}e{e}", strip_zeros(m)),
            None => s,
        }
    } else {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        let fixed = strip_zeros(&format!("{x:.decimals$}"));
        if keep_point && !fixed.contains('.') {
            format!("{fixed}.0")
        } else {
            fixed
        }
    }
}

fn strip_zeros(text: &str) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text.to_string()
    }
}

fn sign_prefix(negative: bool, sign: char) -> &'static str {
    match (negative, sign) {
        (true, _) => "-",
        (false, '+') => "+",
        (false, ' ') => " ",
        _ => "",
    }
}

fn group(digits: &str, sep: Option<char>) -> String {
    let Some(sep) = sep else {
        return digits.to_string();
    };
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

fn group_fixed(text: &str, sep: Option<char>) -> String {
    match text.split_once('.') {
        Some((int, frac)) => format!("{}.{frac}", group(int, sep)),
        None => group(text, sep),
    }
}

fn pad(body: &str, sign: &str, spec: &Spec, default_align: char) -> String {
    let len = body.chars().count() + sign.chars().count();
    if len >= spec.width {
        return format!("{sign}{body}");
    }
    let fill = spec.width - len;
    let f = |n: usize| spec.fill.to_string().repeat(n);
    match spec.align.unwrap_or(default_align) {
        '<' => format!("{sign}{body}{}", f(fill)),
        '^' => format!("{}{sign}{body}{}", f(fill / 2), f(fill - fill / 2)),
        '=' => format!("{sign}{}{body}", f(fill)),
        _ => format!("{}{sign}{body}", f(fill)),
    }
}

// ---------------------------------------------------------------------------
// printf-style and str.format
// ---------------------------------------------------------------------------

/// `template % args`.
pub fn percent_format(template: &str, args: &Value, hook: &mut dyn ReprHook) -> RtResult<String> {
    let values: Vec<Value> = match args {
        Value::Tuple(items) => items.to_vec(),
        other => vec![other.clone()],
    };
    let mut next = values.iter();
    let mut out = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut spec = String::new();
        let ty = loop {
            match chars.next() {
                Some(c) if "-+ #0123456789.".contains(c) => spec.push(c),
                Some(c) => break c,
                None => return raise(ExcKind::ValueError, "incomplete format"),
            }
        };
        if ty == '%' {
            out.push('%');
            continue;
        }
        let value = next
            .next()
            .ok_or_else(|| Exception::new(ExcKind::TypeError, "not enough arguments for format string"))?;
        let left = spec.starts_with('-');
        let spec = spec.trim_start_matches('-');
        let text = match ty {
            's' => to_str(value, hook)?,
            'r' => repr(value, hook)?,
            'd' | 'i' => {
                let i = match value {
                    Value::Float(f) => f.trunc() as i64,
                    other => other.as_int().ok_or_else(|| {
                        Exception::new(
                            ExcKind::TypeError,
                            format!("%{ty} format: a real number is required, not {}", other.type_name()),
                        )
                    })?,
                };
                format_value(&Value::Int(i), spec, hook)?
            }
            'f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'x' | 'X' | 'o' | 'c' => {
                let numeric = match (ty, value) {
                    ('x' | 'X' | 'o' | 'c', v) => Value::Int(v.as_int().unwrap_or_default()),
                    (_, Value::Float(f)) => Value::Float(*f),
                    (_, v) => Value::Float(v.as_float().ok_or_else(|| {
                        Exception::new(
                            ExcKind::TypeError,
                            format!("must be real number, not {}", v.type_name()),
                        )
                    })?),
                };
                format_value(&numeric, &format!("{spec}{ty}"), hook)?
            }
            other => {
                return raise(
                    ExcKind::ValueError,
                    format!("unsupported format character '{other}'"),
                )
            }
        };
        if left {
            let width: usize = spec.split('.').next().and_then(|w| w.parse().ok()).unwrap_or(0);
            let _ = write!(out, "{text:<width$}");
        } else if matches!(ty, 's' | 'r') {
            let width: usize = spec.split('.').next().and_then(|w| w.parse().ok()).unwrap_or(0);
            let _ = write!(out, "{text:>width$}");
        } else {
            out.push_str(&text);
        }
    }
    if next.next().is_some() {
        return raise(
            ExcKind::TypeError,
            "not all arguments converted during string formatting",
        );
    }
    Ok(out)
}

/// `template.format(*args, **kwargs)`.
pub fn str_format(
    template: &str,
    args: &[Value],
    kwargs: &[(std::rc::Rc<str>, Value)],
    hook: &mut dyn ReprHook,
) -> RtResult<String> {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::new();
    let mut auto_index = 0usize;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => {
                out.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                out.push('}');
                i += 2;
            }
            '}' => return raise(ExcKind::ValueError, "Single '}' encountered in format string"),
            '{' => {
                let end = chars[i..]
                    .iter()
                    .position(|&c| c == '}')
                    .map(|p| p + i)
                    .ok_or_else(|| Exception::new(ExcKind::ValueError, "Single '{' encountered in format string"))?;
                let field: String = chars[i + 1..end].iter().collect();
                i = end + 1;

                let (head, spec) = match field.split_once(':') {
                    Some((h, s)) => (h, s),
                    None => (field.as_str(), ""),
                };
                let (name, conversion) = match head.split_once('!') {
                    Some((n, c)) => (n, c.chars().next()),
                    None => (head, None),
                };
                let value = if name.is_empty() {
                    let v = args.get(auto_index).cloned();
                    auto_index += 1;
                    v.ok_or_else(|| {
                        Exception::new(
                            ExcKind::IndexError,
                            format!("Replacement index {} out of range for positional args tuple", auto_index - 1),
                        )
                    })?
                } else if let Ok(index) = name.parse::<usize>() {
                    args.get(index).cloned().ok_or_else(|| {
                        Exception::new(
                            ExcKind::IndexError,
                            format!("Replacement index {index} out of range for positional args tuple"),
                        )
                    })?
                } else {
                    kwargs
                        .iter()
                        .find(|(k, _)| &**k == name)
                        .map(|(_, v)| v.clone())
                        .ok_or_else(|| Exception::with_args(ExcKind::KeyError, vec![Value::str(name)]))?
                };
                let value = match conversion {
                    Some('r') => Value::str(repr(&value, hook)?),
                    Some('s') => Value::str(to_str(&value, hook)?),
                    _ => value,
                };
                out.push_str(&format_value(&value, spec, hook)?);
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(v: &Value) -> String {
        repr(v, &mut NoHook).unwrap()
    }

    #[test]
    fn float_repr_matches_the_language() {
        assert_eq!(float_repr(1.0), "1.0");
        assert_eq!(float_repr(0.1), "0.1");
        assert_eq!(float_repr(123.456), "123.456");
        assert_eq!(float_repr(100.0), "100.0");
        assert_eq!(float_repr(-2.5), "-2.5");
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1e-5), "1e-05");
        assert_eq!(float_repr(0.0001), "0.0001");
        assert_eq!(float_repr(1.5e300), "1.5e+300");
        assert_eq!(float_repr(f64::INFINITY), "inf");
        assert_eq!(float_repr(-0.0), "-0.0");
        assert_eq!(float_repr(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn container_reprs() {
        let list = Value::list(vec![Value::Int(1), Value::str("a"), Value::None]);
        assert_eq!(r(&list), "[1, 'a', None]");
        assert_eq!(r(&Value::tuple(vec![Value::Int(1)])), "(1,)");
        assert_eq!(r(&Value::tuple(vec![])), "()");
        let dict = Value::dict(vec![(Value::str("k"), Value::Bool(true))]).unwrap();
        assert_eq!(r(&dict), "{'k': True}");
    }

    #[test]
    fn self_referential_list() {
        let list = crate::value::ListObj::new(vec![Value::Int(1)]);
        list.items.borrow_mut().push(Value::List(list.clone()));
        assert_eq!(r(&Value::List(list.clone())), "[1, [...]]");
        list.items.borrow_mut().clear();
    }

    #[test]
    fn string_quotes() {
        assert_eq!(str_repr("it's"), "\"it's\"");
        assert_eq!(str_repr("a\nb"), "'a\\nb'");
        assert_eq!(str_repr("say \"hi\" it's"), "'say \"hi\" it\\'s'");
    }

    #[test]
    fn format_specs() {
        let f = |v: Value, spec: &str| format_value(&v, spec, &mut NoHook).unwrap();
        assert_eq!(f(Value::Float(3.14159), ".2f"), "3.14");
        assert_eq!(f(Value::Int(42), ">5"), "   42");
        assert_eq!(f(Value::Int(42), "05"), "00042");
        assert_eq!(f(Value::Int(-42), "05"), "-0042");
        assert_eq!(f(Value::Int(1234567), ","), "1,234,567");
        assert_eq!(f(Value::str("ab"), "^6"), "  ab  ");
        assert_eq!(f(Value::str("ab"), "*<4"), "ab**");
        assert_eq!(f(Value::Float(0.25), ".1%"), "25.0%");
        assert_eq!(f(Value::Float(1234.5), "e"), "1.234500e+03");
        assert_eq!(f(Value::Int(255), "x"), "ff");
        assert_eq!(f(Value::Int(255), "#x"), "0xff");
        assert_eq!(f(Value::Float(2.0), ".3g"), "2");
        assert_eq!(f(Value::Int(5), ".2f"), "5.00");
    }

    #[test]
    fn percent_formatting() {
        let args = Value::tuple(vec![Value::str("x"), Value::Int(3), Value::Float(2.5)]);
        assert_eq!(
            percent_format("%s=%d (%.2f) 100%%", &args, &mut NoHook).unwrap(),
            "x=3 (2.50) 100%"
        );
        assert!(percent_format("%d %d", &Value::Int(1), &mut NoHook).is_err());
    }

    #[test]
    fn format_method() {
        let out = str_format(
            "{} + {} = {total:>3}",
            &[Value::Int(1), Value::Int(2)],
            &[("total".into(), Value::Int(3))],
            &mut NoHook,
        )
        .unwrap();
        assert_eq!(out, "1 + 2 =   3");
        assert_eq!(
            str_format("{0}{0}{{}}{1!r}", &[Value::str("a"), Value::str("b")], &[], &mut NoHook).unwrap(),
            "aa{}'b'"
        );
    }
}
