//! The importable built-in modules.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::builtins::Builtin;
use crate::error::{raise, ExcKind, RtResult};
use crate::value::{Module, Value};

const MODULES: &[&str] = &["math", "collections", "heapq", "sys"];

/// Builds the module `name`. The returned key is the static spelling of the
/// name, used to cache the module on the interpreter.
pub(crate) fn load(name: &str) -> RtResult<(&'static str, Rc<Module>)> {
    let Some(key) = MODULES.iter().copied().find(|m| *m == name) else {
        return raise(
            ExcKind::ModuleNotFoundError,
            format!("No module named '{name}'"),
        );
    };
    let entries: Vec<(&str, Value)> = match key {
        "math" => vec![
            ("sqrt", Value::Builtin(Builtin::MathSqrt)),
            ("floor", Value::Builtin(Builtin::MathFloor)),
            ("ceil", Value::Builtin(Builtin::MathCeil)),
            ("log", Value::Builtin(Builtin::MathLog)),
            ("pow", Value::Builtin(Builtin::MathPow)),
            ("gcd", Value::Builtin(Builtin::MathGcd)),
            ("pi", Value::Float(std::f64::consts::PI)),
            ("e", Value::Float(std::f64::consts::E)),
            ("tau", Value::Float(std::f64::consts::TAU)),
            ("inf", Value::Float(f64::INFINITY)),
            ("nan", Value::Float(f64::NAN)),
        ],
        "collections" => vec![
            ("deque", Value::Builtin(Builtin::Deque)),
            ("defaultdict", Value::Builtin(Builtin::DefaultDict)),
            ("Counter", Value::Builtin(Builtin::Counter)),
        ],
        "heapq" => vec![
            ("heappush", Value::Builtin(Builtin::HeapPush)),
            ("heappop", Value::Builtin(Builtin::HeapPop)),
            ("heapify", Value::Builtin(Builtin::Heapify)),
        ],
        _ => vec![
            ("setrecursionlimit", Value::Builtin(Builtin::SysSetRecursionLimit)),
            ("getrecursionlimit", Value::Builtin(Builtin::SysGetRecursionLimit)),
            ("maxsize", Value::Int(i64::MAX)),
        ],
    };
    let attrs: IndexMap<_, _> = entries
        .into_iter()
        .map(|(attr, value)| (Rc::from(attr), value))
        .collect();
    tracing::trace!(module = key, "loaded builtin module");
    Ok((
        key,
        Rc::new(Module {
            name: Rc::from(key),
            attrs,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_modules_load() {
        let (key, math) = load("math").unwrap();
        assert_eq!(key, "math");
        assert!(matches!(math.attrs.get("sqrt"), Some(Value::Builtin(Builtin::MathSqrt))));
        assert!(matches!(math.attrs.get("pi"), Some(Value::Float(_))));
    }

    #[test]
    fn unknown_module_is_not_found() {
        let err = load("numpy").unwrap_err();
        assert_eq!(err.kind(), ExcKind::ModuleNotFoundError);
        assert_eq!(err.message(), "No module named 'numpy'");
    }
}
