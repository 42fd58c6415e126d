//! Conversion of caller-supplied JSON into runtime values.

use std::rc::Rc;

use crate::error::RtResult;
use crate::value::{DictKind, DictObj, Value};

/// Converts a JSON document into a fresh runtime value.
///
/// Objects become dicts with string keys in document order, arrays become
/// lists. Integers outside the 64-bit range become floats.
pub fn from_json(json: &serde_json::Value) -> RtResult<Value> {
    Ok(match json {
        serde_json::Value::Null => Value::None,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::str(s),
        serde_json::Value::Array(items) => {
            Value::list(items.iter().map(from_json).collect::<RtResult<Vec<_>>>()?)
        }
        serde_json::Value::Object(fields) => {
            let dict = DictObj::new(DictKind::Dict);
            for (key, value) in fields {
                dict.insert(Value::str(key), from_json(value)?)?;
            }
            Value::Dict(Rc::new(dict))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_and_containers() {
        let value = from_json(&json!({"n": 3, "xs": [1.5, "a", null, true]})).unwrap();
        let Value::Dict(dict) = value else {
            panic!("expected a dict");
        };
        assert!(matches!(dict.get(&Value::str("n")).unwrap(), Some(Value::Int(3))));
        let Some(Value::List(xs)) = dict.get(&Value::str("xs")).unwrap() else {
            panic!("expected a list");
        };
        let items = xs.snapshot();
        assert!(matches!(items[0], Value::Float(f) if f == 1.5));
        assert!(matches!(&items[1], Value::Str(s) if &**s == "a"));
        assert!(matches!(items[2], Value::None));
        assert!(matches!(items[3], Value::Bool(true)));
    }

    #[test]
    fn huge_integers_become_floats() {
        let value = from_json(&json!(u64::MAX)).unwrap();
        assert!(matches!(value, Value::Float(_)));
    }
}
