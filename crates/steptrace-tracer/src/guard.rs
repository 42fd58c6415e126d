//! Serialization Guard.
//!
//! Turning live runtime values into JSON happens in two phases:
//!
//! 1. [`Capturer::capture`] walks the value graph and produces an owned
//!    [`Captured`] tree. This is the point-in-time deep copy a step keeps;
//!    later mutation by the program cannot reach it. The walk is bounded by
//!    [`Limits`] and by a set of the containers on the current path, so
//!    cyclic and huge structures end in placeholders.
//! 2. [`render`] converts a captured tree into `serde_json::Value`. This phase
//!    cannot fail and never sees a runtime reference.
//!
//! The Structure Detector classifies the captured tree, so both consumers see
//! the same snapshot.

use std::collections::HashSet;

use serde_json::{Map, Value as Json};
use steptrace_runtime::format::{self, NoHook};
use steptrace_runtime::value::{End, SeqKind};
use steptrace_runtime::Value;

/// Bounds on a single capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Containers nested deeper than this become a placeholder.
    pub max_depth: usize,
    /// Elements kept per container.
    pub max_items: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_depth: 32,
            max_items: 1000,
        }
    }
}

/// The container shapes the Structure Detector distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqShape {
    List,
    Deque,
    Tuple,
    Set,
}

/// An owned copy of a runtime value, already free of runtime references.
#[derive(Debug, Clone, PartialEq)]
pub enum Captured {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq {
        shape: SeqShape,
        /// The end an element was last removed from (lists and deques).
        removal: Option<End>,
        items: Vec<Captured>,
    },
    Map {
        entries: Vec<Entry>,
        /// Entries left out past `max_items`.
        truncated: usize,
    },
    /// An instance of a user class, as its attributes.
    Object(Vec<(String, Captured)>),
    Exception { args: Vec<Captured> },
    /// Anything rendered as descriptive text: types, callables, modules,
    /// ranges, cut-off points.
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The key's `str()` text, used as the JSON object key.
    pub key_text: String,
    pub key: Captured,
    pub value: Captured,
}

/// Phase 1: walks runtime values into [`Captured`] trees.
pub struct Capturer {
    limits: Limits,
    /// Identities of the containers being captured, outermost first.
    path: HashSet<usize>,
}

impl Capturer {
    pub fn new(limits: Limits) -> Self {
        Capturer {
            limits,
            path: HashSet::new(),
        }
    }

    pub fn capture(&mut self, value: &Value) -> Captured {
        self.capture_at(value, 0)
    }

    fn capture_at(&mut self, value: &Value, depth: usize) -> Captured {
        match value {
            Value::None => Captured::None,
            Value::Bool(b) => Captured::Bool(*b),
            Value::Int(i) => Captured::Int(*i),
            Value::Float(f) => Captured::Float(*f),
            Value::Str(s) => Captured::Str(s.to_string()),
            Value::Range(_) => Captured::Placeholder(
                format::repr(value, &mut NoHook).unwrap_or_else(|_| "range".to_string()),
            ),
            Value::Function(func) if func.is_lambda() => callable("anonymous"),
            Value::Function(func) => callable(&func.name),
            Value::BoundMethod(method) => callable(method.name()),
            Value::Builtin(builtin) if builtin.is_type() => type_name(builtin.name()),
            Value::Builtin(builtin) => callable(builtin.name()),
            Value::Class(class) => type_name(&class.name),
            Value::ExcClass(kind) => type_name(kind.name()),
            Value::Module(module) => Captured::Placeholder(format!("<module '{}'>", module.name)),
            Value::Super(_) | Value::Iterator(_) => opaque(value),
            Value::List(_)
            | Value::Tuple(_)
            | Value::Dict(_)
            | Value::Set(_)
            | Value::Instance(_)
            | Value::Exception(_) => self.capture_container(value, depth),
        }
    }

    fn capture_container(&mut self, value: &Value, depth: usize) -> Captured {
        if depth >= self.limits.max_depth {
            return Captured::Placeholder("<max depth reached>".to_string());
        }
        let id = value.identity().unwrap_or_default();
        if !self.path.insert(id) {
            return Captured::Placeholder(recursive(value).to_string());
        }
        let captured = self.capture_contents(value, depth + 1).unwrap_or_else(|| {
            tracing::warn!(type_name = value.type_name(), "value is being mutated, captured as placeholder");
            opaque(value)
        });
        self.path.remove(&id);
        captured
    }

    /// `None` when the container is mutably borrowed at the moment.
    fn capture_contents(&mut self, value: &Value, depth: usize) -> Option<Captured> {
        let max = self.limits.max_items;
        let captured = match value {
            Value::List(list) => {
                let items = list.items.try_borrow().ok()?;
                let (kept, more) = head(&items, max);
                drop(items);
                Captured::Seq {
                    shape: match list.kind {
                        SeqKind::List => SeqShape::List,
                        SeqKind::Deque => SeqShape::Deque,
                    },
                    removal: list.last_removal(),
                    items: self.capture_items(&kept, more, depth),
                }
            }
            Value::Tuple(items) => {
                let (kept, more) = head(items, max);
                Captured::Seq {
                    shape: SeqShape::Tuple,
                    removal: None,
                    items: self.capture_items(&kept, more, depth),
                }
            }
            Value::Set(set) => {
                let values: Vec<Value> = set.items.try_borrow().ok()?.values().cloned().collect();
                let (kept, more) = head(&values, max);
                Captured::Seq {
                    shape: SeqShape::Set,
                    removal: None,
                    items: self.capture_items(&kept, more, depth),
                }
            }
            Value::Dict(dict) => {
                let pairs: Vec<(Value, Value)> = dict.entries.try_borrow().ok()?.values().cloned().collect();
                let truncated = pairs.len().saturating_sub(max);
                let mut entries = Vec::with_capacity(pairs.len().min(max));
                for (key, value) in pairs.into_iter().take(max) {
                    entries.push(Entry {
                        key_text: format::to_str(&key, &mut NoHook)
                            .unwrap_or_else(|_| format!("<object '{}'>", key.type_name())),
                        key: self.capture_at(&key, depth),
                        value: self.capture_at(&value, depth),
                    });
                }
                Captured::Map { entries, truncated }
            }
            Value::Instance(instance) => {
                let attrs: Vec<(String, Value)> = instance
                    .attrs
                    .try_borrow()
                    .ok()?
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect();
                Captured::Object(
                    attrs
                        .into_iter()
                        .take(max)
                        .map(|(name, v)| (name, self.capture_at(&v, depth)))
                        .collect(),
                )
            }
            Value::Exception(exc) => {
                let args = exc.args.try_borrow().ok()?.clone();
                let (kept, more) = head(&args, max);
                Captured::Exception {
                    args: self.capture_items(&kept, more, depth),
                }
            }
            other => opaque(other),
        };
        Some(captured)
    }

    fn capture_items(&mut self, items: &[Value], more: usize, depth: usize) -> Vec<Captured> {
        let mut out: Vec<Captured> = items.iter().map(|item| self.capture_at(item, depth)).collect();
        if more > 0 {
            out.push(more_items(more));
        }
        out
    }
}

/// The first `max` items and how many were left out.
fn head(items: &[Value], max: usize) -> (Vec<Value>, usize) {
    let kept = items.iter().take(max).cloned().collect();
    (kept, items.len().saturating_sub(max))
}

pub(crate) fn more_items(n: usize) -> Captured {
    Captured::Placeholder(format!("<{n} more items>"))
}

fn callable(name: &str) -> Captured {
    Captured::Placeholder(format!("<function '{name}'>"))
}

fn type_name(name: &str) -> Captured {
    Captured::Placeholder(format!("<type '{name}'>"))
}

fn opaque(value: &Value) -> Captured {
    Captured::Placeholder(format!("<object '{}'>", value.type_name()))
}

fn recursive(value: &Value) -> &'static str {
    match value {
        Value::List(_) | Value::Tuple(_) | Value::Set(_) => "<recursive list>",
        Value::Dict(_) => "<recursive dict>",
        _ => "<recursive object>",
    }
}

/// Phase 2: converts a captured tree into JSON.
pub fn render(captured: &Captured) -> Json {
    match captured {
        Captured::None => Json::Null,
        Captured::Bool(b) => Json::Bool(*b),
        Captured::Int(i) => Json::from(*i),
        Captured::Float(f) if f.is_nan() => Json::from("nan"),
        Captured::Float(f) if f.is_infinite() => {
            Json::from(if *f > 0.0 { "inf" } else { "-inf" })
        }
        Captured::Float(f) => Json::from(*f),
        Captured::Str(s) | Captured::Placeholder(s) => Json::from(s.as_str()),
        Captured::Seq { items, .. } => Json::Array(items.iter().map(render).collect()),
        Captured::Map { entries, truncated } => {
            let mut map = Map::new();
            for entry in entries {
                map.insert(entry.key_text.clone(), render(&entry.value));
            }
            if *truncated > 0 {
                map.insert("...".to_string(), render(&more_items(*truncated)));
            }
            Json::Object(map)
        }
        Captured::Object(attrs) => {
            let mut map = Map::new();
            for (name, value) in attrs {
                map.insert(name.clone(), render(value));
            }
            Json::Object(map)
        }
        Captured::Exception { args } => {
            let mut map = Map::new();
            map.insert("args".to_string(), Json::Array(args.iter().map(render).collect()));
            Json::Object(map)
        }
    }
}

/// Captures and renders in one go.
pub fn serialize(value: &Value, limits: Limits) -> Json {
    render(&Capturer::new(limits).capture(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::rc::Rc;
    use steptrace_runtime::builtins::Builtin;
    use steptrace_runtime::value::ListObj;
    use steptrace_runtime::ExcKind;

    #[test]
    fn primitives_pass_through() {
        let limits = Limits::default();
        assert_eq!(serialize(&Value::None, limits), json!(null));
        assert_eq!(serialize(&Value::Bool(true), limits), json!(true));
        assert_eq!(serialize(&Value::Int(-7), limits), json!(-7));
        assert_eq!(serialize(&Value::Float(2.5), limits), json!(2.5));
        assert_eq!(serialize(&Value::str("hi"), limits), json!("hi"));
    }

    #[test]
    fn non_finite_floats_become_strings() {
        let limits = Limits::default();
        assert_eq!(serialize(&Value::Float(f64::NAN), limits), json!("nan"));
        assert_eq!(serialize(&Value::Float(f64::INFINITY), limits), json!("inf"));
        assert_eq!(serialize(&Value::Float(f64::NEG_INFINITY), limits), json!("-inf"));
    }

    #[test]
    fn mapping_keys_become_text_in_insertion_order() {
        let value = Value::dict(vec![
            (Value::Int(2), Value::str("b")),
            (Value::Int(1), Value::str("a")),
            (Value::tuple(vec![Value::Int(0), Value::Int(1)]), Value::None),
        ])
        .unwrap();
        let json = serialize(&value, Limits::default());
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["2", "1", "(0, 1)"]);
    }

    #[test]
    fn types_and_callables_are_placeholders() {
        let limits = Limits::default();
        assert_eq!(serialize(&Value::Builtin(Builtin::Int), limits), json!("<type 'int'>"));
        assert_eq!(serialize(&Value::Builtin(Builtin::Len), limits), json!("<function 'len'>"));
        assert_eq!(
            serialize(&Value::ExcClass(ExcKind::ValueError), limits),
            json!("<type 'ValueError'>")
        );
    }

    #[test]
    fn self_referential_list_terminates() {
        let list = ListObj::new(vec![Value::Int(1)]);
        list.items.borrow_mut().push(Value::List(list.clone()));
        let json = serialize(&Value::List(list.clone()), Limits::default());
        assert_eq!(json, json!([1, "<recursive list>"]));
        list.items.borrow_mut().clear();
    }

    #[test]
    fn shared_but_acyclic_values_are_not_recursive() {
        let inner = Value::list(vec![Value::Int(1)]);
        let outer = Value::list(vec![inner.clone(), inner]);
        assert_eq!(serialize(&outer, Limits::default()), json!([[1], [1]]));
    }

    #[test]
    fn long_containers_are_cut() {
        let value = Value::list((0..5).map(Value::Int).collect());
        let limits = Limits {
            max_depth: 32,
            max_items: 3,
        };
        assert_eq!(serialize(&value, limits), json!([0, 1, 2, "<2 more items>"]));
    }

    #[test]
    fn long_mappings_count_what_they_leave_out() {
        let value = Value::dict(
            ["a", "b", "c"]
                .into_iter()
                .map(|key| (Value::str(key), Value::list(vec![])))
                .collect(),
        )
        .unwrap();
        let limits = Limits {
            max_depth: 32,
            max_items: 2,
        };
        let captured = Capturer::new(limits).capture(&value);
        assert!(matches!(&captured, Captured::Map { entries, truncated: 1 } if entries.len() == 2));
        assert_eq!(render(&captured), json!({"a": [], "b": [], "...": "<1 more items>"}));
    }

    #[test]
    fn deep_nesting_is_cut() {
        let mut value = Value::Int(0);
        for _ in 0..5 {
            value = Value::list(vec![value]);
        }
        let limits = Limits {
            max_depth: 2,
            max_items: 10,
        };
        assert_eq!(serialize(&value, limits), json!([["<max depth reached>"]]));
    }

    #[test]
    fn borrowed_container_degrades_to_placeholder() {
        let list = ListObj::new(vec![Value::Int(1)]);
        let _guard = list.items.borrow_mut();
        assert_eq!(
            serialize(&Value::List(list.clone()), Limits::default()),
            json!("<object 'list'>")
        );
    }

    /// Nested lists, some of which are made to contain an ancestor.
    fn arb_cyclic() -> impl Strategy<Value = Vec<(usize, usize)>> {
        proptest::collection::vec((0usize..8, 0usize..8), 0..16)
    }

    proptest! {
        #[test]
        fn capture_always_terminates(links in arb_cyclic()) {
            let lists: Vec<Rc<ListObj>> = (0..8).map(|i| ListObj::new(vec![Value::Int(i)])).collect();
            for (from, to) in &links {
                lists[*from].items.borrow_mut().push(Value::List(lists[*to].clone()));
            }
            let json = serialize(&Value::List(lists[0].clone()), Limits::default());
            prop_assert!(json.is_array());
            for list in &lists {
                list.items.borrow_mut().clear();
            }
        }
    }
}
