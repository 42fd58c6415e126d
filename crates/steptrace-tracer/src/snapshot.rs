//! Snapshot Builder.

use indexmap::IndexMap;
use serde_json::Map;
use steptrace_runtime::value::Name;
use steptrace_runtime::{LineContext, Value};

use crate::detect;
use crate::guard::{render, Capturer, Limits};
use crate::schema::{FrameInfo, Step, Structure};

/// Builds one [`Step`] per line event of a single program.
pub struct SnapshotBuilder<'s> {
    lines: Vec<&'s str>,
    limits: Limits,
}

impl<'s> SnapshotBuilder<'s> {
    pub fn new(source: &'s str, limits: Limits) -> Self {
        SnapshotBuilder {
            lines: source.split('\n').collect(),
            limits,
        }
    }

    /// Trimmed text of a 1-based line, `""` when out of range.
    pub fn code_line(&self, line: u32) -> &'s str {
        line.checked_sub(1)
            .and_then(|index| self.lines.get(index as usize))
            .map(|text| text.trim())
            .unwrap_or("")
    }

    pub fn build(&self, ctx: &LineContext<'_>) -> Step {
        let line = ctx.line();
        let bindings = ctx
            .innermost()
            .and_then(|frame| frame.bindings())
            .unwrap_or_default();
        let (locals, data_structures) = self.capture_bindings(&bindings);
        let graph = detect::combine(data_structures.values());
        let call_stack = ctx
            .frames()
            .rev()
            .map(|frame| FrameInfo {
                function: frame.function().to_string(),
                line: frame.line(),
                filename: ctx.source_id().to_string(),
            })
            .collect();
        Step {
            line,
            code_line: self.code_line(line).to_string(),
            locals,
            data_structures,
            call_stack,
            graph,
        }
    }

    /// Serializes bindings into `locals` and classifies each of them.
    pub fn capture_bindings(
        &self,
        bindings: &[(Name, Value)],
    ) -> (Map<String, serde_json::Value>, IndexMap<String, Structure>) {
        let mut locals = Map::new();
        let mut structures = IndexMap::new();
        for (name, value) in bindings {
            let captured = Capturer::new(self.limits).capture(value);
            if let Some(structure) = detect::classify(name, &captured) {
                structures.insert(name.to_string(), structure);
            }
            locals.insert(name.to_string(), render(&captured));
        }
        (locals, structures)
    }

    /// Serializes bindings into `locals` without classifying them.
    pub fn serialize_bindings(&self, bindings: &[(Name, Value)]) -> Map<String, serde_json::Value> {
        bindings
            .iter()
            .map(|(name, value)| {
                let captured = Capturer::new(self.limits).capture(value);
                (name.to_string(), render(&captured))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_line_is_trimmed_and_total() {
        let builder = SnapshotBuilder::new("x = 1\n    y = 2\n", Limits::default());
        assert_eq!(builder.code_line(1), "x = 1");
        assert_eq!(builder.code_line(2), "y = 2");
        assert_eq!(builder.code_line(3), "");
        assert_eq!(builder.code_line(0), "");
        assert_eq!(builder.code_line(99), "");
    }

    #[test]
    fn bindings_keep_their_order() {
        let builder = SnapshotBuilder::new("", Limits::default());
        let bindings: Vec<(Name, Value)> = vec![
            ("b".into(), Value::Int(1)),
            ("a".into(), Value::list(vec![Value::Int(2)])),
        ];
        let (locals, structures) = builder.capture_bindings(&bindings);
        assert_eq!(locals.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(structures.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn serialized_bindings_match_captured_locals() {
        let builder = SnapshotBuilder::new("", Limits::default());
        let bindings: Vec<(Name, Value)> = vec![
            ("q".into(), Value::list(vec![Value::Int(1), Value::Int(2)])),
            ("n".into(), Value::Int(3)),
        ];
        let (locals, _) = builder.capture_bindings(&bindings);
        assert_eq!(builder.serialize_bindings(&bindings), locals);
    }
}
