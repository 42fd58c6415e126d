//! The Trace wire schema.
//!
//! Field names are fixed: the visualizer replays `trace` entries as animation
//! frames without knowing which language produced them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// The result of one tracing call.
///
/// Either the program started (`{"trace": [...]}`, possibly ending in a
/// [`Fault`]) or it never did (`{"error": "..."}`). Never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Trace {
    Steps { trace: Vec<TraceEntry> },
    Failed { error: String },
}

impl Trace {
    pub fn failed(error: impl Into<String>) -> Self {
        Trace::Failed {
            error: error.into(),
        }
    }

    /// The recorded entries; empty for a failure to start.
    pub fn entries(&self) -> &[TraceEntry] {
        match self {
            Trace::Steps { trace } => trace,
            Trace::Failed { .. } => &[],
        }
    }

    /// The ordinary steps, without a trailing fault.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.entries().iter().filter_map(|entry| match entry {
            TraceEntry::Step(step) => Some(step),
            TraceEntry::Fault(_) => None,
        })
    }

    /// The trailing fault, if the program raised.
    pub fn fault(&self) -> Option<&Fault> {
        match self.entries().last() {
            Some(TraceEntry::Fault(fault)) => Some(fault),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Trace::Failed { error } => Some(error),
            Trace::Steps { .. } => None,
        }
    }
}

/// One element of `trace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraceEntry {
    Step(Step),
    Fault(Fault),
}

/// Program state immediately before one source line executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based.
    pub line: u32,
    /// Trimmed source text of `line`, `""` when out of range.
    pub code_line: String,
    /// Innermost frame's bindings, guard-serialized, in binding order.
    pub locals: Map<String, Json>,
    pub data_structures: IndexMap<String, Structure>,
    /// Innermost frame first; the last element is `<module>`.
    pub call_stack: Vec<FrameInfo>,
    /// Union of every graph-shaped local, or `null`.
    pub graph: Option<GraphData>,
}

/// Trailing entry for an uncaught runtime fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    pub error: String,
    pub error_type: String,
    pub traceback: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub function: String,
    pub line: u32,
    pub filename: String,
}

/// How one variable should be drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Structure {
    Array {
        elements: Vec<Json>,
        length: usize,
    },
    Dictionary {
        keys: Vec<Json>,
        values: Vec<Json>,
    },
    Stack {
        elements: Vec<Json>,
        top: Option<Json>,
    },
    Queue {
        elements: Vec<Json>,
        front: Option<Json>,
        rear: Option<Json>,
    },
    Graph(GraphData),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<Json>,
    pub edges: Vec<Edge>,
}

impl GraphData {
    /// Adds another graph's nodes (skipping ones already present) and edges.
    pub fn merge(&mut self, other: &GraphData) {
        for node in &other.nodes {
            if !self.nodes.contains(node) {
                self.nodes.push(node.clone());
            }
        }
        self.edges.extend(other.edges.iter().cloned());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: Json,
    pub to: Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_serializes_as_a_bare_error() {
        let trace = Trace::failed("SyntaxError: invalid syntax (line 1, column 3)");
        assert_eq!(
            serde_json::to_value(&trace).unwrap(),
            json!({"error": "SyntaxError: invalid syntax (line 1, column 3)"})
        );
    }

    #[test]
    fn structures_are_tagged_by_type() {
        let stack = Structure::Stack {
            elements: vec![json!(1), json!(2)],
            top: Some(json!(2)),
        };
        assert_eq!(
            serde_json::to_value(&stack).unwrap(),
            json!({"type": "stack", "elements": [1, 2], "top": 2})
        );

        let empty_queue = Structure::Queue {
            elements: vec![],
            front: None,
            rear: None,
        };
        assert_eq!(
            serde_json::to_value(&empty_queue).unwrap(),
            json!({"type": "queue", "elements": [], "front": null, "rear": null})
        );

        let graph = Structure::Graph(GraphData {
            nodes: vec![json!("a")],
            edges: vec![Edge {
                from: json!("a"),
                to: json!(1),
            }],
        });
        assert_eq!(
            serde_json::to_value(&graph).unwrap(),
            json!({"type": "graph", "nodes": ["a"], "edges": [{"from": "a", "to": 1}]})
        );
    }

    #[test]
    fn entries_round_trip_through_json() {
        let text = r#"{"trace":[
            {"line":1,"code_line":"x = 1","locals":{},"data_structures":{},
             "call_stack":[{"function":"<module>","line":1,"filename":"<string>"}],"graph":null},
            {"error":"division by zero","error_type":"ZeroDivisionError","traceback":"..."}
        ]}"#;
        let trace: Trace = serde_json::from_str(text).unwrap();
        assert_eq!(trace.steps().count(), 1);
        assert_eq!(trace.fault().map(|f| f.error_type.as_str()), Some("ZeroDivisionError"));
        assert!(trace.error().is_none());
    }

    #[test]
    fn graph_merge_deduplicates_nodes() {
        let mut graph = GraphData {
            nodes: vec![json!("a"), json!("b")],
            edges: vec![Edge { from: json!("a"), to: json!("b") }],
        };
        graph.merge(&GraphData {
            nodes: vec![json!("b"), json!("c")],
            edges: vec![Edge { from: json!("b"), to: json!("c") }],
        });
        assert_eq!(graph.nodes, vec![json!("a"), json!("b"), json!("c")]);
        assert_eq!(graph.edges.len(), 2);
    }
}
