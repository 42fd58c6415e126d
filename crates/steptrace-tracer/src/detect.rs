//! Structure Detector.
//!
//! Classification is an ordered list of rules over the shape of a
//! [`Captured`] value, so the detector and the serialized `locals` always
//! describe the same point-in-time copy.

use serde_json::Value as Json;
use steptrace_runtime::value::End;

use crate::guard::{more_items, render, Captured, Entry, SeqShape};
use crate::schema::{Edge, GraphData, Structure};

/// Classifies one named binding, or `None` when it should not be drawn.
pub fn classify(name: &str, value: &Captured) -> Option<Structure> {
    match value {
        Captured::Map { entries, .. } if is_adjacency(entries) => {
            Some(Structure::Graph(graph(entries)))
        }
        Captured::Map { entries, truncated } => Some(dictionary(entries, *truncated)),
        Captured::Seq {
            shape: SeqShape::Tuple,
            items,
            ..
        } => Some(array(items)),
        Captured::Seq {
            shape: shape @ (SeqShape::List | SeqShape::Deque),
            removal,
            items,
        } => Some(match lens(name, *shape, *removal) {
            Lens::Stack => stack(items),
            Lens::Queue => queue(items),
            Lens::Array => array(items),
        }),
        _ => None,
    }
}

/// The combined `graph` of a step: every graph-shaped structure, in binding
/// order, merged into one.
pub fn combine<'a>(structures: impl IntoIterator<Item = &'a Structure>) -> Option<GraphData> {
    let mut combined: Option<GraphData> = None;
    for structure in structures {
        if let Structure::Graph(graph) = structure {
            match &mut combined {
                Some(existing) => existing.merge(graph),
                None => combined = Some(graph.clone()),
            }
        }
    }
    combined
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lens {
    Stack,
    Queue,
    Array,
}

fn lens(name: &str, shape: SeqShape, removal: Option<End>) -> Lens {
    match removal {
        Some(End::Front) => return Lens::Queue,
        Some(End::Back) => return Lens::Stack,
        None => {}
    }
    if shape == SeqShape::Deque {
        return Lens::Queue;
    }
    let name = name.to_ascii_lowercase();
    if name.contains("stack") {
        Lens::Stack
    } else if name.contains("queue") {
        Lens::Queue
    } else {
        Lens::Array
    }
}

/// A mapping whose every kept value is a collection. Entries cut off by the
/// guard are not looked at, and an empty mapping qualifies.
fn is_adjacency(entries: &[Entry]) -> bool {
    entries
        .iter()
        .all(|entry| matches!(entry.value, Captured::Seq { .. }))
}

fn dictionary(entries: &[Entry], truncated: usize) -> Structure {
    let mut keys: Vec<Json> = entries.iter().map(|e| render(&e.key)).collect();
    let mut values: Vec<Json> = entries.iter().map(|e| render(&e.value)).collect();
    if truncated > 0 {
        keys.push(Json::from("..."));
        values.push(render(&more_items(truncated)));
    }
    Structure::Dictionary { keys, values }
}

fn graph(entries: &[Entry]) -> GraphData {
    let mut data = GraphData::default();
    for entry in entries {
        let from = render(&entry.key);
        if let Captured::Seq { items, .. } = &entry.value {
            for item in items {
                data.edges.push(Edge {
                    from: from.clone(),
                    to: render(item),
                });
            }
        }
        data.nodes.push(from);
    }
    data
}

fn rendered(items: &[Captured]) -> Vec<Json> {
    items.iter().map(render).collect()
}

fn array(items: &[Captured]) -> Structure {
    Structure::Array {
        elements: rendered(items),
        length: items.len(),
    }
}

fn stack(items: &[Captured]) -> Structure {
    let elements = rendered(items);
    Structure::Stack {
        top: elements.last().cloned(),
        elements,
    }
}

fn queue(items: &[Captured]) -> Structure {
    let elements = rendered(items);
    Structure::Queue {
        front: elements.first().cloned(),
        rear: elements.last().cloned(),
        elements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn list(items: Vec<i64>) -> Captured {
        seq(SeqShape::List, None, items)
    }

    fn seq(shape: SeqShape, removal: Option<End>, items: Vec<i64>) -> Captured {
        Captured::Seq {
            shape,
            removal,
            items: items.into_iter().map(Captured::Int).collect(),
        }
    }

    fn map(entries: Vec<(&str, Captured)>) -> Captured {
        truncated_map(entries, 0)
    }

    fn truncated_map(entries: Vec<(&str, Captured)>, truncated: usize) -> Captured {
        Captured::Map {
            entries: entries
                .into_iter()
                .map(|(key, value)| Entry {
                    key_text: key.to_string(),
                    key: Captured::Str(key.to_string()),
                    value,
                })
                .collect(),
            truncated,
        }
    }

    #[test]
    fn adjacency_list_is_a_graph_with_edges_to_elements() {
        let value = map(vec![("a", list(vec![1, 2])), ("b", list(vec![3]))]);
        let structure = classify("g", &value).unwrap();
        assert_eq!(
            serde_json::to_value(&structure).unwrap(),
            json!({
                "type": "graph",
                "nodes": ["a", "b"],
                "edges": [
                    {"from": "a", "to": 1},
                    {"from": "a", "to": 2},
                    {"from": "b", "to": 3}
                ]
            })
        );
    }

    #[test]
    fn mapping_with_a_scalar_value_is_a_dictionary() {
        let value = map(vec![("a", list(vec![1])), ("b", Captured::Int(2))]);
        assert!(matches!(
            classify("d", &value),
            Some(Structure::Dictionary { .. })
        ));
    }

    #[test]
    fn empty_mapping_is_an_empty_graph() {
        assert_eq!(
            classify("d", &map(vec![])),
            Some(Structure::Graph(GraphData::default()))
        );
    }

    #[test]
    fn cut_off_adjacency_list_is_still_a_graph() {
        let value = truncated_map(vec![("a", list(vec![1])), ("b", list(vec![2]))], 1);
        let Some(Structure::Graph(graph)) = classify("g", &value) else {
            panic!("expected a graph");
        };
        assert_eq!(graph.nodes, vec![json!("a"), json!("b")]);
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn cut_off_dictionary_ends_with_a_marker() {
        let value = truncated_map(vec![("a", Captured::Int(1))], 4);
        assert_eq!(
            classify("d", &value),
            Some(Structure::Dictionary {
                keys: vec![json!("a"), json!("...")],
                values: vec![json!(1), json!("<4 more items>")]
            })
        );
    }

    #[test]
    fn plain_list_is_an_array() {
        assert_eq!(
            classify("nums", &list(vec![5, 3, 8])),
            Some(Structure::Array {
                elements: vec![json!(5), json!(3), json!(8)],
                length: 3
            })
        );
    }

    #[test]
    fn removal_end_decides_stack_or_queue() {
        let popped_back = seq(SeqShape::List, Some(End::Back), vec![1, 2]);
        assert_eq!(
            classify("xs", &popped_back),
            Some(Structure::Stack {
                elements: vec![json!(1), json!(2)],
                top: Some(json!(2))
            })
        );
        let popped_front = seq(SeqShape::List, Some(End::Front), vec![1, 2]);
        assert_eq!(
            classify("xs", &popped_front),
            Some(Structure::Queue {
                elements: vec![json!(1), json!(2)],
                front: Some(json!(1)),
                rear: Some(json!(2))
            })
        );
    }

    #[test]
    fn removal_outranks_the_name() {
        let value = seq(SeqShape::List, Some(End::Front), vec![1]);
        assert!(matches!(classify("my_stack", &value), Some(Structure::Queue { .. })));
    }

    #[test]
    fn deque_without_removal_is_a_queue() {
        let value = seq(SeqShape::Deque, None, vec![]);
        assert_eq!(
            classify("d", &value),
            Some(Structure::Queue {
                elements: vec![],
                front: None,
                rear: None
            })
        );
    }

    #[test]
    fn name_hints_apply_without_removal() {
        assert!(matches!(classify("callStack", &list(vec![1])), Some(Structure::Stack { .. })));
        assert!(matches!(classify("work_queue", &list(vec![1])), Some(Structure::Queue { .. })));
    }

    #[test]
    fn tuples_are_arrays_and_scalars_and_sets_are_skipped() {
        let tuple = seq(SeqShape::Tuple, None, vec![1, 2]);
        assert!(matches!(classify("stack", &tuple), Some(Structure::Array { length: 2, .. })));
        assert_eq!(classify("s", &seq(SeqShape::Set, None, vec![1])), None);
        assert_eq!(classify("n", &Captured::Int(3)), None);
        assert_eq!(classify("s", &Captured::Str("abc".into())), None);
    }

    #[test]
    fn combined_graph_merges_in_binding_order() {
        let first = classify("g", &map(vec![("a", list(vec![1]))])).unwrap();
        let second = classify("h", &map(vec![("a", list(vec![2])), ("b", list(vec![]))])).unwrap();
        let array = classify("xs", &list(vec![1])).unwrap();
        let combined = combine([&first, &array, &second]).unwrap();
        assert_eq!(combined.nodes, vec![json!("a"), json!("b")]);
        assert_eq!(combined.edges.len(), 2);
        assert_eq!(combine([&array]), None);
    }

    proptest! {
        #[test]
        fn all_list_values_always_make_a_graph(
            lists in proptest::collection::vec(proptest::collection::vec(any::<i64>(), 0..4), 1..6)
        ) {
            let value = map(
                ["a", "b", "c", "d", "e", "f"]
                    .iter()
                    .zip(lists)
                    .map(|(key, items)| (*key, list(items)))
                    .collect(),
            );
            prop_assert!(matches!(classify("g", &value), Some(Structure::Graph(_))));
        }

        #[test]
        fn one_scalar_value_never_makes_a_graph(n in any::<i64>(), at in 0usize..3) {
            let mut entries = vec![("a", list(vec![1])), ("b", list(vec![2]))];
            entries.insert(at, ("x", Captured::Int(n)));
            prop_assert!(!matches!(classify("g", &map(entries)), Some(Structure::Graph(_))));
        }
    }
}
