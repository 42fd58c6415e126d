//! Whole-program traces, checked through the public API and the JSON wire form.

use serde_json::json;
use steptrace_tracer::{
    trace, trace_for_language, FrameInfo, Step, Structure, Trace, TraceEntry, Tracer,
    TracerConfig,
};

fn steps(trace: &Trace) -> Vec<&Step> {
    trace.steps().collect()
}

fn lines(trace: &Trace) -> Vec<u32> {
    trace.steps().map(|step| step.line).collect()
}

fn frame(function: &str, line: u32) -> FrameInfo {
    FrameInfo {
        function: function.to_string(),
        line,
        filename: "<string>".to_string(),
    }
}

#[test]
fn straight_line_program() {
    let source = "x = 1\ny = 2\nz = x + y\n";
    let outcome = Tracer::default().trace(source, &[]);
    let trace = &outcome.trace;

    assert_eq!(lines(trace), vec![1, 2, 3]);
    assert!(trace.fault().is_none());
    let last = steps(trace)[2];
    assert_eq!(last.code_line, "z = x + y");
    assert_eq!(serde_json::Value::Object(last.locals.clone()), json!({"x": 1, "y": 2}));

    let final_locals = outcome.final_locals.unwrap();
    assert_eq!(
        serde_json::Value::Object(final_locals),
        json!({"x": 1, "y": 2, "z": 3})
    );
}

#[test]
fn first_step_wire_form() {
    let trace = trace("x = 1\ny = 2\nz = x + y\n", &[]);
    let first = serde_json::to_string(&trace.entries()[0]).unwrap();
    insta::assert_snapshot!(first, @r#"{"line":1,"code_line":"x = 1","locals":{},"data_structures":{},"call_stack":[{"function":"<module>","line":1,"filename":"<string>"}],"graph":null}"#);
}

#[test]
fn fault_ends_the_trace_and_keeps_prior_steps() {
    let source = "\
def divide(a, b):
    return a / b
x = divide(1, 0)
print(x)
";
    let trace = trace(source, &[]);
    assert_eq!(lines(&trace), vec![1, 3, 2]);

    let inside = steps(&trace)[2];
    assert_eq!(serde_json::Value::Object(inside.locals.clone()), json!({"a": 1, "b": 0}));
    assert_eq!(inside.call_stack, vec![frame("divide", 2), frame("<module>", 3)]);

    let fault = trace.fault().unwrap();
    assert_eq!(fault.error_type, "ZeroDivisionError");
    assert_eq!(fault.error, "division by zero");
    assert_eq!(
        fault.traceback,
        "Traceback (most recent call last):\n  \
         File \"<string>\", line 3, in <module>\n    x = divide(1, 0)\n  \
         File \"<string>\", line 2, in divide\n    return a / b\n\
         ZeroDivisionError: division by zero\n"
    );
    assert!(trace.error().is_none());
}

#[test]
fn fault_wire_form_is_a_trailing_entry() {
    let trace = trace("x = [1]\ny = x[3]\n", &[]);
    let json = serde_json::to_value(&trace).unwrap();
    let entries = json["trace"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    let last = &entries[2];
    assert_eq!(last["error_type"], json!("IndexError"));
    assert_eq!(last["error"], json!("list index out of range"));
    assert!(last.get("line").is_none());
    assert!(json.get("error").is_none());
}

#[test]
fn steps_before_a_fault_match_the_truncated_program() {
    let full = trace("a = [1]\nb = a[5]\nc = 2\nprint(c)\n", &[]);
    let truncated = trace("a = [1]\nb = a[5]\n", &[]);
    assert_eq!(full, truncated);
    let before_fault = &full.entries()[..full.entries().len() - 1];
    assert!(before_fault.iter().all(|entry| matches!(entry, TraceEntry::Step(_))));
    assert_eq!(before_fault.len(), 2);
}

#[test]
fn adjacency_list_is_detected_as_a_graph() {
    let trace = trace("g = {\"a\": [1, 2], \"b\": [3]}\ndone = True\n", &[]);
    let step = steps(&trace)[1];
    let expected = json!({
        "type": "graph",
        "nodes": ["a", "b"],
        "edges": [
            {"from": "a", "to": 1},
            {"from": "a", "to": 2},
            {"from": "b", "to": 3}
        ]
    });
    assert_eq!(serde_json::to_value(&step.data_structures["g"]).unwrap(), expected);
    assert_eq!(
        serde_json::to_value(&step.graph).unwrap(),
        json!({"nodes": expected["nodes"], "edges": expected["edges"]})
    );
}

#[test]
fn cut_off_adjacency_list_stays_a_graph() {
    let tracer = Tracer::new(TracerConfig {
        max_items: 2,
        ..TracerConfig::default()
    });
    let outcome = tracer.trace("g = {'a': [1], 'b': [2], 'c': [3]}\ndone = True\n", &[]);
    let step = steps(&outcome.trace)[1];
    assert_eq!(
        serde_json::to_value(&step.data_structures["g"]).unwrap(),
        json!({
            "type": "graph",
            "nodes": ["a", "b"],
            "edges": [{"from": "a", "to": 1}, {"from": "b", "to": 2}]
        })
    );
    assert_eq!(
        serde_json::Value::Object(step.locals.clone()),
        json!({"g": {"a": [1], "b": [2], "...": "<1 more items>"}})
    );
    assert!(step.graph.is_some());
}

#[test]
fn empty_mapping_is_an_empty_graph() {
    let trace = trace("d = {}\ndone = True\n", &[]);
    let step = steps(&trace)[1];
    assert_eq!(
        serde_json::to_value(&step.data_structures["d"]).unwrap(),
        json!({"type": "graph", "nodes": [], "edges": []})
    );
    assert_eq!(
        serde_json::to_value(&step.graph).unwrap(),
        json!({"nodes": [], "edges": []})
    );
}

#[test]
fn round_to_the_most_negative_ndigits_keeps_the_trace() {
    let source = "a = 1\nn = -9223372036854775807 - 1\nr = round(5, n)\nf = round(1.5, n)\ndone = True\n";
    let trace = trace(source, &[]);
    assert!(trace.error().is_none(), "{trace:?}");
    assert!(trace.fault().is_none());
    let last = steps(&trace)[4];
    assert_eq!(last.locals["r"], json!(0));
    assert_eq!(last.locals["f"], json!(0.0));
}

#[test]
fn plain_list_is_shown_as_an_array_only() {
    let trace = trace("nums = [5, 3, 8]\ndone = True\n", &[]);
    let step = steps(&trace)[1];
    assert_eq!(step.data_structures.len(), 1);
    assert_eq!(
        step.data_structures["nums"],
        Structure::Array {
            elements: vec![json!(5), json!(3), json!(8)],
            length: 3
        }
    );
    assert!(step.graph.is_none());
}

#[test]
fn usage_decides_between_stack_and_queue() {
    let source = "\
from collections import deque
s = [1, 2, 3]
s.pop()
q = deque([1, 2, 3])
q.popleft()
items = [1, 2]
items.pop(0)
done = True
";
    let trace = trace(source, &[]);
    let last = steps(&trace).pop().unwrap();
    assert_eq!(
        last.data_structures["s"],
        Structure::Stack {
            elements: vec![json!(1), json!(2)],
            top: Some(json!(2))
        }
    );
    assert_eq!(
        last.data_structures["q"],
        Structure::Queue {
            elements: vec![json!(2), json!(3)],
            front: Some(json!(2)),
            rear: Some(json!(3))
        }
    );
    assert!(matches!(last.data_structures["items"], Structure::Queue { .. }));
    assert_eq!(last.locals["deque"], json!("<type 'deque'>"));
}

#[test]
fn recorded_steps_are_not_changed_by_later_mutation() {
    let trace = trace("xs = []\nxs.append(1)\nxs.append(2)\ndone = True\n", &[]);
    let seen: Vec<serde_json::Value> = trace
        .steps()
        .map(|step| step.locals.get("xs").cloned().unwrap_or(json!(null)))
        .collect();
    assert_eq!(seen, vec![json!(null), json!([]), json!([1]), json!([1, 2])]);
}

#[test]
fn self_referential_list_terminates() {
    let trace = trace("a = [1]\na.append(a)\ndone = True\n", &[]);
    let last = steps(&trace).pop().unwrap();
    assert_eq!(last.locals["a"], json!([1, "<recursive list>"]));
}

#[test]
fn recursion_shows_every_frame_innermost_first() {
    let source = "\
def fact(n):
    if n <= 1:
        return 1
    return n * fact(n - 1)
r = fact(3)
";
    let trace = trace(source, &[]);
    let deepest = trace
        .steps()
        .max_by_key(|step| step.call_stack.len())
        .unwrap();
    let functions: Vec<&str> = deepest
        .call_stack
        .iter()
        .map(|f| f.function.as_str())
        .collect();
    assert_eq!(functions, vec!["fact", "fact", "fact", "<module>"]);
    assert_eq!(deepest.locals["n"], json!(1));
    assert_eq!(deepest.call_stack[3], frame("<module>", 5));
}

#[test]
fn functions_classes_and_instances_render_as_json() {
    let source = "\
class Point:
    def __init__(self, x, y):
        self.x = x
        self.y = y
p = Point(1, 2)
f = lambda v: v
done = True
";
    let trace = trace(source, &[]);
    let last = steps(&trace).pop().unwrap();
    assert_eq!(last.locals["Point"], json!("<type 'Point'>"));
    assert_eq!(last.locals["p"], json!({"x": 1, "y": 2}));
    assert_eq!(last.locals["f"], json!("<function 'anonymous'>"));
    assert!(last.data_structures.is_empty());
}

#[test]
fn inputs_are_bound_and_consumed() {
    let trace = trace("n = int(input())\ndone = n * 2\n", &[json!(21)]);
    let first = steps(&trace)[0];
    assert_eq!(first.locals["input_data"], json!([21]));
    let last = steps(&trace)[1];
    assert_eq!(last.locals["n"], json!(21));
}

#[test]
fn empty_source_has_no_steps() {
    let trace = trace("", &[]);
    assert_eq!(trace, Trace::Steps { trace: vec![] });
    assert_eq!(serde_json::to_value(&trace).unwrap(), json!({"trace": []}));
}

#[test]
fn compile_error_never_starts() {
    let trace = trace("x = = 1\n", &[]);
    let json = serde_json::to_value(&trace).unwrap();
    assert!(json.get("trace").is_none());
    let error = json["error"].as_str().unwrap();
    assert!(error.starts_with("SyntaxError"), "{error}");
    assert!(error.contains("line 1"), "{error}");
}

#[test]
fn deeply_parenthesized_source_is_a_compile_error() {
    let source = format!("x = {}1{}\n", "(".repeat(100_000), ")".repeat(100_000));
    let trace = trace(&source, &[]);
    let error = trace.error().expect("nesting should be rejected before running");
    assert!(error.starts_with("SyntaxError: too many nested parentheses"), "{error}");
}

#[test]
fn long_unary_chain_is_a_compile_error() {
    let source = format!("x = {}1\n", "-".repeat(50_000));
    let error = trace(&source, &[]).error().map(str::to_string).unwrap();
    assert!(error.starts_with("SyntaxError: expression is too deeply nested"), "{error}");
}

#[test]
fn tracing_is_idempotent() {
    let source = "xs = [3, 1, 2]\nxs.sort()\nfor x in xs:\n    y = x * x\n";
    assert_eq!(trace(source, &[]), trace(source, &[]));
}

#[test]
fn concurrent_traces_do_not_interfere() {
    let handles: Vec<_> = (0..8)
        .map(|n| {
            std::thread::spawn(move || {
                let source = format!("total = 0\nfor i in range({n}):\n    total += i\n");
                (n, trace(&source, &[]))
            })
        })
        .collect();
    for handle in handles {
        let (n, trace) = handle.join().unwrap();
        assert_eq!(trace.steps().count(), 2 * n as usize + 2);
        let expected: i64 = (0..n).sum();
        let last = trace.steps().last().unwrap();
        assert_eq!(last.locals["total"], json!(expected));
    }
}

#[test]
fn language_dispatch() {
    assert_eq!(trace_for_language("Python", "x = 1\n", &[]).steps().count(), 1);
    assert_eq!(
        trace_for_language("cobol", "x = 1\n", &[]),
        Trace::failed("language 'cobol' is not supported for tracing")
    );
}
