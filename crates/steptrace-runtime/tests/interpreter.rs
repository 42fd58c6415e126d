//! End-to-end runs of small programs through the interpreter.

use steptrace_runtime::value::End;
use steptrace_runtime::{
    ExcKind, Interpreter, InterpreterConfig, LineContext, NoopHook, RtResult, Value,
};

fn run_with(config: InterpreterConfig, inputs: Vec<Value>, source: &str) -> (RtResult<()>, String) {
    let module = steptrace_syntax::parse(source).expect("source should parse");
    let mut hook = NoopHook;
    let mut interp = Interpreter::new(config, &mut hook);
    interp.set_inputs(inputs);
    let result = interp.run(&module);
    let output = interp.output().to_string();
    interp.reclaim();
    (result, output)
}

fn run(source: &str) -> String {
    let (result, output) = run_with(InterpreterConfig::default(), Vec::new(), source);
    if let Err(exc) = result {
        panic!("program raised {exc}");
    }
    output
}

fn lines_of(source: &str) -> Vec<u32> {
    let module = steptrace_syntax::parse(source).expect("source should parse");
    let mut lines = Vec::new();
    let mut hook = |ctx: &LineContext<'_>| lines.push(ctx.line());
    let mut interp = Interpreter::new(InterpreterConfig::default(), &mut hook);
    interp.run(&module).expect("program should run");
    interp.reclaim();
    lines
}

#[test]
fn arithmetic_follows_floor_semantics() {
    assert_eq!(run("print(7 // 2, 7 % -3, 2 ** 10)\n"), "3 -2 1024\n");
}

#[test]
fn loop_headers_fire_once_more_than_the_body() {
    let source = "x = 1\nfor i in range(2):\n    x += i\n";
    assert_eq!(lines_of(source), vec![1, 2, 3, 2, 3, 2]);
}

#[test]
fn statements_sharing_a_line_fire_once() {
    assert_eq!(lines_of("a = 1; b = 2\nc = 3\n"), vec![1, 2]);
}

#[test]
fn hook_sees_every_frame() {
    let source = "\
def fact(n):
    if n <= 1:
        return 1
    return n * fact(n - 1)
print(fact(3))
";
    let module = steptrace_syntax::parse(source).unwrap();
    let mut max_depth = 0;
    let mut innermost = Vec::new();
    let mut hook = |ctx: &LineContext<'_>| {
        max_depth = max_depth.max(ctx.depth());
        if let Some(frame) = ctx.innermost() {
            innermost.push(frame.function().to_string());
        }
    };
    let mut interp = Interpreter::new(InterpreterConfig::default(), &mut hook);
    interp.run(&module).unwrap();
    assert_eq!(interp.output(), "6\n");
    interp.reclaim();
    assert_eq!(max_depth, 4);
    assert_eq!(innermost.first().map(String::as_str), Some("<module>"));
    assert!(innermost.iter().any(|name| name == "fact"));
}

#[test]
fn uncaught_exception_carries_a_traceback() {
    let source = "def f():\n    return 1 / 0\nf()\n";
    let (result, _) = run_with(InterpreterConfig::default(), Vec::new(), source);
    let exc = result.unwrap_err();
    assert_eq!(exc.kind(), ExcKind::ZeroDivisionError);
    assert_eq!(exc.message(), "division by zero");
    let frames: Vec<(&str, u32)> = exc
        .traceback
        .iter()
        .map(|entry| (&*entry.function, entry.line))
        .collect();
    assert_eq!(frames, vec![("<module>", 3), ("f", 2)]);
}

#[test]
fn except_clauses_follow_the_class_hierarchy() {
    let source = "\
class MyError(ValueError):
    pass
try:
    raise MyError(\"bad\")
except KeyError:
    print(\"wrong\")
except ValueError as e:
    print(\"caught\", e)
finally:
    print(\"done\")
";
    assert_eq!(run(source), "caught bad\ndone\n");
}

#[test]
fn removal_end_is_recorded() {
    let source = "\
from collections import deque
q = deque([1, 2, 3])
q.popleft()
s = [1, 2]
s.pop()
a = [1, 2, 3]
a.pop(0)
";
    let module = steptrace_syntax::parse(source).unwrap();
    let mut hook = NoopHook;
    let mut interp = Interpreter::new(InterpreterConfig::default(), &mut hook);
    interp.run(&module).unwrap();
    let ends: Vec<(String, Option<End>)> = interp
        .globals()
        .into_iter()
        .filter_map(|(name, value)| match value {
            Value::List(list) => Some((name.to_string(), list.last_removal())),
            _ => None,
        })
        .collect();
    interp.reclaim();
    assert_eq!(
        ends,
        vec![
            ("q".to_string(), Some(End::Front)),
            ("s".to_string(), Some(End::Back)),
            ("a".to_string(), Some(End::Front)),
        ]
    );
}

#[test]
fn inputs_feed_input_and_input_data() {
    let (result, output) = run_with(
        InterpreterConfig::default(),
        vec![Value::Int(5)],
        "n = int(input())\nprint(n * 2, input_data)\n",
    );
    result.unwrap();
    assert_eq!(output, "10 [5]\n");
}

#[test]
fn exhausted_input_raises_eof() {
    let (result, _) = run_with(InterpreterConfig::default(), Vec::new(), "x = input()\n");
    assert_eq!(result.unwrap_err().kind(), ExcKind::EOFError);
}

#[test]
fn runaway_recursion_is_bounded() {
    let config = InterpreterConfig {
        max_recursion_depth: 50,
        ..InterpreterConfig::default()
    };
    let (result, _) = run_with(config, Vec::new(), "def f(n):\n    return f(n + 1)\nf(0)\n");
    assert_eq!(result.unwrap_err().kind(), ExcKind::RecursionError);
}

#[test]
fn builtins_and_methods() {
    assert_eq!(
        run("print(sorted([3, 1, 2], reverse=True), max([1, 5, 2]), sum(range(5)))\n"),
        "[3, 2, 1] 5 10\n"
    );
    assert_eq!(
        run("print(\"a,b\".split(\",\"), \" x \".strip(), \"-\".join([\"a\", \"b\"]))\n"),
        "['a', 'b'] x a-b\n"
    );
    assert_eq!(run("x = 3.14159\nprint(f\"{x:.2f}\")\n"), "3.14\n");
}

#[test]
fn collections_and_heapq() {
    assert_eq!(
        run("from collections import Counter\nprint(Counter(\"abca\").most_common(1))\n"),
        "[('a', 2)]\n"
    );
    let source = "\
import heapq
h = []
for x in [5, 1, 3]:
    heapq.heappush(h, x)
print(heapq.heappop(h), h)
";
    assert_eq!(run(source), "1 [3, 5]\n");
}

#[test]
fn closures_and_nonlocal() {
    let source = "\
def counter():
    n = 0
    def inc():
        nonlocal n
        n += 1
        return n
    return inc
c = counter()
c()
print(c())
";
    assert_eq!(run(source), "2\n");
}

#[test]
fn classes_and_super() {
    let source = "\
class A:
    def __init__(self, x):
        self.x = x
class B(A):
    def __init__(self, x):
        super().__init__(x * 2)
print(B(2).x)
";
    assert_eq!(run(source), "4\n");
}

#[test]
fn unknown_module_is_a_runtime_fault() {
    let (result, _) = run_with(InterpreterConfig::default(), Vec::new(), "import numpy\n");
    let exc = result.unwrap_err();
    assert!(exc.kind().is_subclass_of(ExcKind::ImportError));
}
