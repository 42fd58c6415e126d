//! Runs the `steptrace` binary end to end.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn steptrace(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_steptrace"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("binary should start");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be one JSON document")
}

#[test]
fn trace_reads_stdin_and_prints_json() {
    let output = steptrace(&["trace", "-"], "x = 1\ny = 2\n");
    assert_eq!(output.status.code(), Some(0));
    let json = stdout_json(&output);
    assert_eq!(json["trace"].as_array().unwrap().len(), 2);
}

#[test]
fn inputs_output_and_final_state() {
    let output = steptrace(
        &["trace", "-", "--input", "3", "--show-output", "--final-state"],
        "n = int(input())\nprint(n + 1)\n",
    );
    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("4\n"), "{stderr}");
    assert!(stderr.contains(r#""n":3"#), "{stderr}");
}

#[test]
fn faulted_program_still_succeeds() {
    let output = steptrace(&["trace", "-"], "x = 1 / 0\n");
    assert_eq!(output.status.code(), Some(0));
    let json = stdout_json(&output);
    assert_eq!(json["trace"][1]["error_type"], "ZeroDivisionError");
}

#[test]
fn compile_error_exits_with_one() {
    let output = steptrace(&["trace", "-"], "def (:\n");
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout_json(&output)["error"].is_string());
}

#[test]
fn missing_file_exits_with_three() {
    let output = steptrace(&["trace", "/nonexistent/program.py"], "");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn worker_answers_one_request() {
    let output = steptrace(
        &["worker"],
        r#"{"code": "x = input()\n", "language": "python", "input_data": ["a"]}"#,
    );
    assert_eq!(output.status.code(), Some(0));
    let json = stdout_json(&output);
    assert_eq!(json["trace"][0]["locals"]["input_data"], serde_json::json!(["a"]));

    let output = steptrace(&["worker"], "not json");
    assert!(stdout_json(&output)["error"]
        .as_str()
        .unwrap()
        .starts_with("invalid trace request"));
}
