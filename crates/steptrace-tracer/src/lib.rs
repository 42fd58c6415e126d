//! Execution tracer.
//!
//! Runs a program and records a [`Step`] immediately before every source line
//! executes: the line, its text, the innermost frame's locals, the data
//! structures detected among them and the call stack. The result is a
//! [`Trace`] in the JSON schema the visualizer replays.
//!
//! ```
//! let trace = steptrace_tracer::trace("x = 1\ny = x + 1\n", &[]);
//! let lines: Vec<u32> = trace.steps().map(|step| step.line).collect();
//! assert_eq!(lines, vec![1, 2]);
//! ```

pub mod config;
pub mod controller;
pub mod detect;
pub mod error;
pub mod guard;
pub mod request;
pub mod schema;
pub mod snapshot;

// Re-export commonly used types
pub use config::TracerConfig;
pub use controller::{TraceOutcome, Tracer};
pub use error::TracerError;
pub use request::TraceRequest;
pub use schema::{Edge, Fault, FrameInfo, GraphData, Step, Structure, Trace, TraceEntry};

/// Languages with a tracing back end.
pub const SUPPORTED_LANGUAGES: &[&str] = &["python"];

/// Traces `source` with the default configuration.
pub fn trace(source: &str, inputs: &[serde_json::Value]) -> Trace {
    Tracer::default().trace(source, inputs).trace
}

/// Dispatches to the back end for `language` (case-insensitive).
pub fn trace_for_language(language: &str, source: &str, inputs: &[serde_json::Value]) -> Trace {
    if is_supported(language) {
        trace(source, inputs)
    } else {
        Trace::failed(format!("language '{language}' is not supported for tracing"))
    }
}

pub fn is_supported(language: &str) -> bool {
    SUPPORTED_LANGUAGES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(language))
}
