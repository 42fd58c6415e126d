//! API schema types for `POST /api/v1/execution/trace`.

use serde::Deserialize;
use steptrace_tracer::TraceRequest;

fn default_language() -> String {
    "python".to_string()
}

/// Request body for `POST /api/v1/execution/trace`.
#[derive(Debug, Deserialize)]
pub struct TraceExecutionRequest {
    /// Source code to trace.
    pub code: String,

    /// Programming language (default: "python").
    #[serde(default = "default_language")]
    pub language: String,

    /// Values returned by the program's `input()`, in order.
    #[serde(default)]
    pub input_data: Vec<serde_json::Value>,

    /// Deadline in seconds (default: the server's configured default).
    pub timeout: Option<u64>,
}

impl TraceExecutionRequest {
    pub fn into_trace_request(self) -> TraceRequest {
        TraceRequest {
            code: self.code,
            language: self.language,
            input_data: self.input_data,
        }
    }
}
