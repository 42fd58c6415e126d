//! The request a collaborator hands to a tracing worker.

use serde::{Deserialize, Serialize};

use crate::schema::Trace;

/// One program to trace, as read by `steptrace worker` and sent by the
/// HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRequest {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub input_data: Vec<serde_json::Value>,
}

fn default_language() -> String {
    "python".to_string()
}

impl TraceRequest {
    pub fn new(code: impl Into<String>) -> Self {
        TraceRequest {
            code: code.into(),
            language: default_language(),
            input_data: Vec::new(),
        }
    }

    pub fn run(&self) -> Trace {
        crate::trace_for_language(&self.language, &self.code, &self.input_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_and_inputs_are_optional() {
        let request: TraceRequest = serde_json::from_str(r#"{"code": "x = 1"}"#).unwrap();
        assert_eq!(request, TraceRequest::new("x = 1"));
        assert_eq!(request.run().steps().count(), 1);
    }
}
