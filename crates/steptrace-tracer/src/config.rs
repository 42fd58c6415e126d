//! Tracer configuration.

use serde::{Deserialize, Serialize};

use crate::guard::Limits;

/// Configuration for one [`Tracer`](crate::Tracer).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// let config: steptrace_tracer::TracerConfig =
///     serde_json::from_str(r#"{"max_items": 50}"#).unwrap();
/// assert_eq!(config.max_items, 50);
/// assert_eq!(config.max_depth, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Reported as `filename` in every call-stack frame and traceback.
    /// Default: `<string>`.
    pub source_id: String,
    /// Nesting depth at which captured values are cut off. Default: 32.
    pub max_depth: usize,
    /// Elements kept per container before the rest is summarised.
    /// Default: 1000.
    pub max_items: usize,
    /// Maximum number of active frames in the traced program. Default: 256.
    pub max_recursion_depth: usize,
    /// Stack size of the session thread. Default: 256 MiB.
    pub stack_size_bytes: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        TracerConfig {
            source_id: "<string>".to_string(),
            max_depth: 32,
            max_items: 1000,
            max_recursion_depth: 256,
            stack_size_bytes: 256 * 1024 * 1024,
        }
    }
}

impl TracerConfig {
    pub(crate) fn limits(&self) -> Limits {
        Limits {
            max_depth: self.max_depth,
            max_items: self.max_items,
        }
    }
}
