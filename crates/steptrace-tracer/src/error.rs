use thiserror::Error;

/// Failures of the tracing machinery itself, as opposed to faults of the
/// traced program (those end up inside the Trace).
#[derive(Debug, Error)]
pub enum TracerError {
    #[error("could not start tracing session: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("tracing session panicked: {0}")]
    Panicked(String),
}
