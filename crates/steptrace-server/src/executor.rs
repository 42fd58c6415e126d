//! Runs trace requests under a deadline.
//!
//! Tracing is synchronous and has no timeout of its own. A runaway program
//! can only be stopped from outside, so by default every request gets its
//! own `steptrace worker` process, killed when the deadline expires.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use steptrace_tracer::{Trace, TraceRequest};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub enum Executor {
    /// One `steptrace worker` process per request.
    Subprocess { worker: PathBuf },
    /// The server's blocking thread pool. A call that misses its deadline is
    /// abandoned, not stopped: it keeps its thread until the program ends.
    Inline,
}

impl Executor {
    pub async fn run(&self, request: TraceRequest, deadline: Duration) -> Result<Trace, ApiError> {
        match self {
            Executor::Subprocess { worker } => run_worker(worker, &request, deadline).await,
            Executor::Inline => run_inline(request, deadline).await,
        }
    }
}

async fn run_worker(
    worker: &Path,
    request: &TraceRequest,
    deadline: Duration,
) -> Result<Trace, ApiError> {
    let payload = serde_json::to_vec(request)
        .map_err(|e| ApiError::InternalError(format!("failed to encode request: {e}")))?;

    let mut child = Command::new(worker)
        .arg("worker")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            ApiError::InternalError(format!("failed to start worker '{}': {e}", worker.display()))
        })?;
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ApiError::InternalError("worker stdin unavailable".to_string()))?;

    // Dropping this future on timeout drops `child`, which kills it.
    let exchange = async move {
        stdin.write_all(&payload).await?;
        drop(stdin);
        child.wait_with_output().await
    };

    let output = match tokio::time::timeout(deadline, exchange).await {
        Ok(output) => output?,
        Err(_) => {
            tracing::warn!(timeout_secs = deadline.as_secs(), "worker killed at deadline");
            return Err(ApiError::Timeout {
                seconds: deadline.as_secs(),
            });
        }
    };
    if !output.status.success() {
        return Err(ApiError::InternalError(format!(
            "worker exited with {}",
            output.status
        )));
    }
    serde_json::from_slice(&output.stdout)
        .map_err(|e| ApiError::InternalError(format!("worker answered with invalid JSON: {e}")))
}

async fn run_inline(request: TraceRequest, deadline: Duration) -> Result<Trace, ApiError> {
    let task = tokio::task::spawn_blocking(move || request.run());
    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(trace)) => Ok(trace),
        Ok(Err(join_error)) => Err(ApiError::InternalError(format!(
            "tracing task failed: {join_error}"
        ))),
        Err(_) => {
            tracing::warn!(timeout_secs = deadline.as_secs(), "inline trace abandoned at deadline");
            Err(ApiError::Timeout {
                seconds: deadline.as_secs(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inline_returns_the_trace() {
        let trace = Executor::Inline
            .run(TraceRequest::new("x = 1\n"), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(trace.steps().count(), 1);
    }

    #[tokio::test]
    async fn inline_deadline_is_enforced() {
        let slow = TraceRequest::new("for i in range(20000):\n    x = i\n");
        let err = Executor::Inline.run(slow, Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout { seconds: 0 }));
    }

    #[tokio::test]
    async fn missing_worker_is_an_internal_error() {
        let executor = Executor::Subprocess {
            worker: PathBuf::from("/nonexistent/steptrace"),
        };
        let err = executor
            .run(TraceRequest::new("x = 1\n"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InternalError(_)));
    }
}
