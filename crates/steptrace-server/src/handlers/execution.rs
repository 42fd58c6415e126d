//! Execution trace handler.

use std::time::Duration;

use axum::extract::State;
use axum::Json;
use steptrace_tracer::Trace;
use uuid::Uuid;

use crate::error::ApiError;
use crate::schema::execution::TraceExecutionRequest;
use crate::state::AppState;

/// Traces a program and returns its Trace.
///
/// Compile errors, unsupported languages and runtime faults are all part of
/// the Trace and come back with `200`.
///
/// `POST /api/v1/execution/trace`
pub async fn trace(
    State(state): State<AppState>,
    Json(request): Json<TraceExecutionRequest>,
) -> Result<Json<Trace>, ApiError> {
    if request.code.trim().is_empty() {
        return Err(ApiError::BadRequest("code must not be empty".to_string()));
    }
    let deadline = match request.timeout {
        None => state.config.default_timeout,
        Some(0) => {
            return Err(ApiError::BadRequest(
                "timeout must be at least 1 second".to_string(),
            ))
        }
        Some(secs) if Duration::from_secs(secs) > state.config.max_timeout => {
            return Err(ApiError::BadRequest(format!(
                "timeout {}s exceeds the maximum of {}s",
                secs,
                state.config.max_timeout.as_secs()
            )))
        }
        Some(secs) => Duration::from_secs(secs),
    };

    let request_id = Uuid::new_v4();
    let request = request.into_trace_request();
    tracing::info!(%request_id, language = %request.language, timeout_secs = deadline.as_secs(), "trace requested");

    let trace = state.config.executor.run(request, deadline).await?;
    tracing::info!(
        %request_id,
        entries = trace.entries().len(),
        failed = trace.error().is_some(),
        "trace finished"
    );
    Ok(Json(trace))
}
