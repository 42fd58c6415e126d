//! Service metadata handlers.

use axum::Json;

use crate::schema::health::{HealthResponse, LanguageInfo, LanguagesResponse};

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "steptrace".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/v1/languages`
pub async fn languages() -> Json<LanguagesResponse> {
    let languages = steptrace_tracer::SUPPORTED_LANGUAGES
        .iter()
        .map(|name| LanguageInfo {
            name: name.to_string(),
            tracing: true,
        })
        .collect();
    Json(LanguagesResponse { languages })
}
