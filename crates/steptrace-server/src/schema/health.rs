use serde::{Deserialize, Serialize};

/// Response body for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Response body for `GET /api/v1/languages`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LanguagesResponse {
    pub languages: Vec<LanguageInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub name: String,
    /// Whether `POST /api/v1/execution/trace` accepts this language.
    pub tracing: bool,
}
