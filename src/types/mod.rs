use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::research::query::Query;

// ============= API Request/Response Types =============

/// Request body for planning the initial research queries
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateQueriesRequest {
    pub topic: String,
    pub report_organization: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_queries: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateQueriesResponse {
    pub queries: Vec<Query>,
}

/// Request body for a full report run
///
/// When `queries` is omitted the planner generates them first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportRequest {
    pub topic: String,
    pub report_organization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<Query>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_queries: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_web: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SourceSummary {
    pub id: u64,
    pub section: String,
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportResponse {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub title: String,
    pub final_report: String,
    pub sections: Vec<String>,
    pub sources: Vec<SourceSummary>,
    pub stages: Vec<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RewriteMode {
    /// Rewrite the whole artifact in one pass
    Entire,
}

/// Question or edit request about a previously generated report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArtifactQaRequest {
    pub artifact: String,
    pub question: String,
    #[serde(default)]
    pub chat_history: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite_mode: Option<RewriteMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_collection: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArtifactQaResponse {
    pub assistant_reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_artifact: Option<String>,
}

/// Demo collection advertised to clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollectionInfo {
    pub name: String,
    pub topic: String,
    pub report_organization: String,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("Web search error: {0}")]
    WebSearch(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::LLM(_) | AppError::KnowledgeBase(_) | AppError::WebSearch(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Parse(_) | AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
