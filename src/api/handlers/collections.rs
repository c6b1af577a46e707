use crate::{AppState, types::CollectionInfo};
use axum::{Json, extract::State};
use serde_json::{Value, json};

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "collections"
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

/// List the demo collections from the configuration
#[utoipa::path(
    get,
    path = "/api/collections",
    responses((status = 200, description = "Configured collections", body = Vec<CollectionInfo>)),
    tag = "collections"
)]
pub async fn list_collections(State(state): State<AppState>) -> Json<Vec<CollectionInfo>> {
    let config = state.config_manager.config();
    Json(
        config
            .collections
            .iter()
            .map(|c| CollectionInfo {
                name: c.name.clone(),
                topic: c.topic.clone(),
                report_organization: c.report_organization.clone(),
            })
            .collect(),
    )
}
