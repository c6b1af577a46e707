use crate::{
    AppState,
    research::{context::StageContext, events::ProgressSink},
    types::{ArtifactQaRequest, ArtifactQaResponse, Result},
};
use axum::{Json, extract::State};

/// Answer a question about a report, or rewrite it
#[utoipa::path(
    post,
    path = "/api/artifact/qa",
    request_body = ArtifactQaRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ArtifactQaResponse),
        (status = 400, description = "Invalid input"),
        (status = 502, description = "Completion provider error"),
        (status = 504, description = "Completion timed out")
    ),
    tag = "artifact"
)]
pub async fn artifact_qa(
    State(state): State<AppState>,
    Json(payload): Json<ArtifactQaRequest>,
) -> Result<Json<ArtifactQaResponse>> {
    let config = state.config_manager.config();
    let ctx = StageContext::new(
        ProgressSink::disabled(),
        config.research.base_timeout(),
        config.research.require_reasoning_trace,
    );

    let response = state.services.artifact.answer(&ctx, payload).await?;
    Ok(Json(response))
}
