use crate::AppState;
use crate::api::handlers::{artifact, collections, research};
use crate::types::{
    ArtifactQaRequest, ArtifactQaResponse, CollectionInfo, GenerateQueriesRequest,
    GenerateQueriesResponse, ReportRequest, ReportResponse, RewriteMode, SourceSummary,
};
use crate::research::query::{Query, QueryOrigin};
use axum::{
    Json, Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "Dossier", description = "Iterative research-synthesis API"),
    paths(
        research::generate_queries,
        research::generate_report,
        research::stream_report,
        artifact::artifact_qa,
        collections::list_collections,
        collections::health,
    ),
    components(schemas(
        GenerateQueriesRequest,
        GenerateQueriesResponse,
        ReportRequest,
        ReportResponse,
        SourceSummary,
        ArtifactQaRequest,
        ArtifactQaResponse,
        RewriteMode,
        CollectionInfo,
        Query,
        QueryOrigin,
    )),
    tags(
        (name = "research", description = "Report generation"),
        (name = "artifact", description = "Questions about finished reports"),
        (name = "collections", description = "Configured collections"),
    )
)]
pub struct ApiDoc;

/// Routes mounted under `/api`
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/research/queries", post(research::generate_queries))
        .route("/research/report", post(research::generate_report))
        .route("/research/report/stream", post(research::stream_report))
        .route("/artifact/qa", post(artifact::artifact_qa))
        .route("/collections", get(collections::list_collections))
        .route("/openapi.json", get(openapi_json))
}

/// The complete application with middleware and state applied
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(collections::health))
        .nest("/api", create_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
