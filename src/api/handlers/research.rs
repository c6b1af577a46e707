use crate::{
    AppState,
    research::events::{ProgressEvent, ProgressSink},
    research::task_group::AbortOnDrop,
    types::{
        AppError, GenerateQueriesRequest, GenerateQueriesResponse, ReportRequest, ReportResponse,
        Result,
    },
};
use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use serde_json::json;
use std::convert::Infallible;

/// Plan research queries for a topic and outline
#[utoipa::path(
    post,
    path = "/api/research/queries",
    request_body = GenerateQueriesRequest,
    responses(
        (status = 200, description = "Planned queries", body = GenerateQueriesResponse),
        (status = 400, description = "Invalid input"),
        (status = 503, description = "Completion provider unavailable")
    ),
    tag = "research"
)]
pub async fn generate_queries(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQueriesRequest>,
) -> Result<Json<GenerateQueriesResponse>> {
    let queries = state
        .controller()
        .generate_queries(&payload, ProgressSink::disabled())
        .await?;

    Ok(Json(GenerateQueriesResponse { queries }))
}

/// Run the research pipeline and return the finished report
#[utoipa::path(
    post,
    path = "/api/research/report",
    request_body = ReportRequest,
    responses(
        (status = 200, description = "Report generated", body = ReportResponse),
        (status = 400, description = "Invalid input"),
        (status = 503, description = "A provider was unavailable for the whole run")
    ),
    tag = "research"
)]
pub async fn generate_report(
    State(state): State<AppState>,
    Json(payload): Json<ReportRequest>,
) -> Result<Json<ReportResponse>> {
    let report = state
        .controller()
        .run(&payload, ProgressSink::disabled())
        .await?;

    Ok(Json(report.to_response()))
}

/// Run the research pipeline, streaming progress as server-sent events
///
/// Each progress event is named after its stage. The stream ends with a
/// `report` event carrying the report JSON, or an `error` event.
#[utoipa::path(
    post,
    path = "/api/research/report/stream",
    request_body = ReportRequest,
    responses((status = 200, description = "text/event-stream of progress, then a report or error event")),
    tag = "research"
)]
pub async fn stream_report(
    State(state): State<AppState>,
    Json(payload): Json<ReportRequest>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let controller = state.controller();
    let (sink, mut rx) = ProgressSink::channel();
    let run = tokio::spawn(async move { controller.run(&payload, sink).await });
    let guard = AbortOnDrop::new(&run);

    let stream = async_stream::stream! {
        // A disconnected client drops the stream and with it the run
        let _guard = guard;
        while let Some(event) = rx.recv().await {
            yield Ok::<Event, Infallible>(progress_event(&event));
        }

        let outcome = run
            .await
            .unwrap_or_else(|e| Err(AppError::Internal(format!("report task failed: {}", e))));
        match outcome {
            Ok(report) => {
                let body = serde_json::to_string(&report.to_response()).unwrap_or_default();
                yield Ok(Event::default().event("report").data(body));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Streamed report failed");
                let body = json!({ "error": e.to_string() }).to_string();
                yield Ok(Event::default().event("error").data(body));
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn progress_event(event: &ProgressEvent) -> Event {
    Event::default().event(&event.stage).data(&event.text)
}
