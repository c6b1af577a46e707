//! HTTP API tests using axum-test against scripted collaborators.

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::mocks::{MockKnowledgeBase, MockLLMClient, MockWebSearch, services, test_config};
use dossier::api::routes;
use dossier::utils::toml_config::{CollectionConfig, DossierConfig};
use dossier::{AppState, DossierConfigManager};
use serde_json::{Value, json};
use std::sync::Arc;

const PLAN: &str = r#"<think>two sections</think>[
  {"query": "Solar cost curve", "report_section": "Economics", "rationale": "cost"},
  {"query": "Solar land use", "report_section": "Impact", "rationale": "footprint"}
]"#;

fn report_llm() -> MockLLMClient {
    MockLLMClient::new("<think>ok</think>Generic text.")
        .on("search queries that will help", PLAN)
        .on("Determine if the Context contains", r#"{"score": "yes"}"#)
        .on("identify knowledge gaps", r#"<think>gap</think>{"query": "Solar recycling", "report_section": "Impact"}"#)
        .on("Write an executive summary", "Solar keeps getting cheaper.")
        .on("section of a research report", "Costs fell [1] [2].")
}

fn server_with(llm: MockLLMClient, config: DossierConfig) -> TestServer {
    let state = AppState {
        services: services(&llm, &MockKnowledgeBase::new(), &MockWebSearch::default(), &config),
        config_manager: Arc::new(DossierConfigManager::from_config(config)),
    };
    TestServer::new(routes::app(state)).unwrap()
}

fn server() -> TestServer {
    server_with(report_llm(), test_config())
}

// ============= Health & Collections =============

#[tokio::test]
async fn test_health_check() {
    let response = server().get("/health").await;

    response.assert_status_ok();
    response.assert_json(&json!({"status": "OK"}));
}

#[tokio::test]
async fn test_list_collections() {
    let mut config = test_config();
    config.collections.push(CollectionConfig {
        name: "energy".to_string(),
        topic: "Renewable Energy".to_string(),
        report_organization: "Current State, Challenges, Solutions".to_string(),
    });

    let response = server_with(report_llm(), config).get("/api/collections").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "energy");
    assert_eq!(body[0]["report_organization"], "Current State, Challenges, Solutions");
}

#[tokio::test]
async fn test_openapi_document() {
    let response = server().get("/api/openapi.json").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["paths"]["/api/research/report"].is_object());
    assert!(body["paths"]["/api/artifact/qa"].is_object());
}

// ============= Research =============

#[tokio::test]
async fn test_generate_queries() {
    let response = server()
        .post("/api/research/queries")
        .json(&json!({
            "topic": "Solar Power",
            "report_organization": "Economics, Impact",
            "num_queries": 2
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let queries = body["queries"].as_array().unwrap();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0]["query"], "Solar cost curve");
    assert_eq!(queries[0]["report_section"], "Economics");
    assert_eq!(queries[0]["origin"], "initial");
}

#[tokio::test]
async fn test_generate_queries_rejects_empty_topic() {
    let response = server()
        .post("/api/research/queries")
        .json(&json!({"topic": "", "report_organization": "Economics"}))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("topic"));
}

#[tokio::test]
async fn test_generate_report() {
    let response = server()
        .post("/api/research/report")
        .json(&json!({
            "topic": "Solar Power",
            "report_organization": "Economics, Impact",
            "search_web": false,
            "reflection_count": 1
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["title"], "Solar Power");
    assert_eq!(body["id"].as_str().unwrap().len(), 36);
    assert!(body["generated_at"].is_string());
    assert_eq!(body["sections"], json!(["Economics", "Impact"]));
    assert_eq!(body["sources"].as_array().unwrap().len(), 3);
    assert_eq!(body["sources"][2]["query"], "Solar recycling");
    assert_eq!(
        body["stages"],
        json!(["generate_queries", "research", "write", "reflect", "research", "write", "finalize"])
    );

    let report = body["final_report"].as_str().unwrap();
    assert!(report.starts_with("# Solar Power"));
    assert!(report.contains("## Executive Summary\n\nSolar keeps getting cheaper."));
    assert!(report.contains("## Sources"));
}

#[tokio::test]
async fn test_generate_report_with_supplied_queries() {
    let response = server()
        .post("/api/research/report")
        .json(&json!({
            "topic": "Solar Power",
            "report_organization": "Economics, Impact",
            "search_web": false,
            "reflection_count": 1,
            "queries": [
                {"query": "Panel efficiency trends", "report_section": "Economics", "rationale": "x"}
            ]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["stages"][0], "research");
    assert_eq!(body["sources"][0]["query"], "Panel efficiency trends");
}

#[tokio::test]
async fn test_generate_report_provider_outage() {
    let response = server_with(MockLLMClient::failing(), test_config())
        .post("/api/research/report")
        .json(&json!({
            "topic": "Solar Power",
            "report_organization": "Economics, Impact",
            "search_web": false
        }))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_stream_report_ends_with_report_event() {
    let response = server()
        .post("/api/research/report/stream")
        .json(&json!({
            "topic": "Solar Power",
            "report_organization": "Economics, Impact",
            "search_web": false,
            "reflection_count": 1
        }))
        .await;

    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains("event: generating_questions"));
    assert!(text.contains("event: rag_answer"));
    assert!(text.contains("event: report"));
    assert!(!text.contains("event: error"));
    let report_at = text.find("event: report").unwrap();
    let last_progress = text.rfind("event: rag_answer").unwrap();
    assert!(last_progress < report_at);
}

#[tokio::test]
async fn test_stream_report_error_event() {
    let response = server()
        .post("/api/research/report/stream")
        .json(&json!({"topic": " ", "report_organization": "Economics"}))
        .await;

    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains("event: error"));
    assert!(!text.contains("event: report"));
}

// ============= Artifact Q&A =============

#[tokio::test]
async fn test_artifact_question() {
    let llm = MockLLMClient::new("<think>reading</think>The report covers solar costs.");
    let response = server_with(llm.clone(), test_config())
        .post("/api/artifact/qa")
        .json(&json!({
            "artifact": "# Solar\n\nCosts fell.",
            "question": "What is this about?",
            "chat_history": ["Hi", "Hello!"]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["assistant_reply"], "The report covers solar costs.");
    assert_eq!(body["updated_artifact"], "# Solar\n\nCosts fell.");

    let prompt = &llm.prompts()[0];
    assert!(prompt.contains("user: Hi"));
    assert!(prompt.contains("assistant: Hello!"));
    assert!(prompt.contains("--- ADDITIONAL CONTEXT ---"));
}

#[tokio::test]
async fn test_artifact_rewrite() {
    let llm = MockLLMClient::new("unused").on("The user has asked for an update", "# Shorter\n\nCosts fell.");
    let response = server_with(llm, test_config())
        .post("/api/artifact/qa")
        .json(&json!({
            "artifact": "# Solar Power Report\n\nCosts fell.",
            "question": "Shorten the title",
            "rewrite_mode": "entire"
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["assistant_reply"], "Here is the updated artifact (entire rewrite).");
    assert_eq!(body["updated_artifact"], "# Shorter\n\nCosts fell.");
}

#[tokio::test]
async fn test_artifact_guardrail_rejects_off_topic() {
    let mut config = test_config();
    config.artifact.guardrail = true;
    let llm = MockLLMClient::new("should not be used")
        .on("determine whether the user prompt is within scope", r#"{"relevant": "no"}"#);

    let response = server_with(llm.clone(), config)
        .post("/api/artifact/qa")
        .json(&json!({
            "artifact": "# Study Habits",
            "question": "Who is the current president?"
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body["assistant_reply"],
        "Sorry, I am not able to help answer that question. Please try again."
    );
    assert_eq!(body["updated_artifact"], "# Study Habits");
    assert_eq!(llm.prompts().len(), 1);
}

#[tokio::test]
async fn test_artifact_empty_question() {
    let response = server()
        .post("/api/artifact/qa")
        .json(&json!({"artifact": "# Solar", "question": "  "}))
        .await;

    response.assert_status_bad_request();
}
