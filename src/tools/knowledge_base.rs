//! Knowledge-base search against a RAG server.
//!
//! The server answers `POST <base>/generate` with a server-sent event body:
//! one `data: {json}` line per chunk, each carrying a slice of the answer in
//! `choices[0].message.content` (or `choices[0].delta.content`) and,
//! usually on the last chunk, the retrieved documents under
//! `citations.results`.

use crate::types::{AppError, Result};
use crate::utils::toml_config::KnowledgeBaseConfig;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::{Value, json};

/// Answer text plus the raw citation the provider returned for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBaseAnswer {
    pub answer: String,
    pub citation: String,
}

#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn search(&self, query: &str, collection: &str) -> Result<KnowledgeBaseAnswer>;
}

pub struct RagClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl RagClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join("generate"))
            .map_err(|e| {
                AppError::Configuration(format!("invalid knowledge base URL '{}': {}", base_url, e))
            })?;

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
        })
    }

    pub fn from_config(config: &KnowledgeBaseConfig) -> Result<Self> {
        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok());
        Self::new(&config.base_url, api_key)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl KnowledgeBase for RagClient {
    async fn search(&self, query: &str, collection: &str) -> Result<KnowledgeBaseAnswer> {
        let body = json!({
            "messages": [{"role": "user", "content": query}],
            "use_knowledge_base": true,
            "enable_citations": true,
            "collection_name": collection,
        });

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!(endpoint = %self.endpoint, collection, "Knowledge base search");

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::KnowledgeBase(format!("request to {} failed: {}", self.endpoint, e)))?;

        let text = response
            .text()
            .await
            .map_err(|e| AppError::KnowledgeBase(format!("reading response failed: {}", e)))?;

        parse_event_stream(&text)
    }
}

/// Fold the `data:` lines of an event-stream body into one answer
pub fn parse_event_stream(body: &str) -> Result<KnowledgeBaseAnswer> {
    let mut answer = String::new();
    let mut documents: Vec<String> = Vec::new();

    for line in body.lines() {
        let Some(data) = line.strip_prefix("data: ") else {
            continue;
        };
        if data.trim() == "[DONE]" {
            break;
        }

        let chunk: Value = serde_json::from_str(data)
            .map_err(|e| AppError::KnowledgeBase(format!("malformed event: {}", e)))?;

        let choice = &chunk["choices"][0];
        let content = choice["message"]["content"]
            .as_str()
            .or_else(|| choice["delta"]["content"].as_str());
        if let Some(content) = content {
            answer.push_str(content);
        }

        if let Some(results) = chunk["citations"]["results"].as_array() {
            documents.extend(
                results
                    .iter()
                    .filter(|r| r["document_type"] == "text")
                    .filter_map(|r| r["document_name"].as_str())
                    .map(str::to_string),
            );
        }
    }

    Ok(KnowledgeBaseAnswer {
        answer,
        citation: documents.join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join_keeps_versioned_base() {
        let client = RagClient::new("http://rag:8081/v1/", None).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://rag:8081/v1/generate");

        let client = RagClient::new("http://rag:8081/v1", None).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://rag:8081/generate");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            RagClient::new("not a url", None),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_event_stream() {
        let body = concat!(
            "data: {\"choices\":[{\"message\":{\"content\":\"Solar \"}}]}\n",
            "\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"is growing.\"}}],",
            "\"citations\":{\"results\":[",
            "{\"document_name\":\"iea_2024.pdf\",\"document_type\":\"text\"},",
            "{\"document_name\":\"chart.png\",\"document_type\":\"image\"},",
            "{\"document_name\":\"nrel.pdf\",\"document_type\":\"text\"}]}}\n",
            "data: [DONE]\n"
        );

        let parsed = parse_event_stream(body).unwrap();
        assert_eq!(parsed.answer, "Solar is growing.");
        assert_eq!(parsed.citation, "iea_2024.pdf, nrel.pdf");
    }

    #[test]
    fn test_parse_event_stream_rejects_garbage() {
        assert!(parse_event_stream("data: {not json").is_err());
    }
}
