//! Mock implementations for testing.
//!
//! Scripted stand-ins for the three external collaborators so the pipeline
//! can run end to end without a model server or search backend.

use async_trait::async_trait;
use dossier::llm::{LLMClient, TextStream};
use dossier::research::Collaborators;
use dossier::research::services::ResearchServices;
use dossier::tools::{KnowledgeBase, KnowledgeBaseAnswer, WebResult, WebSearch};
use dossier::types::{AppError, Result};
use dossier::utils::toml_config::DossierConfig;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Mock LLM client that answers by prompt content.
///
/// The first rule whose needle occurs in the prompt decides the response;
/// prompts matching no rule get the fallback. Every prompt is recorded.
///
/// ```ignore
/// let llm = MockLLMClient::new("fallback")
///     .on("executive summary", "Short summary.")
///     .failing_on("knowledge gaps");
/// ```
#[derive(Clone, Default)]
pub struct MockLLMClient {
    rules: Vec<(String, String)>,
    failures: Vec<String>,
    fallback: String,
    always_fail: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(fallback: &str) -> Self {
        Self {
            fallback: fallback.to_string(),
            ..Self::default()
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    /// Respond with `response` when the prompt contains `needle`
    pub fn on(mut self, needle: &str, response: &str) -> Self {
        self.rules.push((needle.to_string(), response.to_string()));
        self
    }

    /// Fail when the prompt contains `needle`
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.failures.push(needle.to_string());
        self
    }

    /// Every prompt received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn prompts_containing(&self, needle: &str) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|p| p.contains(needle))
            .collect()
    }

    fn respond(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());

        if self.always_fail || self.failures.iter().any(|f| prompt.contains(f.as_str())) {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }

        Ok(self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.fallback.clone()))
    }

    /// Split a response into five-character chunks
    fn chunked(response: String) -> TextStream {
        let chunks: Vec<String> = response
            .chars()
            .collect::<Vec<_>>()
            .chunks(5)
            .map(|c| c.iter().collect())
            .collect();

        Box::new(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.respond(prompt)
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.respond(prompt)
    }

    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        let joined = messages
            .iter()
            .map(|(role, content)| format!("{}: {}", role, content))
            .collect::<Vec<_>>()
            .join("\n");
        self.respond(&joined)
    }

    async fn stream(&self, prompt: &str) -> Result<TextStream> {
        self.respond(prompt).map(Self::chunked)
    }

    async fn stream_with_system(&self, _system: &str, prompt: &str) -> Result<TextStream> {
        self.respond(prompt).map(Self::chunked)
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Mock knowledge base with per-query answers, delays and failures.
#[derive(Clone, Default)]
pub struct MockKnowledgeBase {
    answers: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    always_fail: bool,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockKnowledgeBase {
    /// Answers every query with `KB answer for <query>`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    pub fn with_answer(mut self, query: &str, answer: &str) -> Self {
        self.answers.insert(query.to_string(), answer.to_string());
        self
    }

    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    /// `(query, collection)` pairs received so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl KnowledgeBase for MockKnowledgeBase {
    async fn search(&self, query: &str, collection: &str) -> Result<KnowledgeBaseAnswer> {
        self.calls
            .lock()
            .push((query.to_string(), collection.to_string()));

        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        if self.always_fail {
            return Err(AppError::KnowledgeBase("Mock knowledge base offline".to_string()));
        }

        let answer = self
            .answers
            .get(query)
            .cloned()
            .unwrap_or_else(|| format!("KB answer for {}", query));
        Ok(KnowledgeBaseAnswer {
            answer,
            citation: format!("{}.pdf", query.replace(' ', "_")),
        })
    }
}

/// One recorded web search call
#[derive(Debug, Clone, PartialEq)]
pub struct WebCall {
    pub query: String,
    pub max_results: usize,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// Mock web search returning canned results and recording every call.
#[derive(Clone, Default)]
pub struct MockWebSearch {
    results: Vec<WebResult>,
    always_fail: bool,
    calls: Arc<Mutex<Vec<WebCall>>>,
}

impl MockWebSearch {
    pub fn new(results: Vec<WebResult>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<WebCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl WebSearch for MockWebSearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        include_domains: &[String],
        exclude_domains: &[String],
    ) -> Result<Vec<WebResult>> {
        self.calls.lock().push(WebCall {
            query: query.to_string(),
            max_results,
            include: include_domains.to_vec(),
            exclude: exclude_domains.to_vec(),
        });

        if self.always_fail {
            return Err(AppError::WebSearch("Mock web search offline".to_string()));
        }
        Ok(self.results.clone())
    }
}

pub fn web_result(content: &str, url: &str, score: f64) -> WebResult {
    WebResult {
        content: content.to_string(),
        url: url.to_string(),
        score,
    }
}

/// Services wired to the given mocks; one LLM plays every role
pub fn services(
    llm: &MockLLMClient,
    knowledge_base: &MockKnowledgeBase,
    web: &MockWebSearch,
    config: &DossierConfig,
) -> ResearchServices {
    let llm: Arc<dyn LLMClient> = Arc::new(llm.clone());
    ResearchServices::new(
        Collaborators {
            reasoning: llm.clone(),
            writer: llm.clone(),
            artifact: llm,
            knowledge_base: Arc::new(knowledge_base.clone()),
            web: Arc::new(web.clone()),
        },
        config,
    )
}

/// Config with short timeouts suitable for tests
pub fn test_config() -> DossierConfig {
    let mut config = DossierConfig::default();
    config.research.timeout_secs = 5;
    config.research.reflection_rounds = 1;
    config
}
