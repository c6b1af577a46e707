//! Per-run plumbing shared by every stage: timeouts, progress events, and
//! provider-health accounting.

use crate::llm::LLMClient;
use crate::research::events::ProgressSink;
use crate::research::text::{self, REASONING_CLOSE};
use crate::types::{AppError, Result};
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Models that only emit a reasoning trace when asked to
const REASONING_TOGGLE_MODEL: &str = "nemotron";
const REASONING_TOGGLE_PROMPT: &str = "detailed thinking on";

/// System prompt needed for `model` to produce a reasoning trace, if any
pub fn system_prompt_for(model: &str) -> Option<&'static str> {
    model
        .to_lowercase()
        .contains(REASONING_TOGGLE_MODEL)
        .then_some(REASONING_TOGGLE_PROMPT)
}

/// Success and failure counts per provider kind over one run
#[derive(Debug, Default)]
pub struct ProviderHealth {
    completion_ok: AtomicUsize,
    completion_failed: AtomicUsize,
    search_ok: AtomicUsize,
    search_failed: AtomicUsize,
}

impl ProviderHealth {
    pub fn record_completion(&self, ok: bool) {
        let counter = if ok {
            &self.completion_ok
        } else {
            &self.completion_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_search(&self, ok: bool) {
        let counter = if ok {
            &self.search_ok
        } else {
            &self.search_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Describes the outage when every call of one kind failed
    pub fn outage(&self) -> Option<String> {
        let completion_ok = self.completion_ok.load(Ordering::Relaxed);
        let completion_failed = self.completion_failed.load(Ordering::Relaxed);
        if completion_ok == 0 && completion_failed > 0 {
            return Some(format!(
                "all {} completion calls failed",
                completion_failed
            ));
        }

        let search_ok = self.search_ok.load(Ordering::Relaxed);
        let search_failed = self.search_failed.load(Ordering::Relaxed);
        if search_ok == 0 && search_failed > 0 {
            return Some(format!("all {} search calls failed", search_failed));
        }

        None
    }
}

#[derive(Debug, Clone)]
pub struct StageContext {
    pub events: ProgressSink,
    pub health: Arc<ProviderHealth>,
    /// Bound on each individual provider call
    pub timeout: Duration,
    pub require_reasoning_trace: bool,
}

impl StageContext {
    pub fn new(events: ProgressSink, timeout: Duration, require_reasoning_trace: bool) -> Self {
        Self {
            events,
            health: Arc::new(ProviderHealth::default()),
            timeout,
            require_reasoning_trace,
        }
    }

    /// Payload of a structured stage's output, honoring the trace setting
    pub fn structured_payload(&self, raw: &str) -> Option<String> {
        text::structured_payload(raw, self.require_reasoning_trace)
    }

    /// One completion call bounded by `limit`, counted toward provider health
    pub async fn complete(&self, llm: &dyn LLMClient, prompt: &str, limit: Duration) -> Result<String> {
        let call = async {
            match system_prompt_for(llm.model_name()) {
                Some(system) => llm.generate_with_system(system, prompt).await,
                None => llm.generate(prompt).await,
            }
        };

        let result = bounded(limit, "completion", call).await;
        self.health.record_completion(result.is_ok());
        result
    }

    /// Streamed completion; reasoning chunks are forwarded as progress
    /// events under `stage` until the closing delimiter appears.
    pub async fn complete_streaming(
        &self,
        llm: &dyn LLMClient,
        prompt: &str,
        stage: &str,
        limit: Duration,
    ) -> Result<String> {
        let call = async {
            let mut stream = match system_prompt_for(llm.model_name()) {
                Some(system) => llm.stream_with_system(system, prompt).await?,
                None => llm.stream(prompt).await?,
            };

            let mut buffer = String::new();
            let mut reasoning_done = false;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                let scanned = buffer.len();
                buffer.push_str(&chunk);
                if !reasoning_done {
                    if reasoning_closed_since(&buffer, scanned) {
                        reasoning_done = true;
                    } else {
                        self.events.emit(stage, chunk);
                    }
                }
            }

            Ok::<String, AppError>(buffer)
        };

        let result = bounded(limit, "streamed completion", call).await;
        self.health.record_completion(result.is_ok());
        result
    }

    /// Record a search call's outcome and pass it through
    pub fn track_search<T>(&self, result: Result<T>) -> Result<T> {
        self.health.record_search(result.is_ok());
        result
    }
}

/// Whether the reasoning delimiter appears in `buffer` past byte `scanned`,
/// including one split across the previous chunk boundary
fn reasoning_closed_since(buffer: &str, scanned: usize) -> bool {
    let needle = REASONING_CLOSE.as_bytes();
    let start = scanned.saturating_sub(needle.len() - 1).min(buffer.len());
    buffer.as_bytes()[start..]
        .windows(needle.len())
        .any(|window| window == needle)
}

/// Run `fut` under `limit`, turning expiry into [`AppError::Timeout`]
pub async fn bounded<T, F>(limit: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(format!(
            "{} exceeded {:?}",
            what, limit
        ))),
    }
}
