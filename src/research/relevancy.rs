//! Binary relevancy gate on knowledge-base answers.
//!
//! The gate fails open: anything short of a clean `"no"` verdict counts as
//! relevant, so a flaky judge never triggers extra web searches.

use crate::llm::LLMClient;
use crate::research::context::StageContext;
use crate::research::events::keys;
use crate::research::evidence::Relevancy;
use crate::research::prompts;
use crate::research::text::{parse_json_markdown, strip_reasoning};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Verdict {
    score: Option<String>,
}

#[derive(Clone)]
pub struct RelevancyGate {
    llm: Arc<dyn LLMClient>,
}

impl RelevancyGate {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    pub async fn check(&self, ctx: &StageContext, query: &str, answer: &str) -> Relevancy {
        let prompt = prompts::relevancy_check(query, answer);

        let raw = match ctx.complete(self.llm.as_ref(), &prompt, ctx.timeout).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(query, error = %e, "Relevancy check failed, treating answer as relevant");
                ctx.events
                    .emit(keys::RELEVANCY, format!("Relevancy check failed for '{}': {}", query, e));
                return Relevancy::Yes;
            }
        };

        let relevancy = parse_verdict(&raw);
        tracing::debug!(query, ?relevancy, "Relevancy verdict");
        ctx.events.emit(
            keys::RELEVANCY,
            format!("Relevancy score: {:?}\nQuery: {}", relevancy, query),
        );
        relevancy
    }
}

/// Only an explicit `"no"` is irrelevant
pub fn parse_verdict(raw: &str) -> Relevancy {
    let verdict: Option<Verdict> = parse_json_markdown(&strip_reasoning(raw)).ok();

    match verdict.and_then(|v| v.score) {
        Some(score) if score.trim().eq_ignore_ascii_case("no") => Relevancy::No,
        _ => Relevancy::Yes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("```json\n{\"score\": \"no\"}\n```", Relevancy::No)]
    #[case("<think>hmm</think>{\"score\": \"No\"}", Relevancy::No)]
    #[case("{\"score\": \"yes\"}", Relevancy::Yes)]
    #[case("{\"score\": \"maybe\"}", Relevancy::Yes)]
    #[case("{\"verdict\": \"no\"}", Relevancy::Yes)]
    #[case("I cannot decide", Relevancy::Yes)]
    #[case("", Relevancy::Yes)]
    fn test_parse_verdict_fails_open(#[case] raw: &str, #[case] expected: Relevancy) {
        assert_eq!(parse_verdict(raw), expected);
    }
}
