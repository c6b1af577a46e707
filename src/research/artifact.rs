//! Questions and rewrites against a finished report.

use crate::llm::LLMClient;
use crate::research::context::{StageContext, bounded};
use crate::research::prompts;
use crate::research::text::{parse_json_markdown, strip_reasoning};
use crate::tools::knowledge_base::KnowledgeBase;
use crate::types::{AppError, ArtifactQaRequest, ArtifactQaResponse, Result, RewriteMode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const OUT_OF_SCOPE_REPLY: &str =
    "Sorry, I am not able to help answer that question. Please try again.";
pub const REWRITE_REPLY: &str = "Here is the updated artifact (entire rewrite).";

#[derive(Debug, Deserialize)]
struct GuardrailVerdict {
    relevant: Option<String>,
}

/// An unparseable or missing verdict is out of scope
pub fn parse_guardrail(raw: &str) -> bool {
    parse_json_markdown::<GuardrailVerdict>(&strip_reasoning(raw))
        .ok()
        .and_then(|v| v.relevant)
        .map(|r| r.trim().eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

#[derive(Clone)]
pub struct ArtifactQa {
    llm: Arc<dyn LLMClient>,
    knowledge_base: Arc<dyn KnowledgeBase>,
    guardrail: bool,
    default_collection: String,
}

impl ArtifactQa {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        knowledge_base: Arc<dyn KnowledgeBase>,
        guardrail: bool,
        default_collection: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            knowledge_base,
            guardrail,
            default_collection: default_collection.into(),
        }
    }

    pub async fn answer(&self, ctx: &StageContext, input: ArtifactQaRequest) -> Result<ArtifactQaResponse> {
        if input.question.trim().is_empty() {
            return Err(AppError::InvalidInput("question must not be empty".to_string()));
        }

        if self.guardrail && !self.in_scope(ctx, &input).await? {
            info!(question = %input.question, "Question rejected by guardrail");
            return Ok(ArtifactQaResponse {
                assistant_reply: OUT_OF_SCOPE_REPLY.to_string(),
                updated_artifact: Some(input.artifact),
            });
        }

        let request = self.with_context(ctx, &input).await;

        match input.rewrite_mode {
            Some(RewriteMode::Entire) => {
                let prompt = prompts::artifact_rewrite(&input.artifact, &request);
                let raw = ctx.complete(self.llm.as_ref(), &prompt, ctx.timeout).await?;
                Ok(ArtifactQaResponse {
                    assistant_reply: REWRITE_REPLY.to_string(),
                    updated_artifact: Some(strip_reasoning(&raw)),
                })
            }
            None => {
                let messages = chat_messages(&input.artifact, &input.chat_history, &request);
                let raw = bounded(
                    ctx.timeout,
                    "artifact chat",
                    self.llm.generate_with_history(&messages),
                )
                .await?;
                Ok(ArtifactQaResponse {
                    assistant_reply: strip_reasoning(&raw),
                    updated_artifact: Some(input.artifact),
                })
            }
        }
    }

    async fn in_scope(&self, ctx: &StageContext, input: &ArtifactQaRequest) -> Result<bool> {
        let prompt = prompts::artifact_guardrail(&input.question, &input.artifact);
        let raw = ctx.complete(self.llm.as_ref(), &prompt, ctx.timeout).await?;
        Ok(parse_guardrail(&raw))
    }

    /// The question plus knowledge-base context and caller-supplied context
    async fn with_context(&self, ctx: &StageContext, input: &ArtifactQaRequest) -> String {
        let collection = input
            .rag_collection
            .as_deref()
            .unwrap_or(&self.default_collection);
        let mut request = input.question.clone();

        match bounded(
            ctx.timeout,
            "knowledge base search",
            self.knowledge_base.search(&input.question, collection),
        )
        .await
        {
            Ok(found) => {
                debug!(collection, "Adding knowledge base context to question");
                request.push_str("\n\n --- ADDITIONAL CONTEXT --- \n");
                request.push_str(&format!(
                    "QUERY: {}\nANSWER: {}\nCITATION: {}",
                    input.question, found.answer, found.citation
                ));
            }
            Err(e) => warn!(collection, error = %e, "Knowledge base lookup for question failed"),
        }

        if let Some(extra) = input.additional_context.as_deref().filter(|c| !c.trim().is_empty()) {
            request.push_str("\n\nAdditional context:\n");
            request.push_str(extra);
        }

        request
    }
}

/// Artifact context first, then history alternating user/assistant, then
/// the question
pub fn chat_messages(artifact: &str, history: &[String], question: &str) -> Vec<(String, String)> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(("user".to_string(), prompts::artifact_chat_context(artifact)));
    for (i, turn) in history.iter().enumerate() {
        let role = if i % 2 == 0 { "user" } else { "assistant" };
        messages.push((role.to_string(), turn.clone()));
    }
    messages.push(("user".to_string(), question.to_string()));
    messages
}
