//! Gap finding over the current draft.

use crate::llm::LLMClient;
use crate::research::context::StageContext;
use crate::research::events::keys;
use crate::research::prompts;
use crate::research::query::{Query, UNASSIGNED_SECTION};
use crate::research::text::parse_json_markdown;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ReflectionOutput {
    query: String,
    #[serde(default, alias = "section")]
    report_section: String,
}

#[derive(Clone)]
pub struct Reflector {
    llm: Arc<dyn LLMClient>,
}

impl Reflector {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    /// Run `rounds` sequential reflection calls over `report`, one follow-up
    /// query per successful call. Failed calls are skipped.
    pub async fn reflect(
        &self,
        ctx: &StageContext,
        topic: &str,
        report_organization: &str,
        report: &str,
        rounds: usize,
    ) -> Vec<Query> {
        let prompt = prompts::reflection(topic, report_organization, report);
        let mut queries = Vec::with_capacity(rounds);

        for round in 0..rounds {
            match ctx
                .complete_streaming(self.llm.as_ref(), &prompt, keys::REFLECT, ctx.timeout)
                .await
            {
                Ok(raw) => {
                    let query = parse_reflection(&raw, ctx.structured_payload(&raw));
                    tracing::info!(round, query = %query.text, section = %query.section, "Reflection query");
                    queries.push(query);
                }
                Err(e) => tracing::warn!(round, error = %e, "Reflection call failed, skipping"),
            }
        }

        queries
    }
}

/// Turn one reflection output into a query. When the payload is missing or
/// is not the expected JSON, the raw text stands in for query and section.
/// A parsed query without a section goes to [`UNASSIGNED_SECTION`].
pub fn parse_reflection(raw: &str, payload: Option<String>) -> Query {
    let parsed = payload
        .as_deref()
        .and_then(|p| parse_json_markdown::<ReflectionOutput>(p).ok())
        .filter(|out| !out.query.trim().is_empty());

    match parsed {
        Some(out) => {
            let section = match out.report_section.trim() {
                "" => UNASSIGNED_SECTION,
                name => name,
            };
            Query::reflection(out.query.trim(), section)
        }
        None => {
            let text = payload.unwrap_or_else(|| raw.trim().to_string());
            Query::reflection(text.clone(), text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::query::{QueryOrigin, REFLECTION_RATIONALE};

    #[test]
    fn test_parse_reflection_json() {
        let payload = r#"```json
{"query": "What is the cost of offshore wind?", "report_section": "Economics", "rationale": "missing"}
```"#;
        let query = parse_reflection(payload, Some(payload.to_string()));
        assert_eq!(query.text, "What is the cost of offshore wind?");
        assert_eq!(query.section, "Economics");
        assert_eq!(query.rationale, REFLECTION_RATIONALE);
        assert_eq!(query.origin, QueryOrigin::Reflection);
    }

    #[test]
    fn test_parse_reflection_keeps_query_without_section() {
        let payload = r#"{"query": "offshore wind costs"}"#;
        let query = parse_reflection(payload, Some(payload.to_string()));
        assert_eq!(query.text, "offshore wind costs");
        assert_eq!(query.section, UNASSIGNED_SECTION);
        assert!(query.is_reflection());

        let blank = r#"{"query": "grid storage", "report_section": " "}"#;
        let query = parse_reflection(blank, Some(blank.to_string()));
        assert_eq!(query.text, "grid storage");
        assert_eq!(query.section, UNASSIGNED_SECTION);
    }

    #[test]
    fn test_parse_reflection_falls_back_to_payload() {
        let query = parse_reflection("ignored", Some("not json at all".to_string()));
        assert_eq!(query.text, "not json at all");
        assert_eq!(query.section, "not json at all");
        assert!(query.is_reflection());
    }

    #[test]
    fn test_parse_reflection_without_payload_uses_raw() {
        let query = parse_reflection("  plain text  ", None);
        assert_eq!(query.text, "plain text");
        assert_eq!(query.section, "plain text");
    }
}
