//! Initial query planning from topic and outline.

use crate::llm::LLMClient;
use crate::research::context::StageContext;
use crate::research::events::keys;
use crate::research::prompts;
use crate::research::query::{Query, QueryOrigin};
use crate::research::text::parse_json_markdown;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct QueryPlanner {
    llm: Arc<dyn LLMClient>,
}

impl QueryPlanner {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    /// Plan up to `num_queries` queries. Any failure yields an empty list.
    pub async fn generate(
        &self,
        ctx: &StageContext,
        topic: &str,
        report_organization: &str,
        num_queries: usize,
    ) -> Vec<Query> {
        let prompt = prompts::query_planner(topic, report_organization, num_queries);

        let raw = match ctx
            .complete_streaming(self.llm.as_ref(), &prompt, keys::GENERATE_QUERIES, ctx.timeout)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Query planning failed");
                return Vec::new();
            }
        };

        let queries = parse_plan(ctx.structured_payload(&raw));
        info!(count = queries.len(), "Planned queries");
        queries
    }
}

/// Queries from a planner payload; `None` or malformed JSON gives none
pub fn parse_plan(payload: Option<String>) -> Vec<Query> {
    let Some(payload) = payload else {
        warn!("Planner output has no reasoning trace");
        return Vec::new();
    };

    match parse_json_markdown::<Vec<Query>>(&payload) {
        Ok(queries) => queries
            .into_iter()
            .filter(|q| !q.text.trim().is_empty())
            .map(|q| Query {
                origin: QueryOrigin::Initial,
                ..q
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, "Planner output is not a query list");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan() {
        let payload = r#"```json
[
  {"query": "What is solar PV?", "report_section": "Introduction", "rationale": "basics"},
  {"query": "Wind capacity 2024", "report_section": "Wind", "rationale": "data"}
]
```"#;
        let queries = parse_plan(Some(payload.to_string()));
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].section, "Introduction");
        assert_eq!(queries[1].text, "Wind capacity 2024");
        assert!(queries.iter().all(|q| !q.is_reflection()));
    }

    #[test]
    fn test_parse_plan_fills_missing_sections() {
        let payload = r#"[
  {"query": "Battery prices", "report_section": ""},
  {"query": "Grid inertia"}
]"#;
        let queries = parse_plan(Some(payload.to_string()));
        assert_eq!(queries.len(), 2);
        assert!(queries
            .iter()
            .all(|q| q.section == crate::research::query::UNASSIGNED_SECTION));
    }

    #[test]
    fn test_parse_plan_failures_are_empty() {
        assert!(parse_plan(None).is_empty());
        assert!(parse_plan(Some("I could not think of anything".into())).is_empty());
        assert!(parse_plan(Some("{\"query\": \"single object\"}".into())).is_empty());
    }
}
