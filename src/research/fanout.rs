//! Concurrent per-query research.
//!
//! Every query in a batch runs as its own task: knowledge-base search, then
//! the relevancy gate, then (only for irrelevant answers, and only when the
//! request allows it) a web fallback. Records come back in query order.
//! Nothing here fails the batch; provider errors turn into placeholder text
//! on the affected record.

use crate::research::context::{StageContext, bounded};
use crate::research::events::keys;
use crate::research::evidence::{EvidenceRecord, FallbackEvidence, Relevancy};
use crate::research::query::Query;
use crate::research::relevancy::RelevancyGate;
use crate::research::task_group::OrderedTaskGroup;
use crate::tools::knowledge_base::KnowledgeBase;
use crate::tools::web_search::{WebResult, WebSearch, domain_of};
use crate::utils::toml_config::WebSearchConfig;
use std::sync::Arc;
use tracing::{info, warn};

/// Include-domains are sent to the web provider at most this many at a time
const DOMAIN_CHUNK: usize = 5;
/// Searches per query when no include-domains are configured
const DIVERSIFY_ROUNDS: usize = 2;

#[derive(Debug, Clone)]
pub struct ResearchOptions {
    pub collection: String,
    pub search_web: bool,
}

#[derive(Debug, Clone)]
pub struct WebFallbackSettings {
    pub max_results: usize,
    pub include_domains: Vec<String>,
}

impl From<&WebSearchConfig> for WebFallbackSettings {
    fn from(config: &WebSearchConfig) -> Self {
        Self {
            max_results: config.max_results,
            include_domains: config.include_domains.clone(),
        }
    }
}

impl Default for WebFallbackSettings {
    fn default() -> Self {
        Self::from(&WebSearchConfig::default())
    }
}

#[derive(Clone)]
pub struct ResearchFanOut {
    knowledge_base: Arc<dyn KnowledgeBase>,
    web: Arc<dyn WebSearch>,
    gate: RelevancyGate,
    web_settings: Arc<WebFallbackSettings>,
}

impl ResearchFanOut {
    pub fn new(
        knowledge_base: Arc<dyn KnowledgeBase>,
        web: Arc<dyn WebSearch>,
        gate: RelevancyGate,
        web_settings: WebFallbackSettings,
    ) -> Self {
        Self {
            knowledge_base,
            web,
            gate,
            web_settings: Arc::new(web_settings),
        }
    }

    /// Research every query concurrently; `result[i]` answers `queries[i]`
    pub async fn research(
        &self,
        ctx: &StageContext,
        queries: &[Query],
        options: &ResearchOptions,
    ) -> Vec<EvidenceRecord> {
        info!(queries = queries.len(), search_web = options.search_web, "Researching batch");

        let mut group = OrderedTaskGroup::new();
        for query in queries {
            let this = self.clone();
            let ctx = ctx.clone();
            let query = query.clone();
            let options = options.clone();
            group.spawn(async move { this.resolve(&ctx, query, &options).await });
        }

        group
            .join_or_else(|i, e| {
                warn!(query = %queries[i].text, error = %e, "Research task aborted");
                EvidenceRecord::placeholder(queries[i].clone(), &format!("task aborted: {}", e))
            })
            .await
    }

    async fn resolve(&self, ctx: &StageContext, query: Query, options: &ResearchOptions) -> EvidenceRecord {
        let primary = ctx.track_search(
            bounded(
                ctx.timeout,
                "knowledge base search",
                self.knowledge_base.search(&query.text, &options.collection),
            )
            .await,
        );

        let (primary_answer, primary_citation) = match primary {
            Ok(found) => (found.answer, found.citation),
            Err(e) => {
                warn!(query = %query.text, error = %e, "Knowledge base search failed");
                (format!("Knowledge base search failed: {}", e), String::new())
            }
        };
        ctx.events.emit(
            keys::RAG_ANSWER,
            format!("QUERY: {}\nANSWER: {}", query.text, primary_answer),
        );

        let relevancy = self.gate.check(ctx, &query.text, &primary_answer).await;

        let fallback = if relevancy == Relevancy::No && options.search_web {
            Some(self.fallback_search(ctx, &query.text).await)
        } else {
            None
        };

        EvidenceRecord {
            query,
            primary_answer,
            primary_citation,
            relevancy,
            fallback,
        }
    }

    /// Web fallback, spread across domains so results are not all from one site
    async fn fallback_search(&self, ctx: &StageContext, query: &str) -> FallbackEvidence {
        let mut results = Vec::new();

        if self.web_settings.include_domains.is_empty() {
            let mut seen: Vec<String> = Vec::new();
            for _ in 0..DIVERSIFY_ROUNDS {
                if let Some(found) = self.web_call(ctx, query, &[], &seen).await {
                    for domain in found.iter().filter_map(|r| domain_of(&r.url)) {
                        if !seen.contains(&domain) {
                            seen.push(domain);
                        }
                    }
                    results.extend(found);
                }
            }
        } else {
            for chunk in self.web_settings.include_domains.chunks(DOMAIN_CHUNK) {
                if let Some(found) = self.web_call(ctx, query, chunk, &[]).await {
                    results.extend(found);
                }
            }
        }

        let fallback = FallbackEvidence::from_web_results(&results);
        ctx.events.emit(
            keys::WEB_ANSWER,
            fallback
                .citation
                .clone()
                .unwrap_or_else(|| fallback.answer.clone()),
        );
        fallback
    }

    async fn web_call(
        &self,
        ctx: &StageContext,
        query: &str,
        include: &[String],
        exclude: &[String],
    ) -> Option<Vec<WebResult>> {
        let result = ctx.track_search(
            bounded(
                ctx.timeout,
                "web search",
                self.web
                    .search(query, self.web_settings.max_results, include, exclude),
            )
            .await,
        );

        match result {
            Ok(found) => Some(found),
            Err(e) => {
                warn!(query, error = %e, "Web search call failed");
                ctx.events
                    .emit(keys::WEB_ANSWER, format!("Web search for '{}' failed: {}", query, e));
                None
            }
        }
    }
}
