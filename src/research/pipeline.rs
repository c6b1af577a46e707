//! The research pipeline state machine.
//!
//! ```text
//! GenerateQueries -> Research -> Write -> Reflect -> Research -> Write -> Finalize -> Terminal
//!                                     \-> Finalize
//! ```
//!
//! The controller owns [`PipelineState`] for one request. Stages borrow what
//! they need and hand back values the controller merges between stages, so
//! the citation counter only ever advances at one point per batch.
//!
//! After `Write` the controller looks at the first query of the batch it
//! just wrote: a reflection query means the gap-filling round is done and
//! the report is finalized, anything else goes to `Reflect`. There is no
//! round counter, so at most one reflection round runs per report; the
//! reflection count only decides how many follow-up queries that round asks.

use crate::research::citations::{CitationDocument, CitationRegistry};
use crate::research::context::StageContext;
use crate::research::events::{ProgressSink, keys};
use crate::research::evidence::EvidenceRecord;
use crate::research::fanout::ResearchOptions;
use crate::research::prompts;
use crate::research::query::Query;
use crate::research::sections::Sections;
use crate::research::services::ResearchServices;
use crate::research::text::strip_reasoning;
use crate::types::{
    AppError, GenerateQueriesRequest, ReportRequest, ReportResponse, Result, SourceSummary,
};
use crate::utils::toml_config::DossierConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    GenerateQueries,
    Research,
    Write,
    Reflect,
    Finalize,
    Terminal,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::GenerateQueries => "generate_queries",
            Stage::Research => "research",
            Stage::Write => "write",
            Stage::Reflect => "reflect",
            Stage::Finalize => "finalize",
            Stage::Terminal => "terminal",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where to go once a batch has been written
pub fn next_after_write(batch: &[Query]) -> Stage {
    match batch.first() {
        Some(query) if !query.is_reflection() => Stage::Reflect,
        _ => Stage::Finalize,
    }
}

/// Per-run knobs, taken from config and overridden by the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub timeout: Duration,
    pub finalize_timeout: Duration,
    pub num_queries: usize,
    pub reflection_rounds: usize,
    pub search_web: bool,
    pub require_reasoning_trace: bool,
    pub collection: String,
}

impl PipelineSettings {
    pub fn from_config(config: &DossierConfig) -> Self {
        let research = &config.research;
        Self {
            timeout: research.base_timeout(),
            finalize_timeout: research.finalize_timeout(),
            num_queries: research.num_queries,
            reflection_rounds: research.reflection_rounds,
            search_web: research.search_web,
            require_reasoning_trace: research.require_reasoning_trace,
            collection: config.knowledge_base.default_collection.clone(),
        }
    }

    pub fn for_request(&self, request: &ReportRequest) -> Self {
        Self {
            num_queries: request.num_queries.unwrap_or(self.num_queries),
            reflection_rounds: request.reflection_count.unwrap_or(self.reflection_rounds),
            search_web: request.search_web.unwrap_or(self.search_web),
            collection: request
                .rag_collection
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| self.collection.clone()),
            ..self.clone()
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&DossierConfig::default())
    }
}

/// Everything one report run accumulates
#[derive(Debug, Default)]
pub struct PipelineState {
    /// The batch currently moving through Research and Write
    pub queries: Vec<Query>,
    pub evidence: Vec<EvidenceRecord>,
    pub sections: Sections,
    pub citations: CitationDocument,
    pub registry: CitationRegistry,
    pub draft_report: String,
    /// Citations registered for the current batch only
    latest_batch: CitationDocument,
    sections_before_batch: usize,
}

impl PipelineState {
    fn with_queries(queries: Vec<Query>) -> Self {
        Self {
            queries,
            ..Self::default()
        }
    }

    /// Register a researched batch: ids, citations and any new sections
    fn absorb(&mut self, evidence: Vec<EvidenceRecord>) {
        let batch = self.registry.register(&evidence);
        self.sections_before_batch = self.sections.len();
        for query in &self.queries {
            self.sections.ensure(&query.section);
        }
        self.citations.merge(batch.clone());
        self.latest_batch = CitationDocument::from_citations(batch);
        self.evidence.extend(evidence);
    }

    /// Sections the current batch touches, in report order
    fn batch_targets(&self) -> Vec<String> {
        self.sections
            .names()
            .into_iter()
            .filter(|name| self.queries.iter().any(|q| q.section == *name))
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ResearchReport {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub title: String,
    pub executive_summary: Option<String>,
    pub sections: Sections,
    pub sources: CitationDocument,
    pub evidence: Vec<EvidenceRecord>,
    pub trace: Vec<Stage>,
    pub markdown: String,
    pub duration: Duration,
}

impl ResearchReport {
    pub fn to_response(&self) -> ReportResponse {
        ReportResponse {
            id: self.id,
            generated_at: self.generated_at,
            title: self.title.clone(),
            final_report: self.markdown.clone(),
            sections: self.sections.names().into_iter().map(str::to_string).collect(),
            sources: self
                .sources
                .entries()
                .iter()
                .map(|c| SourceSummary {
                    id: c.id.0,
                    section: c.section.clone(),
                    query: c.query.clone(),
                })
                .collect(),
            stages: self.trace.iter().map(|s| s.as_str().to_string()).collect(),
            duration_ms: self.duration.as_millis() as u64,
        }
    }
}

/// Assemble the final markdown document
pub fn compose_report(
    title: &str,
    executive_summary: Option<&str>,
    sections: &Sections,
    sources: &CitationDocument,
) -> String {
    let mut parts = vec![format!("# {}", title)];
    if let Some(summary) = executive_summary {
        parts.push(format!("## Executive Summary\n\n{}", summary.trim()));
    }
    if !sections.is_empty() {
        parts.push(sections.render_markdown());
    }
    parts.push(sources.to_markdown().trim_end().to_string());
    parts.join("\n\n") + "\n"
}

pub struct PipelineController {
    services: ResearchServices,
    settings: PipelineSettings,
}

impl PipelineController {
    pub fn new(services: ResearchServices, settings: PipelineSettings) -> Self {
        Self { services, settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run only the planning stage
    pub async fn generate_queries(
        &self,
        request: &GenerateQueriesRequest,
        events: ProgressSink,
    ) -> Result<Vec<Query>> {
        validate_topic(&request.topic, &request.report_organization)?;
        let ctx = self.context(&self.settings, events);
        let queries = self
            .services
            .planner
            .generate(
                &ctx,
                &request.topic,
                &request.report_organization,
                request.num_queries.unwrap_or(self.settings.num_queries),
            )
            .await;

        match ctx.health.outage() {
            Some(outage) => Err(AppError::ProviderUnavailable(outage)),
            None => Ok(queries),
        }
    }

    /// Drive one report from the initial stage to `Terminal`
    pub async fn run(&self, request: &ReportRequest, events: ProgressSink) -> Result<ResearchReport> {
        validate_topic(&request.topic, &request.report_organization)?;

        let id = Uuid::new_v4();
        let started = Instant::now();
        let settings = self.settings.for_request(request);
        let ctx = self.context(&settings, events);
        let options = ResearchOptions {
            collection: settings.collection.clone(),
            search_web: settings.search_web,
        };
        let topic = request.topic.trim();
        let outline = request.report_organization.as_str();

        let (mut state, mut stage) = match &request.queries {
            Some(queries) if !queries.is_empty() => {
                (PipelineState::with_queries(queries.clone()), Stage::Research)
            }
            _ => (PipelineState::default(), Stage::GenerateQueries),
        };
        let mut trace = Vec::new();
        let mut executive_summary = None;

        while stage != Stage::Terminal {
            info!(report_id = %id, %stage, batch = state.queries.len(), "Pipeline stage");
            trace.push(stage);

            stage = match stage {
                Stage::GenerateQueries => {
                    state.queries = self
                        .services
                        .planner
                        .generate(&ctx, topic, outline, settings.num_queries)
                        .await;
                    Stage::Research
                }
                Stage::Research => {
                    let evidence = self
                        .services
                        .fanout
                        .research(&ctx, &state.queries, &options)
                        .await;
                    state.absorb(evidence);
                    Stage::Write
                }
                Stage::Write => {
                    let targets = state.batch_targets();
                    let drafts = self
                        .services
                        .writer
                        .write(&ctx, topic, &state.sections, &state.latest_batch, &targets)
                        .await;
                    state.sections.apply_drafts(drafts);

                    let next = next_after_write(&state.queries);
                    if state.queries.first().is_some_and(Query::is_reflection) {
                        state.sections.splice_new(state.sections_before_batch);
                    }
                    state.draft_report = state.sections.render_markdown();
                    next
                }
                Stage::Reflect => {
                    state.queries = self
                        .services
                        .reflector
                        .reflect(&ctx, topic, outline, &state.draft_report, settings.reflection_rounds)
                        .await;
                    Stage::Research
                }
                Stage::Finalize => {
                    executive_summary = self.summarize(&ctx, &settings, topic, outline, &state).await;
                    Stage::Terminal
                }
                Stage::Terminal => Stage::Terminal,
            };
        }

        if let Some(outage) = ctx.health.outage() {
            warn!(%outage, "Provider unavailable for the whole run");
            return Err(AppError::ProviderUnavailable(outage));
        }

        let markdown = compose_report(
            topic,
            executive_summary.as_deref(),
            &state.sections,
            &state.citations,
        );
        info!(
            report_id = %id,
            sources = state.citations.len(),
            sections = state.sections.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Report complete"
        );

        Ok(ResearchReport {
            id,
            generated_at: Utc::now(),
            title: topic.to_string(),
            executive_summary,
            sections: state.sections,
            sources: state.citations,
            evidence: state.evidence,
            trace,
            markdown,
            duration: started.elapsed(),
        })
    }

    async fn summarize(
        &self,
        ctx: &StageContext,
        settings: &PipelineSettings,
        topic: &str,
        outline: &str,
        state: &PipelineState,
    ) -> Option<String> {
        let prompt = prompts::executive_summary(topic, outline, &state.draft_report);
        match ctx
            .complete_streaming(
                self.services.summarizer.as_ref(),
                &prompt,
                keys::FINALIZE,
                settings.finalize_timeout,
            )
            .await
        {
            Ok(raw) => {
                let summary = strip_reasoning(&raw);
                (!summary.is_empty()).then_some(summary)
            }
            Err(e) => {
                warn!(error = %e, "Executive summary failed, emitting report without it");
                None
            }
        }
    }

    fn context(&self, settings: &PipelineSettings, events: ProgressSink) -> StageContext {
        StageContext::new(events, settings.timeout, settings.require_reasoning_trace)
    }
}

fn validate_topic(topic: &str, report_organization: &str) -> Result<()> {
    if topic.trim().is_empty() {
        return Err(AppError::InvalidInput("topic must not be empty".to_string()));
    }
    if report_organization.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "report_organization must not be empty".to_string(),
        ));
    }
    Ok(())
}
