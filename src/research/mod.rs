//! Iterative Research Synthesis
//!
//! This module turns a topic and an outline into a cited markdown report by
//! running queries against a knowledge base, judging the answers, drafting
//! section content, and filling knowledge gaps found on reflection.
//!
//! # Architecture
//!
//! The pipeline is a small state machine owned by one controller:
//! - [`pipeline::PipelineController`] - Sequences the stages and owns all per-run state
//! - [`fanout::ResearchFanOut`] - Researches a batch of queries concurrently
//! - [`sections::SectionWriter`] - Drafts sections against their own citations
//! - [`reflection::Reflector`] - Produces follow-up queries for gaps in the draft
//!
//! # Usage
//!
//! ```ignore
//! use dossier::research::services::ResearchServices;
//! use dossier::research::events::ProgressSink;
//!
//! let services = ResearchServices::from_config(&config).await?;
//! let report = services
//!     .controller(&config)
//!     .run(&request, ProgressSink::disabled())
//!     .await?;
//!
//! println!("{}", report.markdown);
//! ```
//!
//! # Research Workflow
//!
//! 1. **Planning** - Generate queries for the outline's sections
//! 2. **Research** - Knowledge-base search, relevancy gate, web fallback
//! 3. **Citation** - Number every answer with a run-wide source id
//! 4. **Writing** - Draft each section, citing only its own sources
//! 5. **Reflection** - One round of gap-filling queries, then the summary

/// Questions and rewrites against a finished report.
pub mod artifact;
/// Source ids and the citation document.
pub mod citations;
/// Per-run timeouts and provider health.
pub mod context;
/// Progress events.
pub mod events;
/// Evidence records and the web fallback threshold.
pub mod evidence;
/// Concurrent per-query research.
pub mod fanout;
/// The stage state machine.
pub mod pipeline;
/// Initial query planning.
pub mod planner;
pub mod prompts;
/// Queries and their origin.
pub mod query;
/// Follow-up queries for knowledge gaps.
pub mod reflection;
/// Fail-open relevancy judgment.
pub mod relevancy;
/// Report sections and drafting.
pub mod sections;
/// Shared clients and stage wiring.
pub mod services;
/// Ordered join over spawned tasks.
pub mod task_group;
pub mod text;

pub use pipeline::{PipelineController, PipelineSettings, ResearchReport, Stage};
pub use query::{Query, QueryOrigin};
pub use services::{Collaborators, ResearchServices};
