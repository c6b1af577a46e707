//! # Dossier - Iterative Research Synthesis
//!
//! Dossier writes structured, cited research reports. Given a topic and an
//! outline it plans search queries, researches them against a knowledge base
//! (falling back to web search when the knowledge base has nothing
//! relevant), drafts each section from its own sources, reflects on the
//! draft to fill knowledge gaps, and finishes with an executive summary and
//! a numbered sources appendix.
//!
//! ## Overview
//!
//! Dossier can be used in two ways:
//!
//! 1. **As a standalone server or CLI** - Run the `dossier` binary
//! 2. **As a library** - Embed the research pipeline in your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use dossier::{DossierConfigManager, ResearchServices};
//! use dossier::research::events::ProgressSink;
//! use dossier::types::ReportRequest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = DossierConfigManager::new("dossier.toml")?;
//!     let config = manager.config();
//!     let services = ResearchServices::from_config(&config).await?;
//!
//!     let request = ReportRequest {
//!         topic: "Renewable Energy".into(),
//!         report_organization: "Current State, Challenges, Solutions".into(),
//!         queries: None,
//!         num_queries: None,
//!         search_web: None,
//!         rag_collection: None,
//!         reflection_count: None,
//!     };
//!     let report = services
//!         .controller(&config)
//!         .run(&request, ProgressSink::disabled())
//!         .await?;
//!     println!("{}", report.markdown);
//!     Ok(())
//! }
//! ```
//!
//! ### Custom Collaborators
//!
//! Every external service sits behind a trait ([`LLMClient`],
//! [`tools::KnowledgeBase`], [`tools::WebSearch`]), so alternative backends
//! plug in through [`research::Collaborators`].
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI-compatible API support |
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`cli`] - Command-line interface
//! - [`llm`] - LLM client implementations
//! - [`research`] - The research pipeline
//! - [`tools`] - Knowledge-base and web search clients
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration loading and hot reload

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Iterative research pipeline.
pub mod research;
/// Knowledge-base and web search providers.
pub mod tools;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use llm::{LLMClient, Provider, ProviderRegistry};
pub use research::{PipelineController, ResearchReport, ResearchServices};
pub use types::{AppError, Result};
pub use utils::toml_config::{DossierConfig, DossierConfigManager};

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML configuration with hot-reload support
    pub config_manager: Arc<DossierConfigManager>,
    /// Provider clients and pipeline stages
    pub services: ResearchServices,
}

impl AppState {
    /// A pipeline controller using the configuration as of now
    pub fn controller(&self) -> PipelineController {
        self.services.controller(&self.config_manager.config())
    }
}
