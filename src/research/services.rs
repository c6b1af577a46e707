//! Shared provider clients and the stages built on them.

use crate::llm::{LLMClient, ProviderRegistry};
use crate::research::artifact::ArtifactQa;
use crate::research::fanout::{ResearchFanOut, WebFallbackSettings};
use crate::research::pipeline::{PipelineController, PipelineSettings};
use crate::research::planner::QueryPlanner;
use crate::research::reflection::Reflector;
use crate::research::relevancy::RelevancyGate;
use crate::research::sections::SectionWriter;
use crate::tools::{KnowledgeBase, RagClient, TavilyClient, WebSearch};
use crate::types::Result;
use crate::utils::toml_config::DossierConfig;
use std::sync::Arc;

/// The external collaborators every stage draws from
#[derive(Clone)]
pub struct Collaborators {
    /// Planner, relevancy gate and reflection
    pub reasoning: Arc<dyn LLMClient>,
    /// Section drafting and the executive summary
    pub writer: Arc<dyn LLMClient>,
    pub artifact: Arc<dyn LLMClient>,
    pub knowledge_base: Arc<dyn KnowledgeBase>,
    pub web: Arc<dyn WebSearch>,
}

/// Stage implementations wired to shared clients; cheap to clone
#[derive(Clone)]
pub struct ResearchServices {
    pub planner: QueryPlanner,
    pub fanout: ResearchFanOut,
    pub writer: SectionWriter,
    pub reflector: Reflector,
    pub summarizer: Arc<dyn LLMClient>,
    pub artifact: ArtifactQa,
}

impl ResearchServices {
    pub fn new(collaborators: Collaborators, config: &DossierConfig) -> Self {
        let Collaborators {
            reasoning,
            writer,
            artifact,
            knowledge_base,
            web,
        } = collaborators;

        Self {
            planner: QueryPlanner::new(reasoning.clone()),
            fanout: ResearchFanOut::new(
                knowledge_base.clone(),
                web,
                RelevancyGate::new(reasoning.clone()),
                WebFallbackSettings::from(&config.web_search),
            ),
            writer: SectionWriter::new(writer.clone()),
            reflector: Reflector::new(reasoning),
            summarizer: writer,
            artifact: ArtifactQa::new(
                artifact,
                knowledge_base,
                config.artifact.guardrail,
                config.knowledge_base.default_collection.clone(),
            ),
        }
    }

    /// Build real clients for every configured collaborator
    pub async fn from_config(config: &DossierConfig) -> Result<Self> {
        let registry = ProviderRegistry::from_config(config);
        let research = &config.research;

        let reasoning = registry.create_client_for_model(&research.reasoning_model).await?;
        let writer = if research.writer_model == research.reasoning_model {
            reasoning.clone()
        } else {
            registry.create_client_for_model(&research.writer_model).await?
        };
        let artifact = if config.artifact.model == research.writer_model {
            writer.clone()
        } else {
            registry.create_client_for_model(&config.artifact.model).await?
        };

        let knowledge_base: Arc<dyn KnowledgeBase> =
            Arc::new(RagClient::from_config(&config.knowledge_base)?);
        let web: Arc<dyn WebSearch> = Arc::new(TavilyClient::from_config(&config.web_search)?);

        tracing::info!(
            reasoning = reasoning.model_name(),
            writer = writer.model_name(),
            knowledge_base = %config.knowledge_base.base_url,
            "Research services ready"
        );

        Ok(Self::new(
            Collaborators {
                reasoning,
                writer,
                artifact,
                knowledge_base,
                web,
            },
            config,
        ))
    }

    /// A controller using the research settings of `config`
    pub fn controller(&self, config: &DossierConfig) -> PipelineController {
        PipelineController::new(self.clone(), PipelineSettings::from_config(config))
    }
}
