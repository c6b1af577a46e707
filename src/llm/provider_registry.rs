//! Provider Registry for managing multiple LLM providers
//!
//! Maps the named `[models.*]` entries of `dossier.toml` onto their
//! `[providers.*]` and builds shareable clients for them.

use crate::llm::client::{LLMClient, Provider};
use crate::types::{AppError, Result};
use crate::utils::toml_config::{DossierConfig, ModelConfig, ProviderConfig};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry for managing multiple named LLM providers
///
/// The ProviderRegistry holds references to provider configurations and allows
/// creating LLM clients for specific models by name.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    /// Provider configurations keyed by name
    providers: HashMap<String, ProviderConfig>,
    /// Model configurations keyed by name
    models: HashMap<String, ModelConfig>,
}

impl ProviderRegistry {
    /// Create a new empty provider registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider registry from TOML configuration
    pub fn from_config(config: &DossierConfig) -> Self {
        Self {
            providers: config.providers.clone(),
            models: config.models.clone(),
        }
    }

    /// Register a provider configuration
    pub fn register_provider(&mut self, name: &str, config: ProviderConfig) {
        self.providers.insert(name.to_string(), config);
    }

    /// Register a model configuration
    pub fn register_model(&mut self, name: &str, config: ModelConfig) {
        self.models.insert(name.to_string(), config);
    }

    /// Get a model configuration by name
    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Check if a model exists in the registry
    pub fn has_model(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Check if a provider exists in the registry
    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Resolve the model -> provider chain without connecting
    pub fn resolve(&self, model_name: &str) -> Result<Provider> {
        let model_config = self.get_model(model_name).ok_or_else(|| {
            AppError::Configuration(format!("Model '{}' not found in configuration", model_name))
        })?;

        let provider_config = self.providers.get(&model_config.provider).ok_or_else(|| {
            AppError::Configuration(format!(
                "Provider '{}' referenced by model '{}' not found",
                model_config.provider, model_name
            ))
        })?;

        Provider::from_model_config(model_config, provider_config)
    }

    /// Create a shareable LLM client for a specific model by name
    pub async fn create_client_for_model(&self, model_name: &str) -> Result<Arc<dyn LLMClient>> {
        let provider = self.resolve(model_name)?;
        tracing::debug!(model = %model_name, provider = provider.name(), "Creating LLM client");
        let client = provider.create_client().await?;
        Ok(Arc::from(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register_provider(
            "ollama-local",
            ProviderConfig::Ollama {
                base_url: "http://localhost:11434".to_string(),
            },
        );
        registry.register_model(
            "reasoning",
            ModelConfig {
                provider: "ollama-local".to_string(),
                model: "qwen3:8b".to_string(),
            },
        );
        registry.register_model(
            "orphan",
            ModelConfig {
                provider: "missing".to_string(),
                model: "llama3.2".to_string(),
            },
        );
        registry
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(!registry.has_model("reasoning"));
        assert!(!registry.has_provider("ollama-local"));
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = registry();
        assert!(registry.has_provider("ollama-local"));
        assert!(registry.has_model("reasoning"));

        let provider = registry.resolve("reasoning").unwrap();
        assert_eq!(provider.name(), "Ollama");
    }

    #[test]
    fn test_resolve_unknown_model() {
        let err = registry().resolve("nope").unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_resolve_missing_provider() {
        let err = registry().resolve("orphan").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
