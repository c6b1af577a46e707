//! TOML-based configuration for Dossier
//!
//! This module provides declarative configuration for providers, models, the
//! research pipeline, and the search backends via a TOML file (`dossier.toml`).
//!
//! # Hot Reloading
//!
//! Configuration changes are automatically detected and applied at runtime.
//! Use `DossierConfigManager` for thread-safe access to the current configuration.

use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Root configuration structure loaded from dossier.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DossierConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Named LLM provider configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Named model configurations that reference providers
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,

    #[serde(default)]
    pub web_search: WebSearchConfig,

    #[serde(default)]
    pub artifact: ArtifactConfig,

    /// Demo collections advertised to clients
    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    OpenAI {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

// ============= Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Reference to a provider name defined in [providers]
    pub provider: String,

    /// Model name/identifier to use with the provider
    pub model: String,
}

// ============= Research Pipeline Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Model used for planning, relevancy checks and reflection
    #[serde(default = "default_reasoning_model")]
    pub reasoning_model: String,

    /// Model used for section drafting and the executive summary
    #[serde(default = "default_writer_model")]
    pub writer_model: String,

    /// Base timeout applied to every provider call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Multiplier on the base timeout for the finalize call
    #[serde(default = "default_finalize_timeout_factor")]
    pub finalize_timeout_factor: u32,

    #[serde(default = "default_num_queries")]
    pub num_queries: usize,

    /// Reflection queries generated per reflect round
    #[serde(default = "default_reflection_rounds")]
    pub reflection_rounds: usize,

    /// Whether the web fallback runs when a request does not say
    #[serde(default = "default_true")]
    pub search_web: bool,

    /// Structured stages require the payload to follow a `</think>` block
    #[serde(default = "default_true")]
    pub require_reasoning_trace: bool,
}

fn default_reasoning_model() -> String {
    "reasoning".to_string()
}

fn default_writer_model() -> String {
    "writer".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_finalize_timeout_factor() -> u32 {
    3
}

fn default_num_queries() -> usize {
    3
}

fn default_reflection_rounds() -> usize {
    2
}

fn default_true() -> bool {
    true
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            reasoning_model: default_reasoning_model(),
            writer_model: default_writer_model(),
            timeout_secs: default_timeout_secs(),
            finalize_timeout_factor: default_finalize_timeout_factor(),
            num_queries: default_num_queries(),
            reflection_rounds: default_reflection_rounds(),
            search_web: true,
            require_reasoning_trace: true,
        }
    }
}

impl ResearchConfig {
    pub fn base_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn finalize_timeout(&self) -> Duration {
        self.base_timeout() * self.finalize_timeout_factor
    }
}

// ============= Search Backends =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Base URL of the RAG server; `generate` is resolved against it
    #[serde(default = "default_kb_url")]
    pub base_url: String,

    /// Environment variable containing the bearer token
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default = "default_collection")]
    pub default_collection: String,
}

fn default_kb_url() -> String {
    "http://localhost:8081/v1/".to_string()
}

fn default_collection() -> String {
    "default".to_string()
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            base_url: default_kb_url(),
            api_key_env: None,
            default_collection: default_collection(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    #[serde(default = "default_tavily_url")]
    pub base_url: String,

    #[serde(default = "default_tavily_key_env")]
    pub api_key_env: String,

    /// Results requested per search call
    #[serde(default = "default_web_max_results")]
    pub max_results: usize,

    #[serde(default = "default_search_depth")]
    pub search_depth: String,

    /// Domains to restrict fallback searches to, queried five at a time
    #[serde(default)]
    pub include_domains: Vec<String>,
}

fn default_tavily_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_tavily_key_env() -> String {
    "TAVILY_API_KEY".to_string()
}

fn default_web_max_results() -> usize {
    2
}

fn default_search_depth() -> String {
    "advanced".to_string()
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_tavily_url(),
            api_key_env: default_tavily_key_env(),
            max_results: default_web_max_results(),
            search_depth: default_search_depth(),
            include_domains: Vec::new(),
        }
    }
}

// ============= Artifact Q&A =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Model used to answer questions and rewrite reports
    #[serde(default = "default_writer_model")]
    pub model: String,

    /// Reject questions unrelated to the report
    #[serde(default)]
    pub guardrail: bool,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            model: default_writer_model(),
            guardrail: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    pub topic: String,
    pub report_organization: String,
}

// ============= Configuration Loading & Validation =============

/// Configuration warnings that don't prevent operation but may indicate issues
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub kind: ConfigWarningKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarningKind {
    UnusedProvider,
    UnusedModel,
    MissingSecret,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Provider '{0}' referenced by model '{1}' does not exist")]
    MissingProvider(String, String),

    #[error("Model '{0}' referenced by {1} does not exist")]
    MissingModel(String, String),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
}

impl From<ConfigError> for crate::types::AppError {
    fn from(err: ConfigError) -> Self {
        crate::types::AppError::Configuration(err.to_string())
    }
}

impl DossierConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: DossierConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for internal consistency
    ///
    /// Secrets are only referenced by name here; they are resolved when a
    /// client is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (model_name, model_config) in &self.models {
            if !self.providers.contains_key(&model_config.provider) {
                return Err(ConfigError::MissingProvider(
                    model_config.provider.clone(),
                    model_name.clone(),
                ));
            }
        }

        let roles = [
            (&self.research.reasoning_model, "research.reasoning_model"),
            (&self.research.writer_model, "research.writer_model"),
            (&self.artifact.model, "artifact.model"),
        ];
        for (model, role) in roles {
            if !self.models.contains_key(model) {
                return Err(ConfigError::MissingModel(model.clone(), role.to_string()));
            }
        }

        if self.research.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "research.timeout_secs must be greater than zero".into(),
            ));
        }
        if self.research.finalize_timeout_factor == 0 {
            return Err(ConfigError::ValidationError(
                "research.finalize_timeout_factor must be at least 1".into(),
            ));
        }
        if self.research.num_queries == 0 {
            return Err(ConfigError::ValidationError(
                "research.num_queries must be greater than zero".into(),
            ));
        }

        let mut names = HashSet::new();
        for collection in &self.collections {
            if !names.insert(collection.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "collection '{}' is defined twice",
                    collection.name
                )));
            }
        }

        Ok(())
    }

    /// Validate configuration with warnings for unused items and unset secrets
    ///
    /// Returns Ok with warnings, or Err if validation fails
    pub fn validate_with_warnings(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        self.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(self.check_unused_providers());
        warnings.extend(self.check_unused_models());
        warnings.extend(self.check_missing_secrets());

        Ok(warnings)
    }

    /// Check for providers that aren't referenced by any model
    fn check_unused_providers(&self) -> Vec<ConfigWarning> {
        let referenced: HashSet<_> = self.models.values().map(|m| m.provider.as_str()).collect();

        self.providers
            .keys()
            .filter(|name| !referenced.contains(name.as_str()))
            .map(|name| ConfigWarning {
                kind: ConfigWarningKind::UnusedProvider,
                message: format!(
                    "Provider '{}' is defined but not referenced by any model",
                    name
                ),
            })
            .collect()
    }

    /// Check for models that no pipeline role uses
    fn check_unused_models(&self) -> Vec<ConfigWarning> {
        let referenced: HashSet<&str> = [
            self.research.reasoning_model.as_str(),
            self.research.writer_model.as_str(),
            self.artifact.model.as_str(),
        ]
        .into_iter()
        .collect();

        self.models
            .keys()
            .filter(|name| !referenced.contains(name.as_str()))
            .map(|name| ConfigWarning {
                kind: ConfigWarningKind::UnusedModel,
                message: format!("Model '{}' is defined but not used by any stage", name),
            })
            .collect()
    }

    fn check_missing_secrets(&self) -> Vec<ConfigWarning> {
        let mut env_names: Vec<&str> = self
            .providers
            .values()
            .filter_map(|p| match p {
                ProviderConfig::OpenAI { api_key_env, .. } => Some(api_key_env.as_str()),
                ProviderConfig::Ollama { .. } => None,
            })
            .collect();
        env_names.extend(self.knowledge_base.api_key_env.as_deref());
        env_names.push(&self.web_search.api_key_env);

        env_names
            .into_iter()
            .filter(|name| self.resolve_env(name).is_none())
            .map(|name| ConfigWarning {
                kind: ConfigWarningKind::MissingSecret,
                message: format!("Environment variable '{}' is not set", name),
            })
            .collect()
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok()
    }

    /// Get model by name
    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Get provider by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Look up a demo collection by name
    pub fn collection(&self, name: &str) -> Option<&CollectionConfig> {
        self.collections.iter().find(|c| c.name == name)
    }
}

// ============= Hot Reloading Configuration Manager =============

/// Thread-safe configuration manager with hot reloading support
pub struct DossierConfigManager {
    config: Arc<ArcSwap<DossierConfig>>,
    config_path: PathBuf,
    watcher: RwLock<Option<RecommendedWatcher>>,
    reload_tx: Option<mpsc::UnboundedSender<()>>,
}

impl DossierConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        // Convert to absolute path for reliable file watching
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(ConfigError::ReadError)?
                .join(path)
        };

        let config = DossierConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
            watcher: RwLock::new(None),
            reload_tx: None,
        })
    }

    /// Create a config manager directly from a config (useful for testing)
    /// This won't have file watching capabilities.
    pub fn from_config(config: DossierConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from("dossier.toml"),
            watcher: RwLock::new(None),
            reload_tx: None,
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<DossierConfig> {
        self.config.load_full()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Manually reload the configuration from disk
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!("Reloading configuration from {:?}", self.config_path);

        let new_config = DossierConfig::load(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Start watching for configuration file changes
    pub fn start_watching(&mut self) -> Result<(), ConfigError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        self.reload_tx = Some(tx.clone());

        let config_path = self.config_path.clone();
        let config_arc = Arc::clone(&self.config);
        let file_name = self.config_path.file_name().map(|n| n.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let touches_config = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_config && (event.kind.is_modify() || event.kind.is_create()) {
                        // Debounced in the receiver
                        let _ = tx.send(());
                    }
                }
                Err(e) => {
                    error!("Config watcher error: {:?}", e);
                }
            }
        })?;

        // Watch the parent directory so editors that replace the file are seen
        if let Some(parent) = self.config_path.parent() {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }

        *self.watcher.write() = Some(watcher);

        tokio::spawn(async move {
            let mut last_reload: Option<std::time::Instant> = None;
            let debounce_duration = Duration::from_millis(500);

            while rx.recv().await.is_some() {
                if last_reload.is_some_and(|at| at.elapsed() < debounce_duration) {
                    continue;
                }

                // Wait a bit for file write to complete
                tokio::time::sleep(Duration::from_millis(100)).await;

                match DossierConfig::load(&config_path) {
                    Ok(new_config) => {
                        config_arc.store(Arc::new(new_config));
                        info!("Configuration hot-reloaded successfully");
                        last_reload = Some(std::time::Instant::now());
                    }
                    Err(e) => {
                        warn!(
                            "Failed to hot-reload config: {}. Keeping previous config.",
                            e
                        );
                    }
                }
            }
        });

        info!("Configuration hot-reload watcher started");
        Ok(())
    }

    /// Stop watching for configuration changes
    pub fn stop_watching(&self) {
        *self.watcher.write() = None;
        info!("Configuration hot-reload watcher stopped");
    }
}

impl Clone for DossierConfigManager {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            config_path: self.config_path.clone(),
            watcher: RwLock::new(None), // Watcher is not cloned
            reload_tx: self.reload_tx.clone(),
        }
    }
}
