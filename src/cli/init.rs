//! Init command implementation
//!
//! Scaffolds a new Dossier project: `dossier.toml`, `.env.example` and a
//! `.gitignore`.

use super::output::Output;
use std::fs;
use std::path::Path;

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// Project already exists (dossier.toml found)
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: std::path::PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// LLM provider to configure (ollama, openai, or both)
    pub provider: String,
    /// Host address for the server
    pub host: String,
    /// Port for the server
    pub port: u16,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing Dossier Project");

    let base_path = &config.path;

    let config_path = base_path.join("dossier.toml");
    if config_path.exists() && !config.force {
        output.warning("dossier.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    if !base_path.exists() {
        if let Err(e) = fs::create_dir_all(base_path) {
            output.error(&format!("Failed to create {}: {}", base_path.display(), e));
            return InitResult::Error(e.to_string());
        }
        output.created_dir(&base_path.display().to_string());
    }

    output.subheader("Creating configuration files");

    let toml_content = generate_dossier_toml(&config);
    if let Err(e) = write_file(&config_path, &toml_content, config.force) {
        output.error(&format!("Failed to create dossier.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "dossier.toml");

    let env_example_path = base_path.join(".env.example");
    if let Err(e) = write_file(&env_example_path, &generate_env_example(), config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("env", ".env.example");

    let gitignore_path = base_path.join(".gitignore");
    if gitignore_path.exists() {
        output.skipped(".gitignore", "already exists");
    } else if let Err(e) = write_file(&gitignore_path, &generate_gitignore(), false) {
        output.warning(&format!("Failed to create .gitignore: {}", e));
    } else {
        output.created("file", ".gitignore");
    }

    output.complete("Dossier project initialized successfully!");

    output.header("Next Steps");
    output.newline();
    output.info("1. Set up environment variables:");
    output.command("cp .env.example .env");
    output.command("# Edit .env and set TAVILY_API_KEY for web fallback search");
    output.newline();

    if config.provider != "openai" {
        output.info("2. Start Ollama (if not running):");
        output.command("ollama serve");
        output.command("ollama pull qwen3:8b");
        output.newline();
    }

    output.info("3. Start the server, or write a report straight away:");
    output.command("dossier serve");
    output.command("dossier report \"Renewable Energy\" --outline \"Current State, Challenges, Solutions\"");
    output.newline();

    output.hint(&format!(
        "Server will be available at http://{}:{}",
        config.host, config.port
    ));
    output.hint("OpenAPI document at /api/openapi.json");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

pub(crate) fn generate_dossier_toml(config: &InitConfig) -> String {
    let provider_section = match config.provider.as_str() {
        "openai" => {
            r#"# OpenAI-compatible API (set OPENAI_API_KEY in .env)
[providers.openai]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
"#
        }
        "both" => {
            r#"# Ollama - Local inference (default)
[providers.ollama-local]
type = "ollama"
base_url = "http://localhost:11434"

# OpenAI-compatible API (set OPENAI_API_KEY in .env)
[providers.openai]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
"#
        }
        _ => {
            r#"# Ollama - Local inference (no API key required)
[providers.ollama-local]
type = "ollama"
base_url = "http://localhost:11434"
"#
        }
    };

    let (reasoning_provider, reasoning_model, writer_provider, writer_model) =
        match config.provider.as_str() {
            "openai" => ("openai", "o4-mini", "openai", "gpt-4o-mini"),
            "both" => ("ollama-local", "qwen3:8b", "openai", "gpt-4o-mini"),
            _ => ("ollama-local", "qwen3:8b", "ollama-local", "llama3.2"),
        };

    format!(
        r#"# Dossier Configuration
# =====================
# Generated by: dossier init
#
# Secrets are referenced by environment variable name; see .env.example.
#
# Hot Reloading: research settings are re-read on every request, so edits
# take effect without restarting the server.

# =============================================================================
# Server Configuration
# =============================================================================
[server]
host = "{host}"
port = {port}
log_level = "info"
# "pretty" or "json"
log_format = "pretty"

# =============================================================================
# LLM Providers
# =============================================================================
{provider_section}
# =============================================================================
# Model Configurations
# =============================================================================
# Plans queries, judges relevancy and reflects; should emit <think> traces
[models.reasoning]
provider = "{reasoning_provider}"
model = "{reasoning_model}"

# Drafts sections, the executive summary and artifact answers
[models.writer]
provider = "{writer_provider}"
model = "{writer_model}"

# =============================================================================
# Research Pipeline
# =============================================================================
[research]
reasoning_model = "reasoning"
writer_model = "writer"
timeout_secs = 120
finalize_timeout_factor = 3
num_queries = 3
reflection_rounds = 2
search_web = true
# Set to false for reasoning models that do not emit <think> blocks
require_reasoning_trace = true

# =============================================================================
# Search Providers
# =============================================================================
[knowledge_base]
base_url = "http://localhost:8081/v1/"
default_collection = "default"
# api_key_env = "RAG_API_KEY"

[web_search]
base_url = "https://api.tavily.com"
api_key_env = "TAVILY_API_KEY"
max_results = 2
search_depth = "advanced"
include_domains = []

# =============================================================================
# Artifact Q&A
# =============================================================================
[artifact]
model = "writer"
guardrail = false

# =============================================================================
# Demo Collections
# =============================================================================
[[collections]]
name = "energy"
topic = "Renewable Energy"
report_organization = "Current State, Challenges, Solutions"
"#,
        host = config.host,
        port = config.port,
        provider_section = provider_section,
        reasoning_provider = reasoning_provider,
        reasoning_model = reasoning_model,
        writer_provider = writer_provider,
        writer_model = writer_model,
    )
}

pub(crate) fn generate_env_example() -> String {
    r#"# Dossier Environment Variables
# =============================
# Copy this file to .env and fill in the values.

# Optional: Logging level (trace, debug, info, warn, error)
RUST_LOG=info,dossier=debug

# Web fallback search (Tavily)
TAVILY_API_KEY=tvly-your-key-here

# Optional: OpenAI-compatible API key (if using the openai provider)
# OPENAI_API_KEY=sk-...

# Optional: bearer token for the knowledge base server
# RAG_API_KEY=your-token
"#
    .to_string()
}

fn generate_gitignore() -> String {
    r#"# Environment
.env
.env.local
.env.*.local

# Generated reports
/reports/

# Rust
/target/

# IDE
.idea/
.vscode/
*.swp

# OS
.DS_Store
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::toml_config::DossierConfig;
    use tempfile::TempDir;

    fn init_config(path: &Path, provider: &str) -> InitConfig {
        InitConfig {
            path: path.to_path_buf(),
            force: false,
            provider: provider.to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }

    #[test]
    fn test_generated_toml_validates_for_every_provider() {
        for provider in ["ollama", "openai", "both"] {
            let content = generate_dossier_toml(&init_config(Path::new("/tmp"), provider));
            let config: DossierConfig = toml::from_str(&content).unwrap();
            config.validate().unwrap();
            assert_eq!(config.research.reasoning_model, "reasoning");
            assert_eq!(config.collections.len(), 1);
        }
    }

    #[test]
    fn test_generate_dossier_toml_server_section() {
        let config = InitConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            ..init_config(Path::new("/tmp"), "openai")
        };

        let content = generate_dossier_toml(&config);
        assert!(content.contains("host = \"0.0.0.0\""));
        assert!(content.contains("port = 8080"));
        assert!(content.contains("[providers.openai]"));
        assert!(!content.contains("[providers.ollama-local]"));
    }

    #[test]
    fn test_generate_env_example() {
        let content = generate_env_example();
        assert!(content.contains("TAVILY_API_KEY"));
        assert!(content.contains("RUST_LOG"));
        assert!(content.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_run_creates_files() {
        let temp_dir = TempDir::new().unwrap();
        let result = run(init_config(temp_dir.path(), "ollama"), &Output::no_color());

        assert!(matches!(result, InitResult::Success));
        assert!(temp_dir.path().join("dossier.toml").exists());
        assert!(temp_dir.path().join(".env.example").exists());
        assert!(temp_dir.path().join(".gitignore").exists());

        DossierConfig::load(temp_dir.path().join("dossier.toml")).unwrap();
    }

    #[test]
    fn test_run_refuses_to_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("dossier.toml"), "# mine").unwrap();

        let result = run(init_config(temp_dir.path(), "ollama"), &Output::no_color());
        assert!(matches!(result, InitResult::AlreadyExists));
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("dossier.toml")).unwrap(),
            "# mine"
        );

        let forced = InitConfig {
            force: true,
            ..init_config(temp_dir.path(), "ollama")
        };
        assert!(matches!(run(forced, &Output::no_color()), InitResult::Success));
        assert!(fs::read_to_string(temp_dir.path().join("dossier.toml"))
            .unwrap()
            .contains("[research]"));
    }
}
