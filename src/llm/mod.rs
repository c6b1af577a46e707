//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for the completion providers the
//! research pipeline calls. Provider-specific code sits behind [`LLMClient`],
//! so stages and tests work with any implementation.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - Runtime provider selection resolved from configuration
//! - [`ProviderRegistry`] - Resolves `dossier.toml` model names to clients
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `ollama` - Local Ollama server (default)
//! - `openai` - OpenAI API and compatible endpoints
//!
//! # Example
//!
//! ```ignore
//! use dossier::llm::ProviderRegistry;
//!
//! let registry = ProviderRegistry::from_config(&config);
//! let client = registry.create_client_for_model("reasoning").await?;
//! let text = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
/// Registry for managing multiple LLM provider instances.
pub mod provider_registry;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, Provider, TextStream};
pub use provider_registry::ProviderRegistry;
