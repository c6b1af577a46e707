//! Search Providers
//!
//! The research fan-out gathers evidence from two collaborators, each behind
//! a trait so tests and alternative backends can stand in:
//!
//! - [`knowledge_base`] - primary search against a RAG server ([`KnowledgeBase`], [`RagClient`])
//! - [`web_search`] - fallback web search ([`WebSearch`], [`TavilyClient`])

/// RAG server client.
pub mod knowledge_base;
/// Tavily web search client.
pub mod web_search;

pub use knowledge_base::{KnowledgeBase, KnowledgeBaseAnswer, RagClient};
pub use web_search::{TavilyClient, WebResult, WebSearch};
