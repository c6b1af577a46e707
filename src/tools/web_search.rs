//! Web search used as the fallback when a knowledge-base answer is judged
//! irrelevant. [`TavilyClient`] talks to the Tavily search API.

use crate::types::{AppError, Result};
use crate::utils::toml_config::WebSearchConfig;
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    pub content: String,
    pub url: String,
    #[serde(default)]
    pub score: f64,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        include_domains: &[String],
        exclude_domains: &[String],
    ) -> Result<Vec<WebResult>>;
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<WebResult>,
}

pub struct TavilyClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    search_depth: String,
}

impl TavilyClient {
    pub fn new(base_url: &str, api_key: String, search_depth: &str) -> Result<Self> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join("search"))
            .map_err(|e| {
                AppError::Configuration(format!("invalid web search URL '{}': {}", base_url, e))
            })?;

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
            search_depth: search_depth.to_string(),
        })
    }

    /// An unset key is not fatal: searches fail and the fan-out degrades
    pub fn from_config(config: &WebSearchConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).unwrap_or_else(|_| {
            tracing::warn!(env = %config.api_key_env, "Web search key not set");
            String::new()
        });
        Self::new(&config.base_url, api_key, &config.search_depth)
    }
}

#[async_trait]
impl WebSearch for TavilyClient {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        include_domains: &[String],
        exclude_domains: &[String],
    ) -> Result<Vec<WebResult>> {
        let body = json!({
            "query": query,
            "search_depth": self.search_depth,
            "max_results": max_results,
            "include_answer": true,
            "include_raw_content": false,
            "include_images": false,
            "include_domains": include_domains,
            "exclude_domains": exclude_domains,
        });

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::WebSearch(format!("Tavily request failed: {}", e)))?;

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| AppError::WebSearch(format!("Tavily response malformed: {}", e)))?;

        Ok(parsed.results)
    }
}

/// Host of a result URL, without a leading `www.`
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.trim_start_matches("www.").to_string())
}
