//! Per-query evidence gathered by the research fan-out.

use crate::research::query::Query;
use crate::tools::web_search::WebResult;
use serde::{Deserialize, Serialize};

/// Effective answer when neither the knowledge base nor the web helped
pub const NO_ANSWER_FOUND: &str = "No answer found";
/// Fallback answer when every web result scored at or below the threshold
pub const NO_WEB_RESULT: &str = "No relevant result found in web search";
/// Web results must score strictly above this to be kept
pub const WEB_SCORE_THRESHOLD: f64 = 0.6;

/// Binary relevancy verdict on a knowledge-base answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relevancy {
    Yes,
    No,
}

impl Relevancy {
    pub fn is_relevant(self) -> bool {
        self == Relevancy::Yes
    }
}

/// Result of the web fallback search for one query
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackEvidence {
    pub answer: String,
    pub citation: Option<String>,
}

impl FallbackEvidence {
    /// Keep results scoring above [`WEB_SCORE_THRESHOLD`] and concatenate
    /// them into one answer and one citation block.
    pub fn from_web_results(results: &[WebResult]) -> Self {
        let kept: Vec<&WebResult> = results
            .iter()
            .filter(|r| r.score > WEB_SCORE_THRESHOLD)
            .collect();

        let answer = kept
            .iter()
            .map(|r| r.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if answer.trim().is_empty() {
            return Self {
                answer: NO_WEB_RESULT.to_string(),
                citation: None,
            };
        }

        let citation = kept
            .iter()
            .map(|r| format!("ANSWER:\n{}\n\nCITATION:\n{}", r.content, r.url))
            .collect::<Vec<_>>()
            .join("\n\n");

        Self {
            answer,
            citation: Some(citation),
        }
    }
}

/// Everything learned about one query in one research batch
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceRecord {
    pub query: Query,
    pub primary_answer: String,
    pub primary_citation: String,
    pub relevancy: Relevancy,
    pub fallback: Option<FallbackEvidence>,
}

impl EvidenceRecord {
    /// Stand-in for a query whose research task died before producing a record
    pub fn placeholder(query: Query, reason: &str) -> Self {
        Self {
            query,
            primary_answer: format!("Research for this query failed: {}", reason),
            primary_citation: String::new(),
            relevancy: Relevancy::Yes,
            fallback: None,
        }
    }

    /// The answer the report uses: the knowledge-base answer when relevant,
    /// else the fallback answer, else [`NO_ANSWER_FOUND`].
    pub fn effective_answer(&self) -> &str {
        if self.relevancy.is_relevant() {
            return &self.primary_answer;
        }

        match &self.fallback {
            Some(fallback) if !fallback.answer.trim().is_empty() => &fallback.answer,
            _ => NO_ANSWER_FOUND,
        }
    }

    /// Raw tool evidence behind the effective answer
    pub fn evidence(&self) -> String {
        let mut parts = Vec::new();
        if !self.primary_citation.trim().is_empty() {
            parts.push(self.primary_citation.trim());
        }
        if let Some(citation) = self.fallback.as_ref().and_then(|f| f.citation.as_deref()) {
            parts.push(citation.trim());
        }
        parts.join("\n\n")
    }
}
