//! Global source numbering and the citation document.
//!
//! Every evidence record gets a [`SourceId`] from the [`CitationRegistry`].
//! Ids are handed out in consecutive blocks, one block per research batch,
//! and are never reused within a run. The [`CitationDocument`] keeps the
//! rendered citations in id order and can be filtered per section so the
//! section writer only sees (and may only cite) its own sources.
//!
//! The textual form of a citation is a marker block:
//!
//! ```text
//! SOURCE 3 QUERY: grid-scale storage costs
//! SECTION: Challenges
//! ANSWER:
//! ...
//! EVIDENCE:
//! ...
//! END SOURCE 3
//! ```
//!
//! [`Citation::render`] and [`CitationDocument::parse`] are the only places
//! that know this format.

use crate::research::evidence::EvidenceRecord;
use crate::types::{AppError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

static SOURCE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)SOURCE (\d+) QUERY: (.*?)\nSECTION: (.*?)\nANSWER:\n(.*?)\nEVIDENCE:\n(.*?)\nEND SOURCE (\d+)",
    )
    .expect("source block pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id counter, owned by the pipeline state
#[derive(Debug)]
pub struct CitationRegistry {
    next_id: u64,
}

impl Default for CitationRegistry {
    fn default() -> Self {
        Self { next_id: 1 }
    }
}

impl CitationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next allocation will start at
    pub fn peek(&self) -> SourceId {
        SourceId(self.next_id)
    }

    /// Reserve `n` consecutive ids
    pub fn allocate(&mut self, n: usize) -> Vec<SourceId> {
        let start = self.next_id;
        self.next_id += n as u64;
        (start..self.next_id).map(SourceId).collect()
    }

    /// Pair each record with its id, using the record's effective answer
    pub fn format(evidence: &[EvidenceRecord], ids: &[SourceId]) -> Vec<Citation> {
        evidence
            .iter()
            .zip(ids)
            .map(|(record, id)| Citation {
                id: *id,
                section: record.query.section.clone(),
                query: record.query.text.clone(),
                answer: record.effective_answer().to_string(),
                evidence: record.evidence(),
            })
            .collect()
    }

    /// Allocate and format in one step
    pub fn register(&mut self, evidence: &[EvidenceRecord]) -> Vec<Citation> {
        let ids = self.allocate(evidence.len());
        Self::format(evidence, &ids)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub id: SourceId,
    pub section: String,
    pub query: String,
    pub answer: String,
    pub evidence: String,
}

impl Citation {
    pub fn render(&self) -> String {
        format!(
            "SOURCE {id} QUERY: {query}\nSECTION: {section}\nANSWER:\n{answer}\nEVIDENCE:\n{evidence}\nEND SOURCE {id}",
            id = self.id,
            query = self.query,
            section = self.section,
            answer = self.answer,
            evidence = self.evidence,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationDocument {
    entries: Vec<Citation>,
}

impl CitationDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_citations(entries: Vec<Citation>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Citation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a new batch of citations; no content deduplication
    pub fn merge(&mut self, new: Vec<Citation>) {
        self.entries.extend(new);
    }

    /// Entries tagged with exactly `section`
    pub fn for_section(&self, section: &str) -> CitationDocument {
        CitationDocument {
            entries: self
                .entries
                .iter()
                .filter(|c| c.section == section)
                .cloned()
                .collect(),
        }
    }

    pub fn citable_ids(&self) -> BTreeSet<SourceId> {
        self.entries.iter().map(|c| c.id).collect()
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(Citation::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Read marker blocks back; text between blocks is ignored
    pub fn parse(text: &str) -> Result<CitationDocument> {
        let mut entries = Vec::new();

        for caps in SOURCE_BLOCK.captures_iter(text) {
            let id = parse_id(&caps[1])?;
            let end_id = parse_id(&caps[6])?;
            if id != end_id {
                return Err(AppError::Parse(format!(
                    "SOURCE {} closed by END SOURCE {}",
                    id, end_id
                )));
            }

            entries.push(Citation {
                id,
                query: caps[2].to_string(),
                section: caps[3].to_string(),
                answer: caps[4].to_string(),
                evidence: caps[5].to_string(),
            });
        }

        Ok(CitationDocument { entries })
    }

    /// The "Sources" appendix of the final report
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("## Sources\n");

        for citation in &self.entries {
            out.push_str(&format!(
                "\n### [{}] {}\n\n*Section: {}*\n\n**Answer**\n\n{}\n",
                citation.id, citation.query, citation.section, citation.answer
            ));
            if !citation.evidence.trim().is_empty() {
                out.push_str(&format!("\n**Evidence**\n\n```\n{}\n```\n", citation.evidence));
            }
        }

        out
    }
}

fn parse_id(raw: &str) -> Result<SourceId> {
    raw.parse()
        .map(SourceId)
        .map_err(|e| AppError::Parse(format!("bad source id '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::evidence::{EvidenceRecord, Relevancy};
    use crate::research::query::Query;

    fn record(text: &str, section: &str, answer: &str) -> EvidenceRecord {
        EvidenceRecord {
            query: Query::new(text, section, "r"),
            primary_answer: answer.to_string(),
            primary_citation: format!("{}.pdf", text),
            relevancy: Relevancy::Yes,
            fallback: None,
        }
    }

    #[test]
    fn test_allocate_is_monotonic() {
        let mut registry = CitationRegistry::new();
        assert_eq!(registry.allocate(3), vec![SourceId(1), SourceId(2), SourceId(3)]);
        assert!(registry.allocate(0).is_empty());
        assert_eq!(registry.allocate(2), vec![SourceId(4), SourceId(5)]);
        assert_eq!(registry.peek(), SourceId(6));
    }

    #[test]
    fn test_duplicate_answers_get_new_ids() {
        let mut registry = CitationRegistry::new();
        let evidence = vec![record("a", "Intro", "same"), record("b", "Intro", "same")];
        let citations = registry.register(&evidence);
        assert_eq!(citations[0].id, SourceId(1));
        assert_eq!(citations[1].id, SourceId(2));
    }

    #[test]
    fn test_render_parse_preserves_fields() {
        let mut registry = CitationRegistry::new();
        let mut doc = CitationDocument::new();
        doc.merge(registry.register(&[
            record("solar output", "Current State", "Line one\nLine two"),
            record("storage", "Challenges", ""),
        ]));

        let parsed = CitationDocument::parse(&doc.render()).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_parse_rejects_mismatched_end() {
        let text = "SOURCE 1 QUERY: q\nSECTION: s\nANSWER:\na\nEVIDENCE:\ne\nEND SOURCE 2";
        assert!(matches!(
            CitationDocument::parse(text),
            Err(AppError::Parse(_))
        ));
    }

    #[test]
    fn test_for_section_and_citable_ids() {
        let mut registry = CitationRegistry::new();
        let mut doc = CitationDocument::new();
        doc.merge(registry.register(&[
            record("a", "Intro", "x"),
            record("b", "Outlook", "y"),
            record("c", "Intro", "z"),
        ]));

        let intro = doc.for_section("Intro");
        assert_eq!(intro.len(), 2);
        assert_eq!(
            intro.citable_ids().into_iter().collect::<Vec<_>>(),
            vec![SourceId(1), SourceId(3)]
        );
        assert!(doc.for_section("intro").is_empty());
    }

    #[test]
    fn test_to_markdown_lists_every_source() {
        let mut registry = CitationRegistry::new();
        let doc = CitationDocument::from_citations(registry.register(&[
            record("a", "Intro", "x"),
            record("b", "Outlook", "y"),
        ]));

        let markdown = doc.to_markdown();
        assert!(markdown.starts_with("## Sources"));
        assert!(markdown.contains("### [1] a"));
        assert!(markdown.contains("### [2] b"));
        assert!(markdown.contains("b.pdf"));
    }
}
