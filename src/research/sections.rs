//! Report sections and the section-scoped drafting stage.

use crate::llm::LLMClient;
use crate::research::citations::{CitationDocument, SourceId};
use crate::research::context::StageContext;
use crate::research::events::keys;
use crate::research::prompts;
use crate::research::text::strip_reasoning;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

/// Sections drafted concurrently per round
pub const DRAFT_BATCH_SIZE: usize = 2;

static CITATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]").expect("citation marker pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: String,
    pub content: String,
}

/// Sections in order of first appearance, unique by exact name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    items: Vec<Section>,
}

impl Sections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `name` with empty content unless it exists; true if created
    pub fn ensure(&mut self, name: &str) -> bool {
        if self.get(name).is_some() {
            return false;
        }
        self.items.push(Section {
            name: name.to_string(),
            content: String::new(),
        });
        true
    }

    pub fn get(&self, name: &str) -> Option<&Section> {
        self.items.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.items.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append each successful draft to its section; failed drafts are skipped
    pub fn apply_drafts(&mut self, drafts: Vec<SectionDraft>) {
        for draft in drafts {
            let Some(text) = draft.content else {
                continue;
            };
            if let Some(section) = self.items.iter_mut().find(|s| s.name == draft.name) {
                if !section.content.is_empty() {
                    section.content.push_str("\n\n");
                }
                section.content.push_str(&text);
            }
        }
    }

    /// Move sections created after the first `prior_len` in front of the
    /// last pre-existing section. Applies only when more than two sections
    /// existed before, so the first and last of those never move.
    pub fn splice_new(&mut self, prior_len: usize) {
        if prior_len <= 2 || self.items.len() <= prior_len {
            return;
        }
        let created: Vec<Section> = self.items.drain(prior_len..).collect();
        let at = prior_len - 1;
        self.items.splice(at..at, created);
    }

    pub fn render_markdown(&self) -> String {
        self.items
            .iter()
            .map(|s| format!("## {}\n\n{}", s.name, s.content.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Output of one drafting call; `None` when the call failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDraft {
    pub name: String,
    pub content: Option<String>,
}

/// Remove `[n]` markers whose id is not in `allowed`
pub fn strip_unlisted_citations(text: &str, allowed: &BTreeSet<SourceId>) -> String {
    CITATION_MARKER
        .replace_all(text, |caps: &Captures| {
            let listed = caps[1]
                .parse::<u64>()
                .map(|n| allowed.contains(&SourceId(n)))
                .unwrap_or(false);
            if listed {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

#[derive(Clone)]
pub struct SectionWriter {
    llm: Arc<dyn LLMClient>,
}

impl SectionWriter {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    /// Draft `targets` two at a time, each against its own slice of
    /// `citations`. Drafts come back in target order.
    pub async fn write(
        &self,
        ctx: &StageContext,
        topic: &str,
        sections: &Sections,
        citations: &CitationDocument,
        targets: &[String],
    ) -> Vec<SectionDraft> {
        let mut drafts = Vec::with_capacity(targets.len());

        for batch in targets.chunks(DRAFT_BATCH_SIZE) {
            let round = batch
                .iter()
                .map(|name| self.draft(ctx, topic, sections, citations, name));
            drafts.extend(futures::future::join_all(round).await);
        }

        drafts
    }

    async fn draft(
        &self,
        ctx: &StageContext,
        topic: &str,
        sections: &Sections,
        citations: &CitationDocument,
        name: &str,
    ) -> SectionDraft {
        let scoped = citations.for_section(name);
        let allowed = scoped.citable_ids();
        let existing = sections.get(name).map(|s| s.content.as_str()).unwrap_or("");
        let prompt = prompts::section_writer(topic, name, existing, &scoped.render(), &allowed);

        let content = match ctx
            .complete_streaming(self.llm.as_ref(), &prompt, keys::WRITE, ctx.timeout)
            .await
        {
            Ok(raw) => {
                let text = strip_unlisted_citations(&strip_reasoning(&raw), &allowed);
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Err(e) => {
                tracing::warn!(section = name, error = %e, "Section draft failed, keeping content");
                None
            }
        };

        SectionDraft {
            name: name.to_string(),
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_sections(names: &[&str]) -> Sections {
        let mut sections = Sections::new();
        for name in names {
            sections.ensure(name);
        }
        sections
    }

    #[test]
    fn test_ensure_dedupes_by_exact_name() {
        let mut sections = Sections::new();
        assert!(sections.ensure("Intro"));
        assert!(!sections.ensure("Intro"));
        assert!(sections.ensure("intro"));
        assert_eq!(sections.names(), vec!["Intro", "intro"]);
    }

    #[test]
    fn test_apply_drafts_appends_and_skips_failures() {
        let mut sections = with_sections(&["Intro", "Outlook"]);
        sections.apply_drafts(vec![SectionDraft {
            name: "Intro".into(),
            content: Some("First.".into()),
        }]);
        sections.apply_drafts(vec![
            SectionDraft {
                name: "Intro".into(),
                content: Some("Second.".into()),
            },
            SectionDraft {
                name: "Outlook".into(),
                content: None,
            },
        ]);

        assert_eq!(sections.get("Intro").unwrap().content, "First.\n\nSecond.");
        assert_eq!(sections.get("Outlook").unwrap().content, "");
    }

    #[test]
    fn test_splice_new_goes_before_last_existing() {
        let mut sections = with_sections(&["Intro", "Body", "Conclusion"]);
        sections.ensure("Gap A");
        sections.ensure("Gap B");
        sections.splice_new(3);
        assert_eq!(
            sections.names(),
            vec!["Intro", "Body", "Gap A", "Gap B", "Conclusion"]
        );
    }

    #[test]
    fn test_splice_skipped_for_two_or_fewer_existing() {
        let mut sections = with_sections(&["Intro", "Conclusion"]);
        sections.ensure("Gap");
        sections.splice_new(2);
        assert_eq!(sections.names(), vec!["Intro", "Conclusion", "Gap"]);
    }

    #[test]
    fn test_strip_unlisted_citations() {
        let allowed: BTreeSet<SourceId> = [SourceId(1), SourceId(3)].into_iter().collect();
        let text = "Solar grew [1][2]. Wind too [3]. See [note] and [99].";
        assert_eq!(
            strip_unlisted_citations(text, &allowed),
            "Solar grew [1]. Wind too [3]. See [note] and ."
        );
    }

    #[test]
    fn test_render_markdown() {
        let mut sections = with_sections(&["Intro"]);
        sections.apply_drafts(vec![SectionDraft {
            name: "Intro".into(),
            content: Some("Hello [1].".into()),
        }]);
        assert_eq!(sections.render_markdown(), "## Intro\n\nHello [1].");
    }
}
