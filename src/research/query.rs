//! Research queries and their origin tag.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Rationale carried by every query the reflection stage produces
pub const REFLECTION_RATIONALE: &str = "Reflection-based query";

/// Section for queries that arrive without one
pub const UNASSIGNED_SECTION: &str = "Additional Findings";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QueryOrigin {
    /// Planned up front or supplied by the caller
    #[default]
    Initial,
    /// Produced by the reflection stage to fill a knowledge gap
    Reflection,
}

impl QueryOrigin {
    /// Origin implied by a rationale string, for queries that arrive without
    /// an explicit tag.
    pub fn from_rationale(rationale: &str) -> Self {
        if rationale.contains(REFLECTION_RATIONALE) {
            QueryOrigin::Reflection
        } else {
            QueryOrigin::Initial
        }
    }
}

/// One search query aimed at one report section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Query {
    #[serde(rename = "query")]
    pub text: String,
    #[serde(rename = "report_section")]
    pub section: String,
    pub rationale: String,
    pub origin: QueryOrigin,
}

impl Query {
    pub fn new(
        text: impl Into<String>,
        section: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            section: section.into(),
            rationale: rationale.into(),
            origin: QueryOrigin::Initial,
        }
    }

    pub fn reflection(text: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            section: section.into(),
            rationale: REFLECTION_RATIONALE.to_string(),
            origin: QueryOrigin::Reflection,
        }
    }

    pub fn is_reflection(&self) -> bool {
        self.origin == QueryOrigin::Reflection
    }
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Wire {
            query: String,
            #[serde(default, alias = "section")]
            report_section: String,
            #[serde(default)]
            rationale: String,
            #[serde(default)]
            origin: Option<QueryOrigin>,
        }

        let wire = Wire::deserialize(deserializer)?;
        let origin = wire
            .origin
            .unwrap_or_else(|| QueryOrigin::from_rationale(&wire.rationale));

        let section = match wire.report_section.trim() {
            "" => UNASSIGNED_SECTION.to_string(),
            name => name.to_string(),
        };

        Ok(Query {
            text: wire.query,
            section,
            rationale: wire.rationale,
            origin,
        })
    }
}
