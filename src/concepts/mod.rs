//! Concept sourcing for batch puzzle generation.
//!
//! A concept is a one or two sentence description of a grid transformation
//! rule. The batch orchestrator consumes an ordered [`ConceptList`] and never
//! sees where it came from:
//!
//! - [`LlmConceptSource`] asks a generative service for a JSON array of concepts
//! - [`StaticConceptSource`] returns a fixed list (built-in or read from a file)

mod fixed;
mod generative;
mod taxonomy;

pub use fixed::{StaticConceptSource, BUILTIN_CONCEPTS};
pub use generative::{parse_concepts, ConceptSourceConfig, LlmConceptSource};
pub use taxonomy::TransformationCategory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ConceptError;

/// A natural-language description of a transformation rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Concept(String);

impl Concept {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns at most `max_chars` characters, for progress lines.
    pub fn preview(&self, max_chars: usize) -> String {
        if self.0.chars().count() <= max_chars {
            self.0.clone()
        } else {
            let head: String = self.0.chars().take(max_chars).collect();
            format!("{head}...")
        }
    }
}

impl std::fmt::Display for Concept {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Concept {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Concept {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// Ordered concepts produced for one run, with the size that was asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptList {
    pub concepts: Vec<Concept>,
    pub requested: usize,
}

impl ConceptList {
    pub fn new(concepts: Vec<Concept>, requested: usize) -> Self {
        Self {
            concepts,
            requested,
        }
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Number of concepts missing relative to the request. Zero when satisfied.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.concepts.len())
    }
}

/// A producer of concepts.
#[async_trait]
pub trait ConceptSource: Send + Sync {
    /// Produces at most `count` concepts, in the order they should be processed.
    ///
    /// A shorter list is not an error; the shortfall is visible on the result.
    async fn generate(&self, count: usize) -> Result<ConceptList, ConceptError>;

    /// Short identifier for logs and reports.
    fn name(&self) -> &'static str;
}
