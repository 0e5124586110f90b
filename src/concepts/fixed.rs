//! Static concept source for offline and test runs.

use std::path::Path;

use async_trait::async_trait;

use crate::error::{ConceptError, DatasetError};

use super::{Concept, ConceptList, ConceptSource};

/// Built-in concepts covering each transformation category at least once.
pub const BUILTIN_CONCEPTS: [&str; 10] = [
    "Mirror the pattern horizontally",
    "Rotate 90 degrees clockwise",
    "Invert all colors (0→9, 1→8, etc)",
    "Apply gravity - colored cells fall downward",
    "Tile the input pattern in a 2x2 grid",
    "Connect all cells of the same color with lines",
    "Fill enclosed regions with a new color",
    "Repeat the pattern vertically 3 times",
    "Extract and enlarge the central 3x3 region",
    "Swap positions of cells with colors 1 and 2",
];

/// Returns a fixed, deterministic list. Never calls out.
#[derive(Debug, Clone)]
pub struct StaticConceptSource {
    concepts: Vec<Concept>,
}

impl StaticConceptSource {
    pub fn new(concepts: Vec<Concept>) -> Self {
        Self { concepts }
    }

    /// The ten built-in concepts.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_CONCEPTS.iter().map(|c| Concept::from(*c)).collect())
    }

    /// Loads concepts from a file.
    ///
    /// A file whose content starts with `[` is read as a JSON array of
    /// strings; anything else is one concept per non-blank line.
    pub fn from_file(path: &Path) -> Result<Self, DatasetError> {
        if !path.exists() {
            return Err(DatasetError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let entries: Vec<String> = if content.trim_start().starts_with('[') {
            serde_json::from_str(&content).map_err(|source| DatasetError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            content.lines().map(str::to_string).collect()
        };

        Ok(Self::new(
            entries
                .into_iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .map(Concept::from)
                .collect(),
        ))
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

impl Default for StaticConceptSource {
    fn default() -> Self {
        Self::builtin()
    }
}

#[async_trait]
impl ConceptSource for StaticConceptSource {
    async fn generate(&self, count: usize) -> Result<ConceptList, ConceptError> {
        let concepts = self.concepts.iter().take(count).cloned().collect();
        Ok(ConceptList::new(concepts, count))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
