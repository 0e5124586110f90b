//! Dataset source names and on-disk file conventions.
//!
//! A source is written `{category}-{year}-{split}`, e.g. `arc-2024-training`.
//! Files for it live under `{root}/{category}-{year}/`:
//!
//! - `arc-agi_{split}_challenges.json` (required)
//! - `arc-agi_{split}_solutions.json` (absent for the `test` split)

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// File name prefix shared by every challenge and solution file.
const FILE_PREFIX: &str = "arc-agi";

/// Human-readable description of a valid source, used in errors.
const EXPECTED_SOURCE: &str =
    "{category}-{year}-{split} with split training, evaluation or test (e.g. arc-2024-training)";

/// Dataset partition label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Training,
    Evaluation,
    Test,
}

impl Split {
    pub fn all() -> [Split; 3] {
        [Split::Training, Split::Evaluation, Split::Test]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Training => "training",
            Split::Evaluation => "evaluation",
            Split::Test => "test",
        }
    }

    /// Whether the public dataset ships solutions for this split.
    pub fn has_solutions(&self) -> bool {
        !matches!(self, Split::Test)
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "training" => Ok(Split::Training),
            "evaluation" => Ok(Split::Evaluation),
            "test" => Ok(Split::Test),
            other => Err(format!("unknown split '{other}'")),
        }
    }
}

/// A validated dataset source such as `arc-2025-evaluation`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetSource {
    pub category: String,
    pub year: String,
    pub split: Split,
}

impl DatasetSource {
    pub fn new(category: impl Into<String>, year: impl Into<String>, split: Split) -> Self {
        Self {
            category: category.into(),
            year: year.into(),
            split,
        }
    }

    /// Parses and validates a source name.
    pub fn parse(name: &str) -> Result<Self, DatasetError> {
        let invalid = || DatasetError::InvalidSource {
            source_name: name.to_string(),
            expected: EXPECTED_SOURCE.to_string(),
        };

        let mut parts = name.splitn(3, '-');
        let category = parts.next().filter(|c| is_category_token(c)).ok_or_else(invalid)?;
        let year = parts.next().filter(|y| is_year_token(y)).ok_or_else(invalid)?;
        let split = parts
            .next()
            .and_then(|s| s.parse::<Split>().ok())
            .ok_or_else(invalid)?;

        Ok(Self::new(category, year, split))
    }

    /// Directory holding this source's files.
    pub fn directory(&self, root: &Path) -> PathBuf {
        root.join(format!("{}-{}", self.category, self.year))
    }

    pub fn challenges_path(&self, root: &Path) -> PathBuf {
        self.directory(root)
            .join(format!("{FILE_PREFIX}_{}_challenges.json", self.split))
    }

    /// Solutions file path, or `None` for splits published without solutions.
    pub fn solutions_path(&self, root: &Path) -> Option<PathBuf> {
        self.split.has_solutions().then(|| {
            self.directory(root)
                .join(format!("{FILE_PREFIX}_{}_solutions.json", self.split))
        })
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.category, self.year, self.split)
    }
}

impl FromStr for DatasetSource {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_category_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

fn is_year_token(s: &str) -> bool {
    s.len() == 4 && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_sources() {
        let source = DatasetSource::parse("arc-2024-training").expect("valid");
        assert_eq!(source.category, "arc");
        assert_eq!(source.year, "2024");
        assert_eq!(source.split, Split::Training);
        assert_eq!(source.to_string(), "arc-2024-training");

        let source: DatasetSource = "arc-2025-test".parse().expect("valid");
        assert_eq!(source.split, Split::Test);
    }

    #[test]
    fn test_parse_rejects_malformed_sources() {
        for name in ["arc-2024", "arc-24-training", "arc-2024-validation", "ARC-2024-training", ""] {
            let err = DatasetSource::parse(name).expect_err(name);
            assert!(matches!(err, DatasetError::InvalidSource { .. }), "{name}");
        }
    }

    #[test]
    fn test_file_paths_follow_convention() {
        let root = Path::new("data");
        let source = DatasetSource::parse("arc-2024-evaluation").expect("valid");

        assert_eq!(
            source.challenges_path(root),
            PathBuf::from("data/arc-2024/arc-agi_evaluation_challenges.json")
        );
        assert_eq!(
            source.solutions_path(root),
            Some(PathBuf::from("data/arc-2024/arc-agi_evaluation_solutions.json"))
        );
    }

    #[test]
    fn test_test_split_has_no_solutions_file() {
        let source = DatasetSource::parse("arc-2025-test").expect("valid");
        assert_eq!(source.solutions_path(Path::new("data")), None);
    }
}
