//! Legacy tag normalization.
//!
//! Legacy records carry loose tags such as `["arc", "2024", "training"]`.
//! The canonical form is `["ARC-AGI 2024", "training"]`.

use std::sync::LazyLock;

use regex::Regex;

use crate::dataset::Split;

static YEAR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}$").expect("year tag pattern is valid"));

/// Naming scheme for canonical tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagScheme {
    /// Bare legacy category token, dropped case-insensitively.
    pub category_token: String,
    /// Canonical category label; the first canonical tag is `"{label} {year}"`.
    pub canonical_label: String,
}

impl Default for TagScheme {
    fn default() -> Self {
        Self {
            category_token: "arc".to_string(),
            canonical_label: "ARC-AGI".to_string(),
        }
    }
}

/// Result of normalizing one tag list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub tags: Vec<String>,
    pub changed: bool,
}

impl Normalized {
    fn unchanged(tags: &[String]) -> Self {
        Self {
            tags: tags.to_vec(),
            changed: false,
        }
    }
}

impl TagScheme {
    /// Maps a legacy tag list to its canonical form. Pure.
    ///
    /// Left unchanged when the list has fewer than two tags, already carries
    /// the canonical label, yields neither a year nor a split, or rebuilds to
    /// the same list.
    pub fn normalize(&self, tags: &[String]) -> Normalized {
        if tags.len() < 2 {
            return Normalized::unchanged(tags);
        }

        if tags.iter().any(|t| t.starts_with(&self.canonical_label)) {
            return Normalized::unchanged(tags);
        }

        let mut year: Option<&str> = None;
        let mut split: Option<Split> = None;

        for tag in tags {
            if tag.eq_ignore_ascii_case(&self.category_token) {
                continue;
            }
            if year.is_none() && YEAR_TAG.is_match(tag) {
                year = Some(tag.as_str());
            } else if split.is_none() {
                split = tag.parse::<Split>().ok();
            }
        }

        let mut rebuilt = Vec::with_capacity(2);
        if let Some(year) = year {
            rebuilt.push(format!("{} {}", self.canonical_label, year));
        }
        if let Some(split) = split {
            rebuilt.push(split.to_string());
        }

        if rebuilt.is_empty() || rebuilt == tags {
            return Normalized::unchanged(tags);
        }

        Normalized {
            tags: rebuilt,
            changed: true,
        }
    }
}

/// Normalizes with the default ARC scheme. Returns `(tags, changed)`.
pub fn normalize_tags(tags: &[String]) -> (Vec<String>, bool) {
    let normalized = TagScheme::default().normalize(tags);
    (normalized.tags, normalized.changed)
}
