//! Corrective maintenance of stored catalog records.

mod normalizer;
mod retag;

pub use normalizer::{normalize_tags, Normalized, TagScheme};
pub use retag::{RetagFailure, RetagReport, TagChange, TagMigration};
