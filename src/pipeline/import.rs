//! Bulk import of a local dataset through the admin import endpoint.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{CatalogApi, ImportSummary};
use crate::dataset::{self, DatasetSource};
use crate::error::BatchError;

/// Number of server error strings shown in a summary.
pub const ERROR_PREVIEW_LIMIT: usize = 10;

/// Outcome of one import run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub source: String,
    /// Puzzles read from disk.
    pub loaded: usize,
    /// Puzzles sent after applying the limit.
    pub submitted: usize,
    #[serde(flatten)]
    pub summary: ImportSummary,
}

impl ImportReport {
    /// The first `limit` server errors and how many were left out.
    pub fn error_preview(&self, limit: usize) -> (&[String], usize) {
        let shown = self.summary.errors.len().min(limit);
        (
            &self.summary.errors[..shown],
            self.summary.errors.len() - shown,
        )
    }
}

/// Loads a dataset, merges its solutions and submits it in one call.
pub struct BulkImporter {
    catalog: Arc<dyn CatalogApi>,
    data_dir: PathBuf,
    limit: Option<usize>,
}

impl BulkImporter {
    pub fn new(catalog: Arc<dyn CatalogApi>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            data_dir: data_dir.into(),
            limit: None,
        }
    }

    /// Submit only the first `limit` puzzles, in id order.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Runs the import.
    ///
    /// # Errors
    ///
    /// - `BatchError::Dataset` if the challenges file is missing or unreadable;
    ///   no network call is made in that case
    /// - `BatchError::Authorization` on a 401/403
    /// - `BatchError::Gateway` for any other failed call
    pub async fn run(&self, source: &DatasetSource) -> Result<ImportReport, BatchError> {
        let puzzles = dataset::load(&self.data_dir, source)?;
        let loaded = puzzles.len();

        let puzzles = match self.limit {
            Some(limit) if limit < loaded => {
                warn!(limit, loaded, "Limiting import");
                dataset::take_first(puzzles, limit)
            }
            _ => puzzles,
        };

        let source_name = source.to_string();
        if puzzles.is_empty() {
            warn!(source = %source_name, "Nothing to import");
            return Ok(ImportReport {
                source: source_name,
                loaded,
                submitted: 0,
                summary: ImportSummary::default(),
            });
        }

        info!(source = %source_name, count = puzzles.len(), "Uploading puzzles");
        let summary = self.catalog.bulk_import(&source_name, &puzzles).await?;

        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            failed = summary.failed,
            "Import complete"
        );

        Ok(ImportReport {
            source: source_name,
            loaded,
            submitted: puzzles.len(),
            summary,
        })
    }
}
