//! Read-modify-write retag loop over the catalog.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::CatalogApi;
use crate::error::{BatchError, GatewayError};
use crate::pipeline::Termination;

use super::TagScheme;

/// A tag rewrite that was applied (or would be, in a dry run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagChange {
    pub puzzle_id: String,
    pub old_tags: Vec<String>,
    pub new_tags: Vec<String>,
}

/// A rewrite the server refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetagFailure {
    pub puzzle_id: String,
    pub reason: String,
}

/// Counters for one retag run.
#[derive(Debug, Clone, Serialize)]
pub struct RetagReport {
    pub dry_run: bool,
    pub total: usize,
    pub fixed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub changes: Vec<TagChange>,
    pub failures: Vec<RetagFailure>,
    pub termination: Termination,
}

impl RetagReport {
    fn new(total: usize, dry_run: bool) -> Self {
        Self {
            dry_run,
            total,
            fixed: 0,
            skipped: 0,
            failed: 0,
            changes: Vec::new(),
            failures: Vec::new(),
            termination: Termination::Completed,
        }
    }

    /// Converts an authorization stop into the fatal error.
    pub fn ensure_authorized(&self) -> Result<(), BatchError> {
        match &self.termination {
            Termination::Unauthorized { status, message } => Err(BatchError::Authorization {
                status: *status,
                message: message.clone(),
            }),
            _ => Ok(()),
        }
    }
}

/// Rewrites legacy tags on every catalog puzzle that needs it.
pub struct TagMigration {
    catalog: Arc<dyn CatalogApi>,
    scheme: TagScheme,
    dry_run: bool,
    cancel: CancellationToken,
}

impl TagMigration {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self {
            catalog,
            scheme: TagScheme::default(),
            dry_run: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_scheme(mut self, scheme: TagScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Compute changes without patching anything.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Lists every puzzle, normalizes its tags and patches the changed ones.
    ///
    /// A refused patch is recorded and the loop continues, except for a
    /// credential rejection which stops it.
    ///
    /// # Errors
    ///
    /// Fails only if the puzzle listing itself fails.
    pub async fn run(&self) -> Result<RetagReport, BatchError> {
        info!("Fetching all puzzles");
        let puzzles = self.catalog.list_puzzles().await?;
        info!(count = puzzles.len(), dry_run = self.dry_run, "Puzzles fetched");

        let mut report = RetagReport::new(puzzles.len(), self.dry_run);

        for puzzle in puzzles {
            if self.cancel.is_cancelled() {
                warn!(fixed = report.fixed, "Retag interrupted");
                report.termination = Termination::Interrupted;
                return Ok(report);
            }

            let old_tags = puzzle.tags.unwrap_or_default();
            let normalized = self.scheme.normalize(&old_tags);
            if !normalized.changed {
                report.skipped += 1;
                continue;
            }

            info!(
                puzzle_id = %puzzle.id,
                old = ?old_tags,
                new = ?normalized.tags,
                "Fixing tags"
            );
            let change = TagChange {
                puzzle_id: puzzle.id,
                old_tags,
                new_tags: normalized.tags,
            };

            if self.dry_run {
                report.changes.push(change);
                continue;
            }

            match self.catalog.patch_tags(&change.puzzle_id, &change.new_tags).await {
                Ok(()) => {
                    report.fixed += 1;
                    report.changes.push(change);
                }
                Err(GatewayError::Unauthorized { status, body }) => {
                    report.failed += 1;
                    report.failures.push(RetagFailure {
                        puzzle_id: change.puzzle_id,
                        reason: body.clone(),
                    });
                    report.termination = Termination::Unauthorized {
                        status,
                        message: body,
                    };
                    return Ok(report);
                }
                Err(err) => {
                    warn!(puzzle_id = %change.puzzle_id, error = %err, "Tag update failed");
                    report.failed += 1;
                    report.failures.push(RetagFailure {
                        puzzle_id: change.puzzle_id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            fixed = report.fixed,
            skipped = report.skipped,
            failed = report.failed,
            "Retag complete"
        );
        Ok(report)
    }
}
