//! Batch orchestrator for the two-phase job → puzzle protocol.
//!
//! Units are processed strictly in order, one at a time:
//!
//! 1. `create_job(concept)`; on failure the unit is Failed and never reaches
//!    puzzle creation
//! 2. pacing delay
//! 3. `create_puzzle(job_id)`, classified as created, already existing or failed
//! 4. pacing delay before the next unit's first call
//!
//! A unit failure never stops the batch. Credential rejection does, since
//! every remaining call would fail the same way. An interrupt stops before the
//! next call; the in-flight call is abandoned and the partial report returned.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogApi, CreatePuzzle, PuzzleOutcome};
use crate::concepts::{Concept, ConceptList, ConceptSource};
use crate::error::{BatchError, GatewayError};

use super::config::PipelineConfig;
use super::pacing::Pacer;
use super::report::{BatchReport, FailureStage, Termination, UnitRecord};

/// Number of concepts echoed to the log after sourcing.
const PREVIEW_COUNT: usize = 5;

/// Characters of each concept shown in progress lines.
const PREVIEW_CHARS: usize = 60;

/// Settings the orchestrator takes from [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub puzzle_model: String,
    pub puzzle_api_key: Option<String>,
    pub delay: std::time::Duration,
}

impl From<&PipelineConfig> for BatchSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            puzzle_model: config.puzzle_model.clone(),
            puzzle_api_key: config.puzzle_api_key.clone(),
            delay: config.delay,
        }
    }
}

/// How a single unit ended, from the loop's point of view.
enum UnitEnd {
    Finished(UnitRecord),
    Unauthorized {
        unit: UnitRecord,
        status: u16,
        message: String,
    },
    /// Interrupted; carries the unit if any call had already completed.
    Interrupted(Option<UnitRecord>),
}

/// Drives concepts through the catalog's job/puzzle protocol.
pub struct BatchOrchestrator {
    catalog: Arc<dyn CatalogApi>,
    settings: BatchSettings,
    cancel: CancellationToken,
}

impl BatchOrchestrator {
    pub fn new(catalog: Arc<dyn CatalogApi>, settings: BatchSettings) -> Self {
        Self {
            catalog,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(catalog: Arc<dyn CatalogApi>, config: &PipelineConfig) -> Self {
        Self::new(catalog, BatchSettings::from(config))
    }

    /// Use an externally owned cancellation token (e.g. tied to Ctrl-C).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Sources `count` concepts, then runs them.
    ///
    /// # Errors
    ///
    /// Returns `BatchError::Sourcing` if no usable concept list could be
    /// produced. Everything after sourcing is reported, not raised.
    pub async fn source_and_run(
        &self,
        source: &dyn ConceptSource,
        count: usize,
    ) -> Result<BatchReport, BatchError> {
        info!(source = source.name(), count, "Sourcing concepts");
        let concepts = source.generate(count).await?;

        if concepts.shortfall() > 0 {
            warn!(
                requested = concepts.requested,
                sourced = concepts.len(),
                "Proceeding with fewer concepts than requested"
            );
        }
        for (i, concept) in concepts.concepts.iter().take(PREVIEW_COUNT).enumerate() {
            info!("  {}. {}", i + 1, concept.preview(PREVIEW_CHARS));
        }
        if concepts.len() > PREVIEW_COUNT {
            info!("  ... and {} more", concepts.len() - PREVIEW_COUNT);
        }

        Ok(self.run(&concepts).await)
    }

    /// Runs every concept through the protocol and returns the report.
    ///
    /// Never fails: unit failures, credential rejection and interrupts are
    /// all visible on the returned report.
    pub async fn run(&self, concepts: &ConceptList) -> BatchReport {
        let mut report = BatchReport::new(concepts.requested, concepts.len());
        let mut pacer = Pacer::new(self.settings.delay);
        let total = concepts.len();

        info!(
            total,
            model = %self.settings.puzzle_model,
            delay_ms = pacer.delay().as_millis() as u64,
            "Starting batch"
        );

        for (index, concept) in concepts.concepts.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.finish(Termination::Interrupted);
                warn!(attempted = report.attempted, total, "Batch interrupted");
                return report;
            }

            info!(
                unit = index + 1,
                total,
                concept = %concept.preview(PREVIEW_CHARS),
                "Processing concept"
            );

            match self.process_unit(index, concept, &mut pacer).await {
                UnitEnd::Finished(unit) => report.record(unit),
                UnitEnd::Unauthorized {
                    unit,
                    status,
                    message,
                } => {
                    report.record(unit);
                    error!(
                        status,
                        remaining = total - index - 1,
                        "Credentials rejected, stopping batch"
                    );
                    report.finish(Termination::Unauthorized { status, message });
                    return report;
                }
                UnitEnd::Interrupted(unit) => {
                    if let Some(unit) = unit {
                        report.record(unit);
                    }
                    report.finish(Termination::Interrupted);
                    warn!(attempted = report.attempted, total, "Batch interrupted");
                    return report;
                }
            }
        }

        report.finish(Termination::Completed);
        info!(
            attempted = report.attempted,
            created = report.created,
            existing = report.already_existing,
            failed = report.failed,
            "Batch complete"
        );
        report
    }

    async fn process_unit(&self, index: usize, concept: &Concept, pacer: &mut Pacer) -> UnitEnd {
        let unit = UnitRecord::pending(index, concept.clone());

        if !pacer.ready(&self.cancel).await {
            return UnitEnd::Interrupted(None);
        }

        let job = match self
            .cancellable(self.catalog.create_job(concept, &self.settings.puzzle_model))
            .await
        {
            None => return UnitEnd::Interrupted(None),
            Some(Ok(job)) => job,
            Some(Err(err)) => {
                warn!(unit = index + 1, error = %err, "Job creation failed");
                return self.unit_failed(unit, FailureStage::Job, err);
            }
        };

        info!(unit = index + 1, job_id = %job.id, "Job created");
        let unit = unit.job_created(&job.id);

        if !pacer.ready(&self.cancel).await {
            return UnitEnd::Interrupted(Some(unit));
        }

        let request = CreatePuzzle::new(&job.id, concept.as_str())
            .with_api_key(self.settings.puzzle_api_key.clone());

        match self.cancellable(self.catalog.create_puzzle(&request)).await {
            None => UnitEnd::Interrupted(Some(unit)),
            Some(Ok(PuzzleOutcome::Created { puzzle_id })) => {
                info!(unit = index + 1, puzzle_id = %puzzle_id, "Puzzle created");
                UnitEnd::Finished(unit.puzzle_created(puzzle_id))
            }
            Some(Ok(PuzzleOutcome::AlreadyExisted { puzzle_id })) => {
                info!(unit = index + 1, puzzle_id = %puzzle_id, "Puzzle already exists");
                UnitEnd::Finished(unit.puzzle_exists(puzzle_id))
            }
            Some(Ok(PuzzleOutcome::Failed { reason })) => {
                warn!(unit = index + 1, job_id = %job.id, reason = %reason, "Puzzle creation failed");
                UnitEnd::Finished(unit.failed(FailureStage::Puzzle, reason))
            }
            Some(Err(err)) => {
                warn!(unit = index + 1, job_id = %job.id, error = %err, "Puzzle request failed");
                self.unit_failed(unit, FailureStage::Puzzle, err)
            }
        }
    }

    fn unit_failed(&self, unit: UnitRecord, stage: FailureStage, err: GatewayError) -> UnitEnd {
        match err {
            GatewayError::Unauthorized { status, body } => UnitEnd::Unauthorized {
                unit: unit.failed(stage, format!("unauthorized ({status}): {body}")),
                status,
                message: body,
            },
            other => UnitEnd::Finished(unit.failed(stage, other.to_string())),
        }
    }

    /// Races a call against cancellation. `None` means it was abandoned.
    async fn cancellable<T>(&self, call: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!("Abandoning in-flight call");
                None
            }
            result = call => Some(result),
        }
    }
}
