//! Batch report: per-unit records and aggregate counters for one run.
//!
//! The report is a plain value owned by the control loop. Each finished unit
//! is folded in with [`BatchReport::record`]; nothing else mutates it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::concepts::Concept;
use crate::error::BatchError;

/// Where a unit of work ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    /// Not started.
    Pending,
    /// Job exists; the puzzle call was never resolved (interrupted run).
    JobCreated,
    PuzzleCreated,
    PuzzleExists,
    Failed,
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitState::Pending => write!(f, "pending"),
            UnitState::JobCreated => write!(f, "job_created"),
            UnitState::PuzzleCreated => write!(f, "puzzle_created"),
            UnitState::PuzzleExists => write!(f, "puzzle_exists"),
            UnitState::Failed => write!(f, "failed"),
        }
    }
}

/// The remote call a unit failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Job,
    Puzzle,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Job => write!(f, "create job"),
            FailureStage::Puzzle => write!(f, "create puzzle"),
        }
    }
}

/// Outcome of one concept's trip through the job/puzzle protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitRecord {
    /// Zero-based position in the concept list.
    pub index: usize,
    pub concept: Concept,
    pub state: UnitState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub puzzle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<FailureStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UnitRecord {
    pub fn pending(index: usize, concept: Concept) -> Self {
        Self {
            index,
            concept,
            state: UnitState::Pending,
            job_id: None,
            puzzle_id: None,
            stage: None,
            error: None,
        }
    }

    pub fn job_created(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self.state = UnitState::JobCreated;
        self
    }

    pub fn puzzle_created(mut self, puzzle_id: impl Into<String>) -> Self {
        self.puzzle_id = Some(puzzle_id.into());
        self.state = UnitState::PuzzleCreated;
        self
    }

    pub fn puzzle_exists(mut self, puzzle_id: impl Into<String>) -> Self {
        self.puzzle_id = Some(puzzle_id.into());
        self.state = UnitState::PuzzleExists;
        self
    }

    pub fn failed(mut self, stage: FailureStage, error: impl Into<String>) -> Self {
        self.stage = Some(stage);
        self.error = Some(error.into());
        self.state = UnitState::Failed;
        self
    }
}

/// A failed unit, as listed in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    pub index: usize,
    pub concept: Concept,
    pub stage: FailureStage,
    pub reason: String,
}

/// Why the run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// Every unit was attempted.
    Completed,
    /// An interrupt stopped the run before the next unit.
    Interrupted,
    /// The remote service rejected the credentials; remaining units skipped.
    Unauthorized { status: u16, message: String },
}

/// Aggregate result of one batch run. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Concepts asked of the source.
    pub requested: usize,
    /// Concepts the source actually returned.
    pub sourced: usize,
    pub attempted: usize,
    pub jobs_created: usize,
    pub created: usize,
    pub already_existing: usize,
    pub failed: usize,
    pub units: Vec<UnitRecord>,
    pub failures: Vec<UnitFailure>,
    pub termination: Termination,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchReport {
    pub fn new(requested: usize, sourced: usize) -> Self {
        Self {
            requested,
            sourced,
            attempted: 0,
            jobs_created: 0,
            created: 0,
            already_existing: 0,
            failed: 0,
            units: Vec::new(),
            failures: Vec::new(),
            termination: Termination::Completed,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Folds a finished (or interrupted) unit into the counters.
    pub fn record(&mut self, unit: UnitRecord) {
        self.attempted += 1;
        if unit.job_id.is_some() {
            self.jobs_created += 1;
        }

        match unit.state {
            UnitState::PuzzleCreated => self.created += 1,
            UnitState::PuzzleExists => self.already_existing += 1,
            UnitState::Failed => {
                self.failed += 1;
                self.failures.push(UnitFailure {
                    index: unit.index,
                    concept: unit.concept.clone(),
                    stage: unit.stage.unwrap_or(FailureStage::Job),
                    reason: unit.error.clone().unwrap_or_default(),
                });
            }
            UnitState::Pending | UnitState::JobCreated => {}
        }

        self.units.push(unit);
    }

    /// Marks the report final.
    pub fn finish(&mut self, termination: Termination) {
        self.termination = termination;
        self.finished_at = Some(Utc::now());
    }

    /// Created plus already existing.
    pub fn succeeded(&self) -> usize {
        self.created + self.already_existing
    }

    /// `succeeded / attempted`, or `None` for an empty batch.
    pub fn success_rate(&self) -> Option<f64> {
        (self.attempted > 0).then(|| self.succeeded() as f64 / self.attempted as f64)
    }

    /// Concepts the source came up short by.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.sourced)
    }

    pub fn is_interrupted(&self) -> bool {
        self.termination == Termination::Interrupted
    }

    /// Converts an authorization stop into the fatal error.
    ///
    /// Unit failures and interrupts are not errors.
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
