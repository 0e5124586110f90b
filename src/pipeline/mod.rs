//! Batch pipeline: configuration, pacing, orchestration and reporting.
//!
//! The orchestrator is strictly sequential. Each unit of work is fully
//! resolved before the next begins, and the configured delay caps the rate of
//! calls against the remote service.

pub mod config;
pub mod import;
pub mod orchestrator;
pub mod pacing;
pub mod report;

pub use config::{ConfigError, PipelineConfig};
pub use import::{BulkImporter, ImportReport, ERROR_PREVIEW_LIMIT};
pub use orchestrator::{BatchOrchestrator, BatchSettings};
pub use pacing::{cancel_on_ctrl_c, Pacer};
pub use report::{BatchReport, FailureStage, Termination, UnitFailure, UnitRecord, UnitState};
