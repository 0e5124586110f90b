//! End-to-end tests for the batch orchestrator and the retag loop against an
//! in-memory catalog.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use puzzle_forge::catalog::{
    CatalogApi, CreatePuzzle, ImportSummary, Job, JobStatus, PuzzleOutcome, PuzzleSummary,
};
use puzzle_forge::concepts::{Concept, ConceptList, ConceptSource, StaticConceptSource};
use puzzle_forge::dataset::ChallengeSet;
use puzzle_forge::error::{BatchError, ConceptError, GatewayError};
use puzzle_forge::maintenance::TagMigration;
use puzzle_forge::pipeline::{
    BatchOrchestrator, BatchSettings, FailureStage, Termination, UnitState,
};

/// Scripted catalog. Behaviour is keyed on the concept text.
#[derive(Default)]
struct FakeCatalog {
    calls: Mutex<Vec<String>>,
    job_errors: Vec<(String, u16)>,
    existing: HashSet<String>,
    puzzle_errors: HashSet<String>,
    cancel_on_job: Option<(usize, CancellationToken)>,
    puzzles: Vec<PuzzleSummary>,
    patch_status: Option<u16>,
    patched: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeCatalog {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn fail_job(mut self, concept: &str, status: u16) -> Self {
        self.job_errors.push((concept.to_string(), status));
        self
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn list_puzzles(&self) -> Result<Vec<PuzzleSummary>, GatewayError> {
        self.calls.lock().unwrap().push("list".to_string());
        Ok(self.puzzles.clone())
    }

    async fn create_job(&self, concept: &Concept, model: &str) -> Result<Job, GatewayError> {
        let job_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(format!("job:{}", concept));
            calls.iter().filter(|c| c.starts_with("job:")).count()
        };

        if let Some((_, status)) = self.job_errors.iter().find(|(c, _)| c == concept.as_str()) {
            return Err(GatewayError::from_status(*status, "rejected"));
        }

        if let Some((after, token)) = &self.cancel_on_job {
            if job_number == *after {
                token.cancel();
            }
        }

        Ok(Job {
            id: format!("job-{job_number}"),
            concept: concept.to_string(),
            model: Some(model.to_string()),
            status: JobStatus::Pending,
            puzzle_id: None,
            error_message: None,
            created_at: None,
        })
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, GatewayError> {
        Err(GatewayError::from_status(404, format!("no job {job_id}")))
    }

    async fn create_puzzle(&self, request: &CreatePuzzle) -> Result<PuzzleOutcome, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("puzzle:{}", request.job_id));

        if self.puzzle_errors.contains(&request.idea) {
            return Ok(PuzzleOutcome::Failed {
                reason: "model refused".to_string(),
            });
        }
        let puzzle_id = format!("puzzle-for-{}", request.job_id);
        if self.existing.contains(&request.idea) {
            Ok(PuzzleOutcome::AlreadyExisted { puzzle_id })
        } else {
            Ok(PuzzleOutcome::Created { puzzle_id })
        }
    }

    async fn patch_tags(&self, puzzle_id: &str, tags: &[String]) -> Result<(), GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("patch:{puzzle_id}"));
        if let Some(status) = self.patch_status {
            return Err(GatewayError::from_status(status, "patch refused"));
        }
        self.patched
            .lock()
            .unwrap()
            .push((puzzle_id.to_string(), tags.to_vec()));
        Ok(())
    }

    async fn bulk_import(
        &self,
        _source: &str,
        puzzles: &ChallengeSet,
    ) -> Result<ImportSummary, GatewayError> {
        Ok(ImportSummary {
            imported: puzzles.len(),
            ..ImportSummary::default()
        })
    }
}

struct BrokenSource;

#[async_trait]
impl ConceptSource for BrokenSource {
    async fn generate(&self, _count: usize) -> Result<ConceptList, ConceptError> {
        Err(ConceptError::EmptyResponse)
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

fn settings(delay: Duration) -> BatchSettings {
    BatchSettings {
        puzzle_model: "test-model".to_string(),
        puzzle_api_key: None,
        delay,
    }
}

fn concepts(texts: &[&str]) -> ConceptList {
    ConceptList::new(texts.iter().map(|t| Concept::from(*t)).collect(), texts.len())
}

fn tags(values: &[&str]) -> Option<Vec<String>> {
    Some(values.iter().map(|s| s.to_string()).collect())
}

#[tokio::test]
async fn test_job_failure_does_not_stop_later_units() {
    let catalog = Arc::new(FakeCatalog::default().fail_job("b", 500));
    let orchestrator = BatchOrchestrator::new(catalog.clone(), settings(Duration::ZERO));

    let report = orchestrator.run(&concepts(&["a", "b", "c"])).await;

    assert_eq!(report.termination, Termination::Completed);
    assert_eq!(report.attempted, 3);
    assert_eq!(report.jobs_created, 2);
    assert_eq!(report.created, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.failures[0].stage, FailureStage::Job);

    // No puzzle call for the unit whose job failed
    assert_eq!(
        catalog.calls(),
        vec![
            "job:a",
            "puzzle:job-1",
            "job:b",
            "job:c",
            "puzzle:job-3",
        ]
    );
}

#[tokio::test]
async fn test_existing_puzzle_counts_as_success() {
    let mut catalog = FakeCatalog::default();
    catalog.existing.insert("a".to_string());
    let orchestrator = BatchOrchestrator::new(Arc::new(catalog), settings(Duration::ZERO));

    let report = orchestrator.run(&concepts(&["a", "b"])).await;

    assert_eq!(report.created, 1);
    assert_eq!(report.already_existing, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.success_rate(), Some(1.0));
    assert_eq!(report.units[0].state, UnitState::PuzzleExists);
    assert_eq!(report.units[1].state, UnitState::PuzzleCreated);
}

#[tokio::test]
async fn test_error_payload_on_success_status_is_a_puzzle_failure() {
    let mut catalog = FakeCatalog::default();
    catalog.puzzle_errors.insert("b".to_string());
    let orchestrator = BatchOrchestrator::new(Arc::new(catalog), settings(Duration::ZERO));

    let report = orchestrator.run(&concepts(&["a", "b"])).await;

    assert_eq!(report.jobs_created, 2);
    assert_eq!(report.created, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].stage, FailureStage::Puzzle);
    assert_eq!(report.failures[0].reason, "model refused");
    assert_eq!(report.success_rate(), Some(0.5));
}

#[tokio::test]
async fn test_empty_batch_makes_no_calls() {
    let catalog = Arc::new(FakeCatalog::default());
    let orchestrator = BatchOrchestrator::new(catalog.clone(), settings(Duration::ZERO));

    let report = orchestrator.run(&ConceptList::new(Vec::new(), 5)).await;

    assert_eq!(report.attempted, 0);
    assert_eq!(report.shortfall(), 5);
    assert_eq!(report.success_rate(), None);
    assert_eq!(report.termination, Termination::Completed);
    assert!(catalog.calls().is_empty());
}

#[tokio::test]
async fn test_rejected_credentials_stop_the_batch() {
    let catalog = Arc::new(FakeCatalog::default().fail_job("b", 401));
    let orchestrator = BatchOrchestrator::new(catalog.clone(), settings(Duration::ZERO));

    let report = orchestrator.run(&concepts(&["a", "b", "c", "d"])).await;

    assert_eq!(report.attempted, 2);
    assert_eq!(report.created, 1);
    assert_eq!(report.failed, 1);
    assert!(matches!(
        report.termination,
        Termination::Unauthorized { status: 401, .. }
    ));
    assert_eq!(catalog.count_calls("job:"), 2);
    assert!(matches!(
        report.ensure_authorized(),
        Err(BatchError::Authorization { status: 401, .. })
    ));
}

#[tokio::test]
async fn test_interrupt_keeps_partial_results() {
    let token = CancellationToken::new();
    let catalog = Arc::new(FakeCatalog {
        cancel_on_job: Some((2, token.clone())),
        ..FakeCatalog::default()
    });
    let orchestrator = BatchOrchestrator::new(catalog.clone(), settings(Duration::ZERO))
        .with_cancellation(token);

    let report = orchestrator.run(&concepts(&["a", "b", "c"])).await;

    assert!(report.is_interrupted());
    assert_eq!(report.attempted, 2);
    assert_eq!(report.created, 1);
    assert_eq!(report.jobs_created, 2);
    assert_eq!(report.units[1].state, UnitState::JobCreated);
    assert_eq!(report.units[1].job_id.as_deref(), Some("job-2"));
    assert!(report.ensure_authorized().is_ok());
    assert_eq!(catalog.calls(), vec!["job:a", "puzzle:job-1", "job:b"]);
}

#[tokio::test(start_paused = true)]
async fn test_delay_separates_every_call() {
    let catalog = Arc::new(FakeCatalog::default());
    let orchestrator = BatchOrchestrator::new(catalog.clone(), settings(Duration::from_secs(2)));
    let started = tokio::time::Instant::now();

    let report = orchestrator.run(&concepts(&["a", "b"])).await;

    // Four calls, three gaps
    assert_eq!(report.created, 2);
    assert_eq!(catalog.calls().len(), 4);
    assert!(started.elapsed() >= Duration::from_secs(6));
}

#[tokio::test]
async fn test_source_and_run_with_builtin_concepts() {
    let catalog = Arc::new(FakeCatalog::default());
    let orchestrator = BatchOrchestrator::new(catalog.clone(), settings(Duration::ZERO));

    let report = orchestrator
        .source_and_run(&StaticConceptSource::builtin(), 3)
        .await
        .expect("builtin concepts never fail");

    assert_eq!(report.requested, 3);
    assert_eq!(report.sourced, 3);
    assert_eq!(report.created, 3);
}

#[tokio::test]
async fn test_sourcing_failure_aborts_before_any_call() {
    let catalog = Arc::new(FakeCatalog::default());
    let orchestrator = BatchOrchestrator::new(catalog.clone(), settings(Duration::ZERO));

    let result = orchestrator.source_and_run(&BrokenSource, 3).await;

    assert!(matches!(result, Err(BatchError::Sourcing(_))));
    assert!(catalog.calls().is_empty());
}

fn legacy_catalog() -> FakeCatalog {
    FakeCatalog {
        puzzles: vec![
            PuzzleSummary {
                id: "p1".to_string(),
                tags: tags(&["arc", "2024", "training"]),
                idea: None,
            },
            PuzzleSummary {
                id: "p2".to_string(),
                tags: tags(&["ARC-AGI 2025", "evaluation"]),
                idea: None,
            },
            PuzzleSummary {
                id: "p3".to_string(),
                tags: None,
                idea: None,
            },
            PuzzleSummary {
                id: "p4".to_string(),
                tags: tags(&["arc", "2025", "test"]),
                idea: None,
            },
        ],
        ..FakeCatalog::default()
    }
}

#[tokio::test]
async fn test_retag_dry_run_patches_nothing() {
    let catalog = Arc::new(legacy_catalog());
    let report = TagMigration::new(catalog.clone())
        .with_dry_run(true)
        .run()
        .await
        .expect("listing succeeds");

    assert!(report.dry_run);
    assert_eq!(report.total, 4);
    assert_eq!(report.changes.len(), 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.fixed, 0);
    assert_eq!(catalog.count_calls("patch:"), 0);
}

#[tokio::test]
async fn test_retag_applies_canonical_tags() {
    let catalog = Arc::new(legacy_catalog());
    let report = TagMigration::new(catalog.clone())
        .run()
        .await
        .expect("listing succeeds");

    assert_eq!(report.fixed, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(
        *catalog.patched.lock().unwrap(),
        vec![
            (
                "p1".to_string(),
                vec!["ARC-AGI 2024".to_string(), "training".to_string()]
            ),
            (
                "p4".to_string(),
                vec!["ARC-AGI 2025".to_string(), "test".to_string()]
            ),
        ]
    );
}

#[tokio::test]
async fn test_retag_stops_on_rejected_credentials() {
    let catalog = Arc::new(FakeCatalog {
        patch_status: Some(403),
        ..legacy_catalog()
    });
    let report = TagMigration::new(catalog.clone())
        .run()
        .await
        .expect("listing succeeds");

    assert_eq!(report.failed, 1);
    assert_eq!(catalog.count_calls("patch:"), 1);
    assert!(matches!(
        report.termination,
        Termination::Unauthorized { status: 403, .. }
    ));
    assert!(report.ensure_authorized().is_err());
}

#[tokio::test]
async fn test_retag_continues_past_server_errors() {
    let catalog = Arc::new(FakeCatalog {
        patch_status: Some(500),
        ..legacy_catalog()
    });
    let report = TagMigration::new(catalog.clone())
        .run()
        .await
        .expect("listing succeeds");

    assert_eq!(report.failed, 2);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(catalog.count_calls("patch:"), 2);
    assert_eq!(report.termination, Termination::Completed);
}
