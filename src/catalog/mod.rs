//! Remote puzzle catalog gateway.
//!
//! [`CatalogApi`] is the seam between the batch pipeline and the remote
//! service. [`CatalogClient`] implements it over HTTP; tests substitute
//! in-memory fakes.
//!
//! Every non-2xx response becomes a [`GatewayError`] carrying the status and
//! raw body. 401 and 403 are reported as [`GatewayError::Unauthorized`].
//! An "already exists" result is a 2xx response flagged in its payload, and
//! surfaces as [`PuzzleOutcome::AlreadyExisted`].

mod client;
mod types;

pub use client::{CallTimeouts, CatalogClient};
pub use types::{CreatePuzzle, ImportSummary, Job, JobStatus, PuzzleOutcome, PuzzleSummary};

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::concepts::Concept;
use crate::dataset::ChallengeSet;
use crate::error::GatewayError;

/// Operations the pipeline needs from the remote catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// `GET /api/puzzles`
    async fn list_puzzles(&self) -> Result<Vec<PuzzleSummary>, GatewayError>;

    /// `POST /api/jobs` (admin-keyed)
    async fn create_job(&self, concept: &Concept, model: &str) -> Result<Job, GatewayError>;

    /// `GET /api/jobs/{id}`, a single read.
    async fn get_job(&self, job_id: &str) -> Result<Job, GatewayError>;

    /// `POST /api/puzzles`
    ///
    /// A 2xx response is always classified into a [`PuzzleOutcome`], including
    /// one that only carries an `error` field.
    async fn create_puzzle(&self, request: &CreatePuzzle) -> Result<PuzzleOutcome, GatewayError>;

    /// `PATCH /api/admin/puzzles/{id}` (admin-keyed)
    async fn patch_tags(&self, puzzle_id: &str, tags: &[String]) -> Result<(), GatewayError>;

    /// `POST /api/admin/puzzles/import` (admin-keyed)
    async fn bulk_import(
        &self,
        source: &str,
        puzzles: &ChallengeSet,
    ) -> Result<ImportSummary, GatewayError>;

    /// Polls [`CatalogApi::get_job`] until the job reaches a terminal status.
    ///
    /// Fails with [`GatewayError::PollTimeout`] once `timeout` has elapsed.
    /// Read errors end the poll immediately.
    async fn wait_for_job(
        &self,
        job_id: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Job, GatewayError> {
        let started = tokio::time::Instant::now();

        loop {
            let job = self.get_job(job_id).await?;
            if job.status.is_terminal() {
                return Ok(job);
            }

            if started.elapsed() + interval > timeout {
                return Err(GatewayError::PollTimeout {
                    job_id: job_id.to_string(),
                    seconds: timeout.as_secs(),
                });
            }

            debug!(job_id, status = %job.status, "Job not finished, polling again");
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports `pending` for the first `pending_reads` reads, then `final_status`.
    struct ScriptedJobs {
        pending_reads: usize,
        final_status: JobStatus,
        reads: AtomicUsize,
    }

    impl ScriptedJobs {
        fn new(pending_reads: usize) -> Self {
            Self {
                pending_reads,
                final_status: JobStatus::Completed,
                reads: AtomicUsize::new(0),
            }
        }

        fn ending_with(mut self, status: JobStatus) -> Self {
            self.final_status = status;
            self
        }
    }

    #[async_trait]
    impl CatalogApi for ScriptedJobs {
        async fn list_puzzles(&self) -> Result<Vec<PuzzleSummary>, GatewayError> {
            Ok(Vec::new())
        }

        async fn create_job(&self, _concept: &Concept, _model: &str) -> Result<Job, GatewayError> {
            unreachable!("not used")
        }

        async fn get_job(&self, job_id: &str) -> Result<Job, GatewayError> {
            let read = self.reads.fetch_add(1, Ordering::SeqCst);
            let status = if read < self.pending_reads {
                JobStatus::Pending
            } else {
                self.final_status.clone()
            };
            Ok(Job {
                id: job_id.to_string(),
                concept: "Rotate".to_string(),
                model: None,
                status,
                puzzle_id: None,
                error_message: None,
                created_at: None,
            })
        }

        async fn create_puzzle(
            &self,
            _request: &CreatePuzzle,
        ) -> Result<PuzzleOutcome, GatewayError> {
            unreachable!("not used")
        }

        async fn patch_tags(&self, _puzzle_id: &str, _tags: &[String]) -> Result<(), GatewayError> {
            unreachable!("not used")
        }

        async fn bulk_import(
            &self,
            _source: &str,
            _puzzles: &ChallengeSet,
        ) -> Result<ImportSummary, GatewayError> {
            unreachable!("not used")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_job_polls_until_terminal() {
        let api = ScriptedJobs::new(3);
        let job = api
            .wait_for_job("job-1", Duration::from_secs(2), Duration::from_secs(60))
            .await
            .expect("job completes");

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(api.reads.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_job_ends_the_poll() {
        let api = ScriptedJobs::new(1).ending_with(JobStatus::Cancelled);
        let job = api
            .wait_for_job("job-1", Duration::from_secs(5), Duration::from_secs(600))
            .await
            .expect("cancelled is terminal");

        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(api.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_job_times_out() {
        let api = ScriptedJobs::new(usize::MAX);
        let err = api
            .wait_for_job("job-1", Duration::from_secs(2), Duration::from_secs(5))
            .await
            .expect_err("never completes");

        assert!(matches!(err, GatewayError::PollTimeout { seconds: 5, .. }));
    }

    #[tokio::test]
    async fn test_single_read_does_not_poll() {
        let api = ScriptedJobs::new(10);
        let job = api.get_job("job-1").await.expect("read");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(api.reads.load(Ordering::SeqCst), 1);
    }
}
