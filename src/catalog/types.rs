//! Wire types for the puzzle catalog API.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::ChallengeSet;

/// Server-side job status.
///
/// The remote service owns the status vocabulary; unrecognised values are
/// kept verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Other(String),
}

impl JobStatus {
    /// True once the remote service will no longer change the status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Other(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "cancelled" => JobStatus::Cancelled,
            _ => JobStatus::Other(s),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job record as returned by `POST /api/jobs` and `GET /api/jobs/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub concept: String,
    #[serde(default)]
    pub model: Option<String>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puzzle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Body of `POST /api/jobs`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateJobBody<'a> {
    pub concept: &'a str,
    pub model: &'a str,
    pub admin_key: Option<&'a str>,
}

/// Request to materialise the puzzle for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePuzzle {
    /// The concept text; the server calls it the puzzle's idea.
    pub idea: String,
    /// `None` lets the server pick its default generation model.
    pub model: Option<String>,
    pub job_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl CreatePuzzle {
    pub fn new(job_id: impl Into<String>, idea: impl Into<String>) -> Self {
        Self {
            idea: idea.into(),
            model: None,
            job_id: job_id.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

/// Raw 2xx body of `POST /api/puzzles`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatePuzzleResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub existing: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Classified result of a puzzle-creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PuzzleOutcome {
    Created { puzzle_id: String },
    AlreadyExisted { puzzle_id: String },
    Failed { reason: String },
}

impl From<CreatePuzzleResponse> for PuzzleOutcome {
    fn from(response: CreatePuzzleResponse) -> Self {
        match response {
            CreatePuzzleResponse {
                error: Some(reason), ..
            } => PuzzleOutcome::Failed { reason },
            CreatePuzzleResponse {
                id: Some(puzzle_id),
                existing: true,
                ..
            } => PuzzleOutcome::AlreadyExisted { puzzle_id },
            CreatePuzzleResponse {
                id: Some(puzzle_id),
                ..
            } => PuzzleOutcome::Created { puzzle_id },
            CreatePuzzleResponse { id: None, .. } => PuzzleOutcome::Failed {
                reason: "response carried neither an id nor an error".to_string(),
            },
        }
    }
}

/// Entry of `GET /api/puzzles`. Only the fields the retag loop reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleSummary {
    pub id: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idea: Option<String>,
}

/// Body of `PATCH /api/admin/puzzles/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PatchTagsBody<'a> {
    pub admin_key: Option<&'a str>,
    pub tags: &'a [String],
}

/// Body of `POST /api/admin/puzzles/import`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BulkImportBody<'a> {
    pub admin_key: Option<&'a str>,
    pub source: &'a str,
    pub puzzles: &'a ChallengeSet,
}

/// Server-side tally of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    #[serde(default)]
    pub imported: usize,
    #[serde(default)]
    pub skipped: usize,
    #[serde(default)]
    pub failed: usize,
    #[serde(default)]
    pub errors: Vec<String>,
}
