//! Error types for puzzle-forge operations.
//!
//! Defines error types for every subsystem that can fail:
//! - Generative concept service interactions
//! - Concept sourcing and response parsing
//! - Remote catalog API calls
//! - Local dataset loading
//! - Batch-level fatal conditions

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: set OPENROUTER_API_KEY or LITELLM_API_KEY")]
    MissingApiKey,

    #[error("Missing API base URL: LITELLM_API_BASE environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors raised while sourcing concepts. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum ConceptError {
    #[error("Concept service failed: {0}")]
    Service(#[from] LlmError),

    #[error("Concept service returned an empty response")]
    EmptyResponse,

    #[error("No JSON array found in concept response. Raw response: {raw}")]
    NoJsonArray { raw: String },

    #[error("Concept response is not a JSON array of strings ({reason}). Raw response: {raw}")]
    InvalidArray { reason: String, raw: String },
}

/// Errors returned by the remote catalog gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Catalog API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Catalog rejected credentials (status {status}): {body}")]
    Unauthorized { status: u16, body: String },

    #[error("Failed to parse catalog response: {0}")]
    Parse(String),

    #[error("Timed out after {seconds}s waiting for job '{job_id}' to finish")]
    PollTimeout { job_id: String, seconds: u64 },
}

impl GatewayError {
    /// Builds the error for a non-2xx response.
    ///
    /// 401 and 403 are credential rejections and are kept apart from other
    /// server failures so callers can stop a doomed batch early.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => GatewayError::Unauthorized { status, body },
            _ => GatewayError::Api { status, body },
        }
    }

    /// Returns true if the remote service rejected the credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized { .. })
    }
}

/// Errors that can occur while loading a local dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Invalid dataset source '{source_name}': expected one of {expected}")]
    InvalidSource {
        source_name: String,
        expected: String,
    },

    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Fatal conditions that terminate a run with a non-zero outcome.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Could not source concepts: {0}")]
    Sourcing(#[from] ConceptError),

    #[error("Authorization failed (status {status}): {message}. Check ADMIN_KEY / PUZZLE_API_KEY")]
    Authorization { status: u16, message: String },

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Config(#[from] crate::pipeline::config::ConfigError),

    #[error("Catalog call failed: {0}")]
    Gateway(GatewayError),
}

impl From<GatewayError> for BatchError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unauthorized { status, body } => BatchError::Authorization {
                status,
                message: body,
            },
            other => BatchError::Gateway(other),
        }
    }
}
