//! reqwest implementation of [`CatalogApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::concepts::Concept;
use crate::dataset::ChallengeSet;
use crate::error::GatewayError;

use super::types::{
    BulkImportBody, CreateJobBody, CreatePuzzle, CreatePuzzleResponse, ImportSummary, Job,
    PatchTagsBody, PuzzleOutcome, PuzzleSummary,
};
use super::CatalogApi;

/// Per-call timeouts.
///
/// Job, tag and listing calls are cheap. Puzzle creation runs generation
/// server-side and bulk import validates large payloads, so both get longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimeouts {
    pub short: Duration,
    pub generation: Duration,
    pub import: Duration,
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(10),
            generation: Duration::from_secs(60),
            import: Duration::from_secs(300),
        }
    }
}

/// HTTP client for the puzzle catalog API.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: String,
    admin_key: Option<String>,
    client: Client,
    timeouts: CallTimeouts,
}

impl CatalogClient {
    /// Create a new catalog client. A trailing `/` on `base_url` is dropped.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a client around a preconfigured reqwest [`Client`].
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            admin_key: None,
            client,
            timeouts: CallTimeouts::default(),
        }
    }

    /// Pre-shared secret sent with every admin-keyed call.
    pub fn with_admin_key(mut self, admin_key: Option<String>) -> Self {
        self.admin_key = admin_key;
        self
    }

    pub fn with_timeouts(mut self, timeouts: CallTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeouts(&self) -> CallTimeouts {
        self.timeouts
    }

    pub fn has_admin_key(&self) -> bool {
        self.admin_key.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request, mapping transport failures (including timeouts).
    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, GatewayError> {
        request.send().await.map_err(|e| GatewayError::Request {
            url: url.to_string(),
            message: if e.is_timeout() {
                format!("timed out: {e}")
            } else {
                e.to_string()
            },
        })
    }

    /// Checks the status code and deserializes a JSON body.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, GatewayError> {
        let response = self.check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(format!("Failed to parse JSON response: {}", e)))
    }

    /// Checks the status code, discarding any body on success.
    async fn handle_empty_response(&self, response: Response) -> Result<(), GatewayError> {
        self.check_status(response).await.map(|_| ())
    }

    async fn check_status(&self, response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(GatewayError::from_status(status.as_u16(), error_text))
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn list_puzzles(&self) -> Result<Vec<PuzzleSummary>, GatewayError> {
        let url = self.url("/api/puzzles");
        let request = self.client.get(&url).timeout(self.timeouts.short);
        let response = self.send(&url, request).await?;

        self.handle_response(response).await
    }

    async fn create_job(&self, concept: &Concept, model: &str) -> Result<Job, GatewayError> {
        let url = self.url("/api/jobs");
        let body = CreateJobBody {
            concept: concept.as_str(),
            model,
            admin_key: self.admin_key.as_deref(),
        };
        let request = self.client.post(&url).json(&body).timeout(self.timeouts.short);
        let response = self.send(&url, request).await?;

        self.handle_response(response).await
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, GatewayError> {
        let url = self.url(&format!("/api/jobs/{}", urlencoding::encode(job_id)));
        let request = self.client.get(&url).timeout(self.timeouts.short);
        let response = self.send(&url, request).await?;

        self.handle_response(response).await
    }

    async fn create_puzzle(&self, request: &CreatePuzzle) -> Result<PuzzleOutcome, GatewayError> {
        let url = self.url("/api/puzzles");
        let http_request = self
            .client
            .post(&url)
            .json(request)
            .timeout(self.timeouts.generation);
        let response = self.send(&url, http_request).await?;

        let body: CreatePuzzleResponse = self.handle_response(response).await?;
        debug!(job_id = %request.job_id, existing = body.existing, "Puzzle response received");
        Ok(body.into())
    }

    async fn patch_tags(&self, puzzle_id: &str, tags: &[String]) -> Result<(), GatewayError> {
        let url = self.url(&format!(
            "/api/admin/puzzles/{}",
            urlencoding::encode(puzzle_id)
        ));
        let body = PatchTagsBody {
            admin_key: self.admin_key.as_deref(),
            tags,
        };
        let request = self.client.patch(&url).json(&body).timeout(self.timeouts.short);
        let response = self.send(&url, request).await?;

        self.handle_empty_response(response).await
    }

    async fn bulk_import(
        &self,
        source: &str,
        puzzles: &ChallengeSet,
    ) -> Result<ImportSummary, GatewayError> {
        let url = self.url("/api/admin/puzzles/import");
        let body = BulkImportBody {
            admin_key: self.admin_key.as_deref(),
            source,
            puzzles,
        };
        let request = self.client.post(&url).json(&body).timeout(self.timeouts.import);
        let response = self.send(&url, request).await?;

        self.handle_response(response).await
    }
}
