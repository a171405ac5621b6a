// HTTP client for the poll backend.
//
// `PollBackend` is the seam the orchestrator talks through; `HttpPollApi` is
// the reqwest implementation. Failures are classified as `Network` (the
// request never completed), `Server` (non-success status, including 404 for
// unknown poll ids), or `Decode` (success status with an unreadable body).
// No retry policy lives here; callers decide what a failure means.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::model::{NewPollRequest, Poll, ResultSet};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("server returned status {status}")]
    Server { status: u16 },

    #[error("failed to decode response body: {0}")]
    Decode(reqwest::Error),
}

impl ApiError {
    /// Whether the failure happened before any response arrived.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// The four read/write operations the client core needs from the backend.
///
/// The orchestrator only ever sees this trait, so tests can substitute a
/// programmable in-memory backend.
#[async_trait]
pub trait PollBackend: Send + Sync {
    async fn list_polls(&self) -> Result<Vec<Poll>, ApiError>;
    async fn get_poll(&self, poll_id: u64) -> Result<Poll, ApiError>;
    async fn get_poll_results(&self, poll_id: u64) -> Result<ResultSet, ApiError>;
    async fn cast_vote(&self, poll_id: u64, option_id: u64) -> Result<(), ApiError>;
    async fn create_poll(&self, request: &NewPollRequest) -> Result<Poll, ApiError>;
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// `GET /polls` responds with either a paging envelope or a bare array
/// depending on the backend version; accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PollListBody {
    Paged { content: Vec<Poll> },
    Bare(Vec<Poll>),
}

impl PollListBody {
    pub(crate) fn into_polls(self) -> Vec<Poll> {
        match self {
            PollListBody::Paged { content } => content,
            PollListBody::Bare(polls) => polls,
        }
    }
}

// ---------------------------------------------------------------------------
// HttpPollApi
// ---------------------------------------------------------------------------

/// reqwest-backed implementation of `PollBackend`.
pub struct HttpPollApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPollApi {
    /// Build a client for the backend at `base_url` (no trailing slash
    /// required) with the given request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Network)?;
        Ok(HttpPollApi {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request, map transport errors to `Network` and non-success
    /// statuses to `Server`.
    async fn send_checked(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await.map_err(ApiError::Network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Server {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl PollBackend for HttpPollApi {
    async fn list_polls(&self) -> Result<Vec<Poll>, ApiError> {
        let response = self.send_checked(self.http.get(self.url("/polls"))).await?;
        let body: PollListBody = response.json().await.map_err(ApiError::Decode)?;
        let polls = body.into_polls();
        debug!(count = polls.len(), "fetched poll list");
        Ok(polls)
    }

    async fn get_poll(&self, poll_id: u64) -> Result<Poll, ApiError> {
        let response = self
            .send_checked(self.http.get(self.url(&format!("/polls/{poll_id}"))))
            .await?;
        response.json().await.map_err(ApiError::Decode)
    }

    async fn get_poll_results(&self, poll_id: u64) -> Result<ResultSet, ApiError> {
        let response = self
            .send_checked(
                self.http
                    .get(self.url(&format!("/polls/{poll_id}/results"))),
            )
            .await?;
        response.json().await.map_err(ApiError::Decode)
    }

    async fn cast_vote(&self, poll_id: u64, option_id: u64) -> Result<(), ApiError> {
        let body = serde_json::json!({ "option": { "id": option_id } });
        self.send_checked(
            self.http
                .post(self.url(&format!("/polls/{poll_id}/votes")))
                .json(&body),
        )
        .await?;
        debug!(poll_id, option_id, "vote acknowledged");
        Ok(())
    }

    async fn create_poll(&self, request: &NewPollRequest) -> Result<Poll, ApiError> {
        let response = self
            .send_checked(self.http.post(self.url("/polls")).json(request))
            .await?;
        response.json().await.map_err(ApiError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
