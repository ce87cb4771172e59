//! HTTP client for the decision API
//!
//! One client instance is bound to the API base URL and shared by the
//! stream synchronizer, the live lookup and the usage reporter.

use crate::models::{Decision, DecisionDelta, UsageMetricsPayload};
use crate::sync::SyncFilters;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid decision API url: {0}")]
    Url(#[from] url::ParseError),
    #[error("decision API endpoint not found (older decision engine?)")]
    EndpointNotFound,
    #[error("decision API request timed out")]
    Timeout,
    #[error("decision API returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("unable to reach the decision API: {0}")]
    Transport(reqwest::Error),
    #[error("unable to decode decision API response: {0}")]
    Decode(reqwest::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err)
        } else {
            ApiError::Transport(err)
        }
    }
}

/// Filter for single-shot decision lookups.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecisionFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl DecisionFilter {
    /// Filter matching every decision that targets an IP address.
    pub fn ip(value: impl Into<String>) -> Self {
        Self {
            ip: Some(value.into()),
            ..Default::default()
        }
    }
}

/// Client bound to the decision API base URL.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client from an already-authenticated HTTP client and the
    /// normalized (trailing-slash) base URL.
    pub fn new(http: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the decision stream: the full decision set when `startup` is
    /// true, the delta since the previous fetch otherwise.
    pub async fn decisions_stream(
        &self,
        filters: &SyncFilters,
        startup: bool,
    ) -> Result<DecisionDelta, ApiError> {
        let url = self.base_url.join("v1/decisions/stream")?;
        let mut request = self
            .http
            .get(url)
            .query(&[("startup", if startup { "true" } else { "false" })]);
        for pair in filters.query_pairs() {
            request = request.query(&[pair]);
        }

        let response = check_status(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Look up the decisions currently affecting a single identity.
    /// The API answers `null` when nothing matches.
    pub async fn decisions_list(&self, filter: &DecisionFilter) -> Result<Vec<Decision>, ApiError> {
        let url = self.base_url.join("v1/decisions")?;
        let response = check_status(self.http.get(url).query(filter).send().await?).await?;
        let decisions: Option<Vec<Decision>> = response.json().await?;
        Ok(decisions.unwrap_or_default())
    }

    /// Push a usage metrics payload. Success is 201 Created.
    pub async fn push_usage_metrics(&self, payload: &UsageMetricsPayload) -> Result<(), ApiError> {
        let url = self.base_url.join("v1/usage-metrics")?;
        let response = self.http.post(url).json(payload).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::EndpointNotFound);
        }
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::EndpointNotFound);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status { status, body });
    }
    Ok(response)
}
