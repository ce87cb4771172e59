//! Request forwarding to the application security inspection service
//!
//! Translates an inbound HTTP request's metadata into the header form the
//! inspection endpoint expects and interprets the verdict that comes back.
//! A stateless translation: every call is one forwarded request.

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use url::Url;

/// Metadata headers describing the inspected request.
pub const APPSEC_IP_HEADER: &str = "X-Appsec-Ip";
pub const APPSEC_URI_HEADER: &str = "X-Appsec-Uri";
pub const APPSEC_HOST_HEADER: &str = "X-Appsec-Host";
pub const APPSEC_VERB_HEADER: &str = "X-Appsec-Verb";
pub const APPSEC_API_KEY_HEADER: &str = "X-Appsec-Api-Key";
pub const APPSEC_USER_AGENT_HEADER: &str = "X-Appsec-User-Agent";

#[derive(Debug, Error)]
pub enum AppSecError {
    #[error("invalid appsec url: {0}")]
    Url(#[from] url::ParseError),
    #[error("unable to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to build appsec client: {0}")]
    Client(reqwest::Error),
    #[error("appsec query failed: {0}")]
    Transport(reqwest::Error),
    #[error("appsec service error: {0}")]
    Remote(StatusCode),
    #[error("unable to decode appsec verdict: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Timeouts applied to inspection requests. The inspection endpoint sits in
/// the request path, so these are much tighter than the decision API's.
#[derive(Debug, Clone)]
pub struct AppSecTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for AppSecTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            request: Duration::from_secs(5),
        }
    }
}

/// Configuration for the inspection endpoint. The API key is shared with
/// the bouncer's decision API credentials.
#[derive(Debug, Clone)]
pub struct AppSecConfig {
    pub url: String,
    pub api_key: String,
    pub ca_cert_path: Option<PathBuf>,
    pub insecure_skip_verify: bool,
    pub timeouts: AppSecTimeouts,
}

/// The forwarded metadata of an inbound request under inspection.
#[derive(Debug, Clone, Default)]
pub struct InspectedRequest {
    /// Client address the request came from
    pub remote_addr: String,
    /// HTTP method of the original request
    pub method: String,
    /// Host header of the original request
    pub host: String,
    /// Original request URI (path + query)
    pub uri: String,
    /// User-agent of the original request
    pub user_agent: String,
    /// Remaining original headers, forwarded as-is
    pub headers: Vec<(String, String)>,
    /// Request body, when one exists
    pub body: Option<Vec<u8>>,
}

/// What to do with the inspected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppSecAction {
    Allow,
    Ban,
    Captcha,
    #[serde(other)]
    Unknown,
}

/// Verdict returned by the inspection service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppSecVerdict {
    pub action: AppSecAction,
    /// Status code the enforcement point should answer with
    pub http_status: u16,
}

/// Client for the inspection endpoint.
pub struct AppSecClient {
    http: reqwest::Client,
    url: Url,
    api_key: String,
}

impl AppSecClient {
    pub fn new(config: AppSecConfig) -> Result<Self, AppSecError> {
        let url = Url::parse(&config.url)?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.timeouts.connect)
            .timeout(config.timeouts.request)
            .danger_accept_invalid_certs(config.insecure_skip_verify);

        if let Some(ca_path) = &config.ca_cert_path {
            info!(path = %ca_path.display(), "Using appsec CA certificate");
            let ca_pem = std::fs::read(ca_path).map_err(|source| AppSecError::Io {
                path: ca_path.clone(),
                source,
            })?;
            builder = builder.add_root_certificate(
                reqwest::Certificate::from_pem(&ca_pem).map_err(AppSecError::Client)?,
            );
        }

        Ok(Self {
            http: builder.build().map_err(AppSecError::Client)?,
            url,
            api_key: config.api_key,
        })
    }

    /// Forward an inspected request and interpret the verdict.
    pub async fn forward(&self, request: &InspectedRequest) -> Result<AppSecVerdict, AppSecError> {
        self.forward_inner(request, &request.remote_addr).await
    }

    /// Forward with an explicit client IP, overriding the request's
    /// remote address (for deployments behind another proxy layer).
    pub async fn forward_with_ip(
        &self,
        request: &InspectedRequest,
        ip: &str,
    ) -> Result<AppSecVerdict, AppSecError> {
        self.forward_inner(request, ip).await
    }

    async fn forward_inner(
        &self,
        request: &InspectedRequest,
        ip: &str,
    ) -> Result<AppSecVerdict, AppSecError> {
        // Requests without a body are forwarded as GET, the rest as POST
        // with the body attached.
        let method = match &request.body {
            Some(body) if !body.is_empty() => Method::POST,
            _ => Method::GET,
        };

        let mut builder = self.http.request(method, self.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = builder
            .header(APPSEC_IP_HEADER, ip)
            .header(APPSEC_VERB_HEADER, request.method.as_str())
            .header(APPSEC_HOST_HEADER, request.host.as_str())
            .header(APPSEC_URI_HEADER, request.uri.as_str())
            .header(APPSEC_USER_AGENT_HEADER, request.user_agent.as_str())
            .header(APPSEC_API_KEY_HEADER, self.api_key.as_str());
        if let Some(body) = &request.body {
            if !body.is_empty() {
                builder = builder.body(body.clone());
            }
        }

        let response = builder.send().await.map_err(AppSecError::Transport)?;

        let status = response.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            return Err(AppSecError::Remote(status));
        }

        // The endpoint answers 200 (allow) or 403 (block) with a JSON
        // verdict body; an empty body defaults to allow.
        let bytes = response.bytes().await.map_err(AppSecError::Transport)?;
        if bytes.is_empty() {
            return Ok(AppSecVerdict {
                action: AppSecAction::Allow,
                http_status: status.as_u16(),
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}
