//! Authenticated HTTP transport construction
//!
//! Builds the reqwest client shared by the stream synchronizer, live lookup
//! and usage reporter: API key or mutual-TLS client certificate, optional CA
//! bundle, optional certificate verification bypass. The client is built
//! once at startup and is immutable afterwards, so collaborators share it
//! without further synchronization.

use reqwest::header::{HeaderMap, HeaderValue};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Header carrying the bouncer API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no API key or client certificate provided")]
    MissingAuth,
    #[error("certificate auth requires both a certificate and a key")]
    IncompleteCertPair,
    #[error("unable to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid API key: {0}")]
    InvalidApiKey(#[from] reqwest::header::InvalidHeaderValue),
    #[error("unable to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// How the client authenticates against the decision API.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Per-request API key header
    ApiKey(String),
    /// Mutual TLS client certificate
    ClientCert {
        cert_path: PathBuf,
        key_path: PathBuf,
    },
}

impl AuthMode {
    /// Resolve the configured credentials into a single auth mode.
    /// The API key wins when both are configured; empty strings count as
    /// absent.
    pub fn resolve(
        api_key: Option<&str>,
        cert_path: Option<&str>,
        key_path: Option<&str>,
    ) -> Result<Self, TransportError> {
        let api_key = api_key.filter(|v| !v.is_empty());
        let cert_path = cert_path.filter(|v| !v.is_empty());
        let key_path = key_path.filter(|v| !v.is_empty());

        if let Some(key) = api_key {
            if cert_path.is_some() || key_path.is_some() {
                info!("Both API key and certificate configured, using API key auth");
            }
            return Ok(AuthMode::ApiKey(key.to_string()));
        }

        match (cert_path, key_path) {
            (Some(cert), Some(key)) => Ok(AuthMode::ClientCert {
                cert_path: cert.into(),
                key_path: key.into(),
            }),
            (None, None) => Err(TransportError::MissingAuth),
            _ => Err(TransportError::IncompleteCertPair),
        }
    }
}

/// Build the authenticated client for the decision API.
pub fn build_client(
    auth: &AuthMode,
    user_agent: &str,
    ca_cert_path: Option<&Path>,
    insecure_skip_verify: bool,
) -> Result<reqwest::Client, TransportError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(REQUEST_TIMEOUT)
        .danger_accept_invalid_certs(insecure_skip_verify);

    if let Some(ca_path) = ca_cert_path {
        info!(path = %ca_path.display(), "Using CA certificate");
        let ca_pem = read_file(ca_path)?;
        builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&ca_pem)?);
    }

    match auth {
        AuthMode::ApiKey(key) => {
            info!("Using API key auth");
            let mut headers = HeaderMap::new();
            let mut value = HeaderValue::from_str(key)?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
            builder = builder.default_headers(headers);
        }
        AuthMode::ClientCert {
            cert_path,
            key_path,
        } => {
            info!(
                cert = %cert_path.display(),
                key = %key_path.display(),
                "Using certificate auth"
            );
            let mut pem = read_file(cert_path)?;
            pem.extend_from_slice(&read_file(key_path)?);
            builder = builder.identity(reqwest::Identity::from_pem(&pem)?);
        }
    }

    Ok(builder.build()?)
}

fn read_file(path: &Path) -> Result<Vec<u8>, TransportError> {
    std::fs::read(path).map_err(|source| TransportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_api_key() {
        let auth = AuthMode::resolve(Some("deadbeef"), Some("/tmp/cert"), Some("/tmp/key")).unwrap();
        assert!(matches!(auth, AuthMode::ApiKey(key) if key == "deadbeef"));
    }

    #[test]
    fn test_resolve_cert_pair() {
        let auth = AuthMode::resolve(None, Some("/tmp/cert"), Some("/tmp/key")).unwrap();
        match auth {
            AuthMode::ClientCert {
                cert_path,
                key_path,
            } => {
                assert_eq!(cert_path, PathBuf::from("/tmp/cert"));
                assert_eq!(key_path, PathBuf::from("/tmp/key"));
            }
            other => panic!("expected cert auth, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_rejects_missing_credentials() {
        assert!(matches!(
            AuthMode::resolve(None, None, None),
            Err(TransportError::MissingAuth)
        ));
        // Empty strings count as absent
        assert!(matches!(
            AuthMode::resolve(Some(""), Some(""), None),
            Err(TransportError::MissingAuth)
        ));
    }

    #[test]
    fn test_resolve_rejects_incomplete_cert_pair() {
        assert!(matches!(
            AuthMode::resolve(None, Some("/tmp/cert"), None),
            Err(TransportError::IncompleteCertPair)
        ));
        assert!(matches!(
            AuthMode::resolve(None, None, Some("/tmp/key")),
            Err(TransportError::IncompleteCertPair)
        ));
    }

    #[test]
    fn test_build_client_with_api_key() {
        let auth = AuthMode::ApiKey("deadbeef".to_string());
        let client = build_client(&auth, "test-bouncer/0.1.0", None, false);
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_client_reports_unreadable_ca() {
        let auth = AuthMode::ApiKey("deadbeef".to_string());
        let missing = Path::new("/nonexistent/ca.pem");
        let err = build_client(&auth, "test-bouncer/0.1.0", Some(missing), false).unwrap_err();
        assert!(matches!(err, TransportError::Io { path, .. } if path == missing));
    }

    #[test]
    fn test_build_client_reports_unreadable_cert() {
        let auth = AuthMode::ClientCert {
            cert_path: PathBuf::from("/nonexistent/client.crt"),
            key_path: PathBuf::from("/nonexistent/client.key"),
        };
        let err = build_client(&auth, "test-bouncer/0.1.0", None, false).unwrap_err();
        assert!(matches!(err, TransportError::Io { .. }));
    }

    #[test]
    fn test_build_client_rejects_garbage_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("client.crt");
        let key_path = dir.path().join("client.key");
        std::fs::write(&cert_path, "not a certificate").unwrap();
        std::fs::write(&key_path, "not a key").unwrap();

        let auth = AuthMode::ClientCert {
            cert_path,
            key_path,
        };
        assert!(build_client(&auth, "test-bouncer/0.1.0", None, false).is_err());
    }
}
