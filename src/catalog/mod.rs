mod record;

pub use record::MediaRecord;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, error, info};
use url::Url;

pub const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(2);

const LOGIN_PATH: &str = "api/v1/login";
const MEDIA_PATH: &str = "api/v1/media";

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("catalog host {host} did not answer within {timeout:?}")]
    Timeout { host: String, timeout: Duration },
    #[error("catalog host {host} is unreachable: {source}")]
    Unreachable {
        host: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to read credentials: {0}")]
    Prompt(String),
    #[error("login request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not authenticate to server ({status})")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("media submission failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("catalog refused media record ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Clone, Serialize)]
pub struct Credentials {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Password")]
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Proof of a successful login. The client carries the session cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Bounded TCP connect to the catalog host.
    async fn preflight(&self, timeout: Duration) -> Result<(), PreflightError>;

    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    async fn submit(&self, record: &MediaRecord) -> Result<(), SubmissionError>;
}

/// HTTP client for the PrImBoard catalog API.
pub struct CatalogClient {
    client: Client,
    base: Url,
    socket_addr: String,
}

impl CatalogClient {
    pub fn new(client: Client, base: Url, socket_addr: impl Into<String>) -> Self {
        Self {
            client,
            base,
            socket_addr: socket_addr.into(),
        }
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url
    }
}

pub async fn check_host(host: &str, timeout: Duration) -> Result<(), PreflightError> {
    debug!(host, ?timeout, "Checking catalog host");
    match tokio::time::timeout(timeout, TcpStream::connect(host)).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(source)) => Err(PreflightError::Unreachable {
            host: host.to_string(),
            source,
        }),
        Err(_) => Err(PreflightError::Timeout {
            host: host.to_string(),
            timeout,
        }),
    }
}

#[async_trait]
impl Catalog for CatalogClient {
    async fn preflight(&self, timeout: Duration) -> Result<(), PreflightError> {
        check_host(&self.socket_addr, timeout).await
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        info!(username = %credentials.username, "Logging in to catalog");

        let response = self
            .client
            .post(self.endpoint(LOGIN_PATH))
            .json(credentials)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            // Echoed as is so the server's explanation reaches the operator.
            println!("{}", body);
            error!(status = status.as_u16(), "Login rejected");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Session {
            username: credentials.username.clone(),
        })
    }

    async fn submit(&self, record: &MediaRecord) -> Result<(), SubmissionError> {
        let response = self
            .client
            .post(self.endpoint(MEDIA_PATH))
            .json(record)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(hash = %record.content_hash, "Catalog accepted media record");
        Ok(())
    }
}
