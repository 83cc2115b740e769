use async_trait::async_trait;
use reqwest::{multipart, Body, Client};
use serde::Deserialize;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("content store rejected upload ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("unexpected content store response: {0}")]
    InvalidResponse(String),
    #[error("content store returned an empty identifier")]
    EmptyIdentifier,
}

/// Identifier the store assigned to uploaded bytes. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Result<Self, StoreError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(StoreError::EmptyIdentifier);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

type Reader = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// Bytes handed to a store, read lazily so large originals are never held
/// in memory as a whole.
pub struct Upload {
    reader: Reader,
    length: u64,
}

impl Upload {
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(path.as_ref()).await?;
        let length = file.metadata().await?.len();
        Ok(Self {
            reader: Box::new(file),
            length,
        })
    }

    /// `length` must be the exact number of bytes `reader` yields.
    pub fn from_reader(reader: impl AsyncRead + Send + Sync + Unpin + 'static, length: u64) -> Self {
        Self {
            reader: Box::new(reader),
            length,
        }
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        let length = data.len() as u64;
        Self::from_reader(Cursor::new(data), length)
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn into_reader(self) -> Reader {
        self.reader
    }

    fn into_part(self) -> multipart::Part {
        let length = self.length;
        let body = Body::wrap_stream(ReaderStream::new(self.into_reader()));
        multipart::Part::stream_with_length(body, length)
    }
}

impl From<Vec<u8>> for Upload {
    fn from(data: Vec<u8>) -> Self {
        Self::from_bytes(data)
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Uploads `content` and returns its content identifier. Identical bytes
    /// yield identical identifiers.
    async fn put(&self, content: Upload, file_name: &str) -> Result<ContentId, StoreError>;

    /// Public URL under which `id` can be retrieved.
    fn gateway_url(&self, id: &ContentId) -> String;
}

/// Content store backed by an IPFS node's HTTP API.
pub struct IpfsStore {
    client: Client,
    api: Url,
    gateway: String,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

impl IpfsStore {
    pub fn new(client: Client, api: Url, gateway: impl Into<String>) -> Self {
        Self {
            client,
            api,
            gateway: gateway.into(),
        }
    }

    fn add_url(&self) -> Result<Url, StoreError> {
        let mut url = self
            .api
            .join("api/v0/add")
            .map_err(|e| StoreError::InvalidResponse(format!("bad node api url: {e}")))?;
        url.query_pairs_mut().append_pair("pin", "true");
        Ok(url)
    }
}

/// The add endpoint streams one JSON object per line; the last one describes
/// the uploaded root.
fn parse_add_response(body: &str) -> Result<ContentId, StoreError> {
    let last = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .ok_or_else(|| StoreError::InvalidResponse("empty body".to_string()))?;

    let response: AddResponse = serde_json::from_str(last)
        .map_err(|e| StoreError::InvalidResponse(format!("{e}: {last}")))?;
    ContentId::new(response.hash)
}

#[async_trait]
impl ContentStore for IpfsStore {
    async fn put(&self, content: Upload, file_name: &str) -> Result<ContentId, StoreError> {
        let size = content.length();
        let part = content.into_part().file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.add_url()?)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let id = parse_add_response(&body)?;
        debug!(file_name, size, id = %id, "Added content to IPFS");
        Ok(id)
    }

    fn gateway_url(&self, id: &ContentId) -> String {
        format!("{}{}", self.gateway, id.as_str())
    }
}
