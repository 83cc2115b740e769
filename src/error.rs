use crate::catalog::{AuthError, PreflightError, SubmissionError};
use crate::config::ConfigError;
use crate::media::ThumbnailError;
use crate::store::StoreError;
use crate::walker::WalkError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Walk(#[from] WalkError),
    #[error(transparent)]
    Preflight(#[from] PreflightError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("thumbnail task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("{failed} of {total} files failed to ingest")]
    Incomplete { failed: usize, total: usize },
}

impl IngestError {
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Config(_) => "config",
            IngestError::Walk(_) => "walk",
            IngestError::Preflight(_) => "preflight",
            IngestError::Auth(_) => "auth",
            IngestError::Io { .. } => "io",
            IngestError::Store(_) => "store",
            IngestError::Thumbnail(_) | IngestError::Task(_) => "thumbnail",
            IngestError::Submission(_) => "submission",
            IngestError::Incomplete { .. } => "incomplete",
        }
    }
}
