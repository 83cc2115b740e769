use crate::catalog::{Catalog, MediaRecord, Session};
use crate::classify::Classifier;
use crate::credentials::CredentialSource;
use crate::error::IngestError;
use crate::media::Thumbnailer;
use crate::store::{ContentStore, Upload};
use crate::utils::{format_number, modified_timestamp};
use crate::walker;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    PreflightChecked,
    Authenticated,
    Ingesting,
    Done,
    Aborted,
}

/// What happens to the batch when a file fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first error; later files are never attempted.
    #[default]
    FailFast,
    /// Record the error and carry on with the next file.
    Continue,
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub policy: FailurePolicy,
    pub preflight_timeout: Duration,
    /// Defaults to the logged-in user.
    pub creator: Option<String>,
    pub tags: Vec<i32>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::default(),
            preflight_timeout: crate::catalog::PREFLIGHT_TIMEOUT,
            creator: None,
            tags: Vec::new(),
        }
    }
}

/// Fixed for the whole run once login succeeded; handed to every file.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub session: Session,
    pub creator: String,
    pub tags: Vec<i32>,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub discovered: usize,
    pub processed: usize,
    pub failures: Vec<(PathBuf, IngestError)>,
}

impl IngestReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Pipeline {
    store: Arc<dyn ContentStore>,
    catalog: Arc<dyn Catalog>,
    thumbnailer: Arc<dyn Thumbnailer>,
    classifier: Box<dyn Classifier>,
    credentials: Box<dyn CredentialSource>,
    options: IngestOptions,
    progress: ProgressBar,
    state: RunState,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ContentStore>,
        catalog: Arc<dyn Catalog>,
        thumbnailer: Arc<dyn Thumbnailer>,
        classifier: Box<dyn Classifier>,
        credentials: Box<dyn CredentialSource>,
        options: IngestOptions,
    ) -> Self {
        Self {
            store,
            catalog,
            thumbnailer,
            classifier,
            credentials,
            options,
            progress: ProgressBar::hidden(),
            state: RunState::Idle,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        info!(from = ?self.state, to = ?next, "Pipeline state change");
        self.state = next;
    }

    fn abort(&mut self, err: IngestError) -> IngestError {
        error!(kind = err.kind(), error = %err, "Aborting run");
        self.progress.abandon();
        self.transition(RunState::Aborted);
        err
    }

    /// Preflight, login, then ingest every file under `root` in traversal
    /// order.
    pub async fn run(&mut self, root: &Path) -> Result<IngestReport, IngestError> {
        if let Err(err) = self.catalog.preflight(self.options.preflight_timeout).await {
            return Err(self.abort(err.into()));
        }
        self.transition(RunState::PreflightChecked);

        let context = match self.authenticate().await {
            Ok(context) => context,
            Err(err) => return Err(self.abort(err)),
        };
        self.transition(RunState::Authenticated);

        let files = match walker::collect_files(root) {
            Ok(files) => files,
            Err(err) => return Err(self.abort(err.into())),
        };
        info!("Found {} files", format_number(files.len()));

        self.ingest(&files, &context).await
    }

    async fn authenticate(&self) -> Result<RunContext, IngestError> {
        let credentials = self.credentials.credentials()?;
        let session = self.catalog.authenticate(&credentials).await?;
        info!(username = %session.username, "Authenticated");

        Ok(RunContext {
            creator: self
                .options
                .creator
                .clone()
                .unwrap_or_else(|| session.username.clone()),
            tags: self.options.tags.clone(),
            session,
        })
    }

    pub async fn ingest(
        &mut self,
        files: &[PathBuf],
        context: &RunContext,
    ) -> Result<IngestReport, IngestError> {
        self.transition(RunState::Ingesting);
        info!(user = %context.session.username, "Start adding files...");
        self.progress.set_length(files.len() as u64);

        let mut report = IngestReport {
            discovered: files.len(),
            ..IngestReport::default()
        };

        for path in files {
            match self.ingest_file(path, context).await {
                Ok(record) => {
                    info!(
                        path = %path.display(),
                        hash = %record.content_hash,
                        media_type = record.media_type.as_str(),
                        "Added media"
                    );
                    report.processed += 1;
                    self.progress.inc(1);
                }
                Err(err) => match self.options.policy {
                    FailurePolicy::FailFast => {
                        error!(path = %path.display(), "Failed to add media");
                        return Err(self.abort(err));
                    }
                    FailurePolicy::Continue => {
                        warn!(
                            path = %path.display(),
                            kind = err.kind(),
                            error = %err,
                            "Failed to add media, continuing"
                        );
                        report.failures.push((path.clone(), err));
                    }
                },
            }
        }

        self.progress.finish();
        self.transition(RunState::Done);
        info!(
            processed = report.processed,
            failed = report.failures.len(),
            "Finished adding files"
        );
        Ok(report)
    }

    /// Upload original, derive and upload the thumbnail, classify, submit.
    async fn ingest_file(
        &self,
        path: &Path,
        context: &RunContext,
    ) -> Result<MediaRecord, IngestError> {
        let io_error = |source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        };
        let content = Upload::open(path).await.map_err(io_error)?;
        let metadata = tokio::fs::metadata(path).await.map_err(io_error)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let original = self.store.put(content, &name).await?;

        let thumbnailer = Arc::clone(&self.thumbnailer);
        let source = path.to_path_buf();
        let thumb = tokio::task::spawn_blocking(move || thumbnailer.generate(&source)).await??;
        let length = thumb.data.len() as u64;
        debug!(width = thumb.width, height = thumb.height, bytes = length, "Thumbnail ready");

        let probe = thumb.probe.clone();
        let thumbnail = self
            .store
            .put(
                Upload::from_reader(thumb.into_reader(), length),
                &format!("{}.thumb.jpg", name),
            )
            .await?;

        let classification = self.classifier.classify(path, Some(&probe));

        let record = MediaRecord::new(self.store.as_ref(), &original, &thumbnail, classification)
            .with_title(probe.title)
            .with_creator(context.creator.clone())
            .with_tags(context.tags.iter().copied())
            .with_timestamp(modified_timestamp(&metadata));

        self.catalog.submit(&record).await?;
        Ok(record)
    }
}
