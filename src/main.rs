use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

mod catalog;
mod classify;
mod config;
mod credentials;
mod error;
mod media;
mod pipeline;
mod store;
mod utils;
mod walker;

use catalog::CatalogClient;
use classify::ClassifierKind;
use config::{Config, LoggingFormat};
use error::IngestError;
use media::{ThumbnailGenerator, ThumbnailOptions};
use pipeline::{FailurePolicy, IngestOptions, Pipeline};
use store::IpfsStore;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File or directory to ingest
    path: PathBuf,

    /// Path to the env file (defaults to env.json)
    config: Option<PathBuf>,

    /// How to derive the media type
    #[arg(long, value_enum, default_value_t = ClassifierKind::Probe)]
    classifier: ClassifierKind,

    /// Keep going after a file fails and report all failures at the end
    #[arg(long)]
    keep_going: bool,

    /// Login name; prompted for when omitted
    #[arg(short, long)]
    username: Option<String>,

    /// Creator stored on every record (defaults to the login name)
    #[arg(long)]
    creator: Option<String>,

    /// Tag id attached to every record; repeatable
    #[arg(long = "tag")]
    tags: Vec<i32>,

    /// Side length of the square thumbnail
    #[arg(
        long,
        default_value_t = media::THUMB_SIZE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    thumb_size: u32,

    /// Seconds to wait for the catalog host during the reachability check
    #[arg(long, default_value_t = 2)]
    timeout_secs: u64,
}

fn init_logging(format: LoggingFormat) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    match format {
        LoggingFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init(),
        LoggingFormat::Text => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}]")
    {
        bar.set_style(style);
    }
    bar
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::get_config_path(args.config.as_deref());
    let config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    init_logging(config.get_logging_format());
    info!("Loaded config from: {}", config_path.display());

    if !args.path.exists() {
        error!(path = %args.path.display(), "The passed path is not valid");
        anyhow::bail!("The passed path is not valid: {}", args.path.display());
    }

    let client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .context("Failed to build HTTP client")?;

    let store = IpfsStore::new(
        client.clone(),
        config.node_api_url()?,
        config.ipfs_gateway.clone(),
    );
    let catalog = CatalogClient::new(
        client,
        config.catalog_base_url()?,
        config.catalog_socket_addr()?,
    );

    let options = IngestOptions {
        policy: if args.keep_going {
            FailurePolicy::Continue
        } else {
            FailurePolicy::FailFast
        },
        preflight_timeout: Duration::from_secs(args.timeout_secs),
        creator: args.creator,
        tags: args.tags,
    };

    let classifier = args.classifier.build();
    info!(classifier = classifier.name(), "Using classifier");

    let mut pipeline = Pipeline::new(
        Arc::new(store),
        Arc::new(catalog),
        Arc::new(ThumbnailGenerator::new(ThumbnailOptions::with_size(
            args.thumb_size,
        ))),
        classifier,
        credentials::from_environment(args.username),
        options,
    )
    .with_progress(progress_bar());

    let report = pipeline.run(&args.path).await?;

    for (path, err) in &report.failures {
        error!(path = %path.display(), kind = err.kind(), "{}", err);
    }
    if !report.is_success() {
        return Err(IngestError::Incomplete {
            failed: report.failures.len(),
            total: report.discovered,
        }
        .into());
    }

    info!(
        "Added {} of {} files",
        utils::format_number(report.processed),
        utils::format_number(report.discovered)
    );
    Ok(())
}
