use anyhow::{bail, Result};
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tuberip::catalog::HttpCatalogClient;
use tuberip::codec::Codec;
use tuberip::config::{AppConfig, CliConfig, FileConfig, DEFAULT_CATALOG_URL, DEFAULT_RIPPER_URL};
use tuberip::navigation::MemoryNavigator;
use tuberip::ripper::WsRipClient;
use tuberip::save::DirSaveSink;
use tuberip::session::{ErrorScope, ExpectedTotal, SessionEngine, SessionEvent};
use uuid::Uuid;

#[derive(Parser, Debug)]
struct CliArgs {
    /// Video or playlist to rip: a URL, or a v<id> / p<id> shorthand.
    pub subject: String,

    /// Directory the ripped files are written to.
    #[clap(short, long, default_value = "downloads")]
    pub output_dir: PathBuf,

    /// Target format for the ripped files.
    #[clap(short, long, default_value = "mp3")]
    pub format: Codec,

    /// Base URL of the catalog lookup API.
    #[clap(long, default_value = DEFAULT_CATALOG_URL)]
    pub catalog_url: String,

    /// API key sent with every catalog request.
    #[clap(long)]
    pub catalog_api_key: Option<String>,

    /// Timeout in seconds for catalog requests.
    #[clap(long, default_value_t = 30)]
    pub catalog_timeout_sec: u64,

    /// URL of the ripper service (ws:// or wss://).
    #[clap(long, default_value = DEFAULT_RIPPER_URL)]
    pub ripper_url: String,

    /// Page size for playlist listing, 1 to 100.
    #[clap(long, default_value_t = 50)]
    pub page_size: u32,

    /// Upper bound on inspected items. Set to 0 for no cap.
    #[clap(long, default_value_t = 0)]
    pub item_cap: usize,

    /// Path to a TOML config file. Its values override CLI arguments.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// List the resolved records without downloading anything.
    #[clap(long)]
    pub list_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    if cli_args.subject.trim().is_empty() {
        bail!("Subject must not be empty");
    }

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        output_dir: cli_args.output_dir.clone(),
        format: cli_args.format,
        catalog_url: cli_args.catalog_url.clone(),
        catalog_api_key: cli_args.catalog_api_key.clone(),
        catalog_timeout_sec: cli_args.catalog_timeout_sec,
        ripper_url: cli_args.ripper_url.clone(),
        page_size: cli_args.page_size,
        item_cap: cli_args.item_cap,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let catalog = Arc::new(HttpCatalogClient::new(
        config.catalog_url.clone(),
        config.catalog_api_key.clone(),
        config.page_size,
        config.item_cap,
        config.catalog_timeout_sec,
    ));
    let ripper = Arc::new(WsRipClient::new(config.ripper_url.clone()));
    let saver = Arc::new(DirSaveSink::new(config.output_dir.clone()));
    let navigator = Arc::new(MemoryNavigator::new());

    let engine = SessionEngine::new(
        catalog,
        ripper,
        saver,
        navigator,
        config.session_settings(),
    );
    let mut events = engine.subscribe();

    engine.bootstrap().await?;
    engine.inspect(&cli_args.subject).await;
    wait_for_inspection(&engine, &mut events).await?;

    let videos = engine.videos().await;
    if videos.is_empty() {
        bail!("No records resolved for {}", cli_args.subject);
    }
    for (index, video) in videos.iter().enumerate() {
        println!(
            "{:>3}. [{}] {} - {} ({})",
            index + 1,
            video.details.duration,
            video.tags.artist,
            video.tags.song,
            video.details.title,
        );
    }
    for record in engine.errors(ErrorScope::Context).await {
        warn!("{}", record.message);
    }

    if cli_args.list_only {
        return Ok(());
    }

    for video in &videos {
        engine.select(video.uuid, Some(true)).await?;
    }
    let started = engine.download_selected().await;
    if started.is_empty() {
        bail!("No downloads could be started");
    }
    info!(
        "Ripping {} records into {:?}...",
        started.len(),
        config.output_dir
    );

    let mut pending: HashSet<Uuid> = started.iter().copied().collect();
    while !pending.is_empty() {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, cancelling {} jobs", pending.len());
                engine.clear().await;
                bail!("Interrupted");
            }
            event = events.recv() => match event {
                Ok(SessionEvent::DownloadFinished { uuid, name }) => {
                    println!("saved {}", name);
                    pending.remove(&uuid);
                }
                Ok(SessionEvent::ProgressChanged { uuid, progress }) => match progress {
                    Some(progress) => debug!(%uuid, progress, "progress"),
                    // A record going idle without a finished file means
                    // its job failed.
                    None => {
                        pending.remove(&uuid);
                    }
                },
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event stream lagged, re-syncing");
                    let snapshot = engine.videos().await;
                    pending.retain(|uuid| {
                        snapshot
                            .iter()
                            .any(|video| video.uuid == *uuid && video.locked)
                    });
                }
                Err(RecvError::Closed) => bail!("Session event channel closed"),
            }
        }
    }

    let failures = engine.errors(ErrorScope::Videos).await;
    if !failures.is_empty() {
        for failure in &failures {
            warn!("{}", failure.message);
        }
        bail!("{} of {} downloads failed", failures.len(), started.len());
    }
    info!("All {} downloads finished", started.len());
    Ok(())
}

/// Waits for the running inspection to either finish or fail.
async fn wait_for_inspection(
    engine: &SessionEngine,
    events: &mut broadcast::Receiver<SessionEvent>,
) -> Result<()> {
    loop {
        match events.recv().await {
            Ok(SessionEvent::InspectionFinished) => return Ok(()),
            Ok(SessionEvent::TotalResolved { total }) => {
                if let ExpectedTotal::Count(count) = total {
                    info!("Subject resolved, {} items expected", count);
                }
            }
            Ok(SessionEvent::VideosIncluded { uuids }) => {
                debug!(count = uuids.len(), "batch arrived");
            }
            Ok(SessionEvent::ErrorsIncluded {
                scope: ErrorScope::Context,
                fatal: true,
                ..
            }) => {
                let detail = engine
                    .errors(ErrorScope::Context)
                    .await
                    .into_iter()
                    .filter(|record| record.fatal)
                    .map(|record| record.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                bail!("Inspection failed: {}", detail);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event stream lagged"),
            Err(RecvError::Closed) => bail!("Session event channel closed"),
        }
    }
}
