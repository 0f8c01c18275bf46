//! Tracklink command-line application.
//!
//! Loads settings, ingests a playlist file, runs a lookup job while logging
//! its progress, and writes CSV and XLSX results next to the input.

pub mod cli;

pub use cli::Cli;

use anyhow::{Context, Result};
use futures::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracklink_core::{AppConfig, JobConfig, JobStatus, TaskState};
use tracklink_ingest::{IngestedFile, RowIngestor};
use tracklink_resolver::ResolverChain;
use tracklink_search::{to_csv, to_xlsx, ExportRow, JobService, ProgressEvent};

/// Files written by a run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// CSV result file
    pub csv: PathBuf,
    /// XLSX result file
    pub xlsx: PathBuf,
    /// How the job ended
    pub status: JobStatus,
}

/// Initialize tracing subscriber for logging.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tracklink=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Run the whole pipeline for the given arguments.
pub async fn run(cli: Cli) -> Result<RunOutput> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load().context("failed to load config")?,
    };
    config.apply_env();
    cli.apply_overrides(&mut config.search);

    let job_config = config
        .search
        .job_config()
        .context("invalid search settings")?;

    let ingested = RowIngestor::new()
        .ingest_path(&cli.input)
        .with_context(|| format!("failed to read playlist {}", cli.input.display()))?;
    if !ingested.skipped.is_empty() {
        warn!(
            "Skipped {} row(s) with missing track or artist",
            ingested.skipped.len()
        );
    }

    let resolver = ResolverChain::from_config(&config.resolver).context("failed to set up resolvers")?;
    let service = JobService::new(Arc::new(resolver), &config);

    process_file(
        &service,
        job_config,
        ingested,
        &cli.output_dir(),
        &cli.output_stem(),
        shutdown_signal(),
    )
    .await
}

/// Run one job and write its exports, aborting when `interrupt` resolves.
///
/// The export has one line per input row. It is written for aborted jobs
/// too; unfinished rows are marked `Aborted` and rows dropped at ingestion
/// `Skipped`.
pub async fn process_file(
    service: &JobService,
    job_config: JobConfig,
    ingested: IngestedFile,
    out_dir: &Path,
    stem: &str,
    interrupt: impl Future<Output = ()>,
) -> Result<RunOutput> {
    let headers = ingested.headers;
    let skipped = ingested.skipped;
    let job_id = service
        .submit_job(job_config, ingested.queries)
        .context("failed to start job")?;
    let mut events = service.subscribe(job_id, None)?;

    tokio::pin!(interrupt);
    let mut interrupted = false;
    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(event) => log_event(&event),
                None => break,
            },
            () = &mut interrupt, if !interrupted => {
                warn!("Interrupted, aborting job {job_id}");
                service.abort(job_id)?;
                interrupted = true;
            }
        }
    }

    let status = service.wait(job_id).await?;
    let snapshot = service.status(job_id)?;
    info!(
        %status,
        youtube = snapshot.stats.youtube_found,
        fourshared = snapshot.stats.fourshared_found,
        not_found = snapshot.stats.not_found,
        errors = snapshot.stats.errors,
        aborted = snapshot.stats.aborted,
        "Processed {} track(s)",
        snapshot.stats.total_songs
    );

    let mut rows = service.get_export(job_id)?;
    rows.extend(
        skipped
            .into_iter()
            .map(|row| ExportRow::skipped(row.row_index, row.source_fields)),
    );
    rows.sort_by_key(|row| row.row_index);

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let csv = out_dir.join(format!("{stem}.csv"));
    std::fs::write(&csv, to_csv(&headers, &rows)?)
        .with_context(|| format!("failed to write {}", csv.display()))?;
    let xlsx = out_dir.join(format!("{stem}.xlsx"));
    std::fs::write(&xlsx, to_xlsx(&headers, &rows)?)
        .with_context(|| format!("failed to write {}", xlsx.display()))?;
    info!("Wrote {} and {}", csv.display(), xlsx.display());

    service.release(job_id)?;
    Ok(RunOutput { csv, xlsx, status })
}

fn log_event(event: &ProgressEvent) {
    match (event.state, &event.result, event.error) {
        (TaskState::Succeeded, Some(link), _) => {
            info!(row = event.row_index, "Found on {}: {}", link.platform, link.url);
        }
        (TaskState::Failed | TaskState::Aborted, _, error) => {
            info!(
                row = event.row_index,
                attempts = event.attempt,
                "No link ({})",
                error.map_or_else(|| event.state.to_string(), |e| e.to_string())
            );
        }
        (TaskState::Retrying, _, _) => {
            debug!(
                row = event.row_index,
                attempt = event.attempt,
                "Retrying: {}",
                event.message.as_deref().unwrap_or("")
            );
        }
        _ => debug!(row = event.row_index, state = %event.state, "Progress"),
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl-C handler: {e}");
        std::future::pending::<()>().await;
    }
}
