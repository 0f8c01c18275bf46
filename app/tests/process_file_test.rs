//! Full pipeline runs with an in-process resolver.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracklink_app::process_file;
use tracklink_core::{JobConfig, JobStatus, Link, Platform, Query};
use tracklink_ingest::RowIngestor;
use tracklink_resolver::{LinkResolver, Resolution};
use tracklink_search::{JobService, ProgressBroadcaster, SearchOrchestrator};

const PLAYLIST: &str = "Track Name,Artist Name(s),Album Name\n\
                        Clocks,Coldplay,A Rush of Blood to the Head\n\
                        Unknown Demo,Nobody,\n\
                        Aquarela,Toquinho,Aquarela\n";

/// Finds everything except tracks by "Nobody".
struct CatalogResolver {
    latency: Duration,
}

#[async_trait]
impl LinkResolver for CatalogResolver {
    async fn resolve(&self, query: &Query) -> tracklink_resolver::Result<Resolution> {
        tokio::time::sleep(self.latency).await;
        if query.artist_name == "Nobody" {
            return Ok(Resolution::NotFound);
        }
        Ok(Resolution::Found(Link::new(
            Platform::FourShared,
            format!("https://www.4shared.com/file/{}", query.row_index),
        )))
    }

    fn name(&self) -> &str {
        "catalog"
    }
}

fn service(latency: Duration) -> JobService {
    let orchestrator = SearchOrchestrator::new(
        Arc::new(CatalogResolver { latency }),
        Arc::new(ProgressBroadcaster::default()),
    );
    JobService::with_orchestrator(orchestrator, Duration::from_secs(3600))
}

#[tokio::test(start_paused = true)]
async fn test_writes_csv_and_xlsx_exports() {
    let dir = TempDir::new().expect("temp dir");
    let service = service(Duration::from_millis(10));
    let ingested = RowIngestor::new().ingest(PLAYLIST.as_bytes()).expect("ingest");
    let config = JobConfig::new(0.1, 2, 2).expect("config");

    let output = process_file(
        &service,
        config,
        ingested,
        dir.path(),
        "playlist_with_links",
        std::future::pending(),
    )
    .await
    .expect("process");

    assert_eq!(output.status, JobStatus::Completed);
    assert_eq!(output.csv, dir.path().join("playlist_with_links.csv"));

    let csv = std::fs::read_to_string(&output.csv).expect("read csv");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "Track Name,Artist Name(s),Album Name,Platform,URL,Status,Error,Attempts"
    );
    assert!(lines[1].starts_with("Clocks,Coldplay,"));
    assert!(lines[1].ends_with(",4shared,https://www.4shared.com/file/0,Succeeded,,1"));
    assert_eq!(lines[2], "Unknown Demo,Nobody,,,,Failed,NotFound,1");
    assert!(lines[3].starts_with("Aquarela,Toquinho,Aquarela,4shared,"));

    let xlsx = std::fs::read(&output.xlsx).expect("read xlsx");
    assert!(xlsx.starts_with(b"PK"));

    // job is released once its export is written
    assert_eq!(service.job_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_writes_partial_export() {
    let dir = TempDir::new().expect("temp dir");
    let service = service(Duration::from_secs(2));
    let ingested = RowIngestor::new().ingest(PLAYLIST.as_bytes()).expect("ingest");
    let config = JobConfig::new(1.0, 1, 1).expect("config");

    let output = process_file(
        &service,
        config,
        ingested,
        dir.path(),
        "partial",
        tokio::time::sleep(Duration::from_millis(2500)),
    )
    .await
    .expect("process");

    assert_eq!(output.status, JobStatus::Aborted);
    let csv = std::fs::read_to_string(&output.csv).expect("read csv");
    let statuses: Vec<&str> = csv
        .lines()
        .skip(1)
        .map(|line| line.rsplit(',').nth(2).unwrap_or_default())
        .collect();
    assert_eq!(statuses, vec!["Succeeded", "Aborted", "Aborted"]);
}

#[tokio::test(start_paused = true)]
async fn test_rows_without_artist_stay_in_export() {
    let dir = TempDir::new().expect("temp dir");
    let service = service(Duration::from_millis(10));
    let playlist = "Track Name,Artist Name(s)\nClocks,Coldplay\nNo Artist,\nAquarela,Toquinho\n";
    let ingested = RowIngestor::new().ingest(playlist.as_bytes()).expect("ingest");
    assert_eq!(ingested.queries.len(), 2);
    let config = JobConfig::new(0.1, 1, 1).expect("config");

    let output = process_file(
        &service,
        config,
        ingested,
        dir.path(),
        "skipped",
        std::future::pending(),
    )
    .await
    .expect("process");

    let csv = std::fs::read_to_string(&output.csv).expect("read csv");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("Clocks,Coldplay,4shared,"));
    assert_eq!(lines[2], "No Artist,,,,Skipped,,0");
    assert_eq!(
        lines[3],
        "Aquarela,Toquinho,4shared,https://www.4shared.com/file/2,Succeeded,,1"
    );
}
