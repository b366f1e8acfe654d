//! End-to-end synchronization tests with a fixture-backed feed and a file cursor

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use nvdmirror_core::types::Severity;
use nvdmirror_feed_sync::{
    CursorStore, DateWindow, FeedBatch, FeedSource, FeedSyncConfigBuilder, FileCursorStore,
    NoopProgress, RemoteFetchError, SyncOrchestratorBuilder, SyncOutcome, SyncStart, parse_feed,
};
use nvdmirror_record_store::{RecordStore, RecordStoreConfig};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Serves the fixture response, keeping only rows published inside the requested window
struct FixtureFeed {
    body: String,
}

impl FeedSource for FixtureFeed {
    async fn fetch_window(&self, window: &DateWindow) -> Result<FeedBatch, RemoteFetchError> {
        let page = parse_feed(&self.body).map_err(|e| RemoteFetchError::new(window, e.to_string()))?;
        let start = window.start.to_string();
        let end = window.end.to_string();
        let records: Vec<_> = page
            .records
            .into_iter()
            .filter(|r| r.published.as_str() >= start.as_str() && r.published.as_str() < end.as_str())
            .collect();
        Ok(FeedBatch {
            raw_count: records.len(),
            records,
            pages: 1,
        })
    }
}

fn seed_partition(dir: &std::path::Path) -> PathBuf {
    let partitions = dir.join("partitions");
    std::fs::create_dir_all(&partitions).unwrap();
    std::fs::write(
        partitions.join("2023.csv"),
        "cve_id,cve_published,cve_last_modified,severity,criteria,versionStartIncluding,versionEndExcluding,versionEndIncluding\n\
         CVE-2023-0286,2023-02-08T20:15:24.267,2023-02-24T15:15:11.567,HIGH,cpe:2.3:a:openssl:openssl:*:*:*:*:*:*:*:*,3.0.0,3.0.8,\n\
         CVE-2023-0464,2023-03-01T08:15:09.067,2023-03-07T15:15:10.257,HIGH,cpe:2.3:a:openssl:openssl:*:*:*:*:*:*:*:*,1.1.1,1.1.1u,\n",
    )
    .unwrap();
    partitions
}

#[tokio::test]
async fn test_sync_from_bootstrap_to_today() {
    let dir = tempfile::tempdir().unwrap();
    let partitions = seed_partition(dir.path());
    let cursor_path = dir.path().join("state.toml");

    let config = FeedSyncConfigBuilder::new()
        .cursor_path(&cursor_path)
        .request_delay(Duration::ZERO)
        .require_confirmation(false)
        .build()
        .unwrap();
    let feed = FixtureFeed {
        body: std::fs::read_to_string(fixture_path("nvd_window.json")).unwrap(),
    };
    let store = RecordStore::open(RecordStoreConfig::new(&partitions)).unwrap();
    let cursor = Arc::new(FileCursorStore::new(&cursor_path));

    let mut orchestrator = SyncOrchestratorBuilder::new()
        .config(config)
        .feed(Arc::new(feed))
        .store(store)
        .cursor(Arc::clone(&cursor))
        .progress(Arc::new(NoopProgress))
        .build()
        .unwrap();

    let start = orchestrator
        .synchronize_on(date(2023, 5, 10), |_| false)
        .await
        .unwrap();
    let SyncStart::Started { plan, .. } = start else {
        panic!("expected a background run, got {start:?}");
    };
    // resume cursor 2023-03-01 -> from 2023-03-02
    assert_eq!(plan.windows().first().map(|(_, w)| w.start), Some(date(2023, 3, 2)));

    let report = orchestrator.wait().await.unwrap().unwrap();
    assert_eq!(report.outcome, SyncOutcome::Completed);
    // tomcat x2 (March), openssl (May); LOW and firmware entries dropped
    assert_eq!(report.rows_added, 3);
    assert_eq!(cursor.load().unwrap(), Some(date(2023, 5, 10)));

    let on_disk = std::fs::read_to_string(&cursor_path).unwrap();
    assert!(on_disk.contains("last_sync_date = \"2023-05-10\""));

    let store = orchestrator.store();
    let store = store.lock().await;
    let tomcat = store.search(":tomcat:").unwrap();
    assert_eq!(tomcat.len(), 2);
    assert_eq!(tomcat[0].severity, Severity::Medium);
    assert!(tomcat[0].description.contains("RemoteIpFilter"));

    let openssl = store.search(":openssl:").unwrap();
    assert_eq!(openssl.len(), 3);
    assert_eq!(openssl[2].severity, Severity::High);
    assert_eq!(store.resume_cursor().unwrap(), date(2023, 5, 2));
}

#[tokio::test]
async fn test_second_run_same_day_is_already_synced() {
    let dir = tempfile::tempdir().unwrap();
    let partitions = seed_partition(dir.path());
    let cursor_path = dir.path().join("state.toml");
    std::fs::write(&cursor_path, "last_sync_date = \"2023-05-10\"\n").unwrap();

    let before = std::fs::read(partitions.join("2023.csv")).unwrap();
    let mut orchestrator = SyncOrchestratorBuilder::new()
        .config(
            FeedSyncConfigBuilder::new()
                .cursor_path(&cursor_path)
                .build()
                .unwrap(),
        )
        .feed(Arc::new(FixtureFeed {
            body: String::new(),
        }))
        .store(RecordStore::open(RecordStoreConfig::new(&partitions)).unwrap())
        .cursor(Arc::new(FileCursorStore::new(&cursor_path)))
        .build()
        .unwrap();

    let start = orchestrator
        .synchronize_on(date(2023, 5, 10), |_| true)
        .await
        .unwrap();
    assert_eq!(start, SyncStart::AlreadySynced);
    assert!(!orchestrator.is_busy());
    assert_eq!(std::fs::read(partitions.join("2023.csv")).unwrap(), before);
}

#[tokio::test]
async fn test_rerun_of_ingested_window_adds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let partitions = seed_partition(dir.path());
    let body = std::fs::read_to_string(fixture_path("nvd_window.json")).unwrap();
    let feed = FixtureFeed { body };
    let window = DateWindow::new(date(2023, 3, 1), date(2023, 6, 1)).unwrap();

    let mut store = RecordStore::open(RecordStoreConfig::new(&partitions)).unwrap();
    let batch = feed.fetch_window(&window).await.unwrap();
    assert_eq!(store.append(&batch.records, 2023).unwrap().appended, 3);
    let snapshot = std::fs::read(partitions.join("2023.csv")).unwrap();

    let batch = feed.fetch_window(&window).await.unwrap();
    assert_eq!(store.append(&batch.records, 2023).unwrap().appended, 0);
    assert_eq!(std::fs::read(partitions.join("2023.csv")).unwrap(), snapshot);
}
