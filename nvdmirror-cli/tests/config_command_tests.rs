//! Integration tests for the configuration files the `nvdmirror` binary loads.
//!
//! Exercises config loading, validation and environment overrides with real TOML files.

use std::fs;
use std::path::PathBuf;

use serial_test::serial;
use tempfile::TempDir;

use nvdmirror_core::config::NvdMirrorConfig;
use nvdmirror_feed_sync::FeedSyncConfig;
use nvdmirror_record_store::RecordStoreConfig;

fn example_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("nvdmirror.toml.example")
}

#[tokio::test]
async fn test_example_config_is_valid() {
    let config = NvdMirrorConfig::load(example_config_path())
        .await
        .expect("shipped example config should load");

    assert_eq!(config.feed.schema_version, "2.0");
    assert!(config.sync.require_confirmation);

    let sync = FeedSyncConfig::from_core(&config);
    sync.validate().expect("derived sync config should validate");
    assert_eq!(sync.endpoint(), "https://services.nvd.nist.gov/rest/json/cves/2.0");

    let store = RecordStoreConfig::from_core(&config.store);
    store.validate().expect("derived store config should validate");
    assert!(store.audit_dir.is_some());
}

#[tokio::test]
async fn test_config_validate_malformed_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, "[general\nlog_level = \"info\"\n").expect("should write config");

    let result = NvdMirrorConfig::load(&config_path).await;
    assert!(result.is_err(), "malformed TOML should fail to load");
}

#[tokio::test]
async fn test_config_rejects_path_traversal() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("nvdmirror.toml");
    fs::write(
        &config_path,
        "[store]\npartition_dir = \"/var/lib/nvdmirror/../../etc\"\n",
    )
    .expect("should write config");

    let err = NvdMirrorConfig::load(&config_path)
        .await
        .expect_err("traversal should be rejected");
    assert!(err.to_string().contains("partition_dir"));
}

#[tokio::test]
#[serial]
async fn test_env_override_api_key_shortens_delay() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("nvdmirror.toml");
    fs::write(&config_path, "[feed]\nresults_per_page = 500\n").expect("should write config");

    // SAFETY: serialized test, no other thread reads the environment concurrently
    unsafe { std::env::set_var("NVDMIRROR_FEED_API_KEY", "test-key") };
    let result = NvdMirrorConfig::load(&config_path).await;
    unsafe { std::env::remove_var("NVDMIRROR_FEED_API_KEY") };

    let config = result.expect("config with env override should load");
    assert_eq!(config.feed.api_key, "test-key");

    let sync = FeedSyncConfig::from_core(&config);
    assert_eq!(sync.api_key.as_deref(), Some("test-key"));
    assert!(sync.request_delay < std::time::Duration::from_secs(1));
}
