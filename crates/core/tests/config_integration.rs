//! nvdmirror.toml 통합 설정 테스트
//!
//! - nvdmirror.toml.example 파싱 테스트
//! - 파일 로딩 + 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use nvdmirror_core::config::NvdMirrorConfig;
use nvdmirror_core::error::{ConfigError, NvdMirrorError};
use serial_test::serial;

// =============================================================================
// nvdmirror.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../nvdmirror.toml.example");
    let config = NvdMirrorConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.general.data_dir, "/var/lib/nvdmirror");
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../nvdmirror.toml.example");
    let config = NvdMirrorConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_has_feed_and_store_sections() {
    let content = include_str!("../../../nvdmirror.toml.example");
    let config = NvdMirrorConfig::parse(content).expect("should parse");

    assert_eq!(
        config.feed.base_url,
        "https://services.nvd.nist.gov/rest/json/cves"
    );
    assert_eq!(config.feed.schema_version, "2.0");
    assert!(config.feed.api_key.is_empty());
    assert_eq!(config.feed.request_delay_ms, None);
    assert_eq!(config.store.audit_dir, "/var/lib/nvdmirror/audit");
    assert_eq!(config.sync.cursor_path, "/var/lib/nvdmirror/state.toml");
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
#[serial]
async fn load_applies_env_overrides_after_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nvdmirror.toml");
    std::fs::write(&path, "[feed]\nresults_per_page = 100\n").unwrap();

    // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
    unsafe { std::env::set_var("NVDMIRROR_FEED_RESULTS_PER_PAGE", "250") };
    let config = NvdMirrorConfig::load(&path).await;
    unsafe { std::env::remove_var("NVDMIRROR_FEED_RESULTS_PER_PAGE") };

    assert_eq!(config.unwrap().feed.results_per_page, 250);
}

#[tokio::test]
#[serial]
async fn load_rejects_invalid_env_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nvdmirror.toml");
    std::fs::write(&path, "").unwrap();

    // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
    unsafe { std::env::set_var("NVDMIRROR_GENERAL_LOG_FORMAT", "xml") };
    let result = NvdMirrorConfig::load(&path).await;
    unsafe { std::env::remove_var("NVDMIRROR_GENERAL_LOG_FORMAT") };

    assert!(matches!(
        result,
        Err(NvdMirrorError::Config(ConfigError::InvalidValue { .. }))
    ));
}

#[tokio::test]
async fn empty_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nvdmirror.toml");
    std::fs::write(&path, "").unwrap();

    let config = NvdMirrorConfig::from_file(&path).await.unwrap();
    assert_eq!(config.feed.results_per_page, 2000);
}

#[tokio::test]
async fn malformed_file_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nvdmirror.toml");
    std::fs::write(&path, "[store\npartition_dir = ").unwrap();

    let result = NvdMirrorConfig::from_file(&path).await;
    assert!(matches!(
        result,
        Err(NvdMirrorError::Config(ConfigError::ParseFailed { .. }))
    ));
}
