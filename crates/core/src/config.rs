//! 설정 관리: nvdmirror.toml 파싱 및 런타임 설정
//!
//! [`NvdMirrorConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`NVDMIRROR_FEED_API_KEY=...` 형식)
//! 3. 설정 파일 (`nvdmirror.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), nvdmirror_core::error::NvdMirrorError> {
//! use nvdmirror_core::config::NvdMirrorConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = NvdMirrorConfig::load("nvdmirror.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = NvdMirrorConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, NvdMirrorError};

/// NVD API가 허용하는 페이지당 최대 결과 수
const MAX_RESULTS_PER_PAGE: u32 = 2000;

/// 요청 타임아웃 상한 (초)
const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

/// nvdmirror 통합 설정
///
/// `nvdmirror.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NvdMirrorConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 원격 피드 설정
    #[serde(default)]
    pub feed: FeedConfig,
    /// 파티션 저장소 설정
    #[serde(default)]
    pub store: StoreConfig,
    /// 동기화 설정
    #[serde(default)]
    pub sync: SyncConfig,
}

impl NvdMirrorConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, NvdMirrorError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, NvdMirrorError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NvdMirrorError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                NvdMirrorError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, NvdMirrorError> {
        toml::from_str(toml_str).map_err(|e| {
            NvdMirrorError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `NVDMIRROR_{SECTION}_{FIELD}`
    /// 예: `NVDMIRROR_FEED_API_KEY=...`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "NVDMIRROR_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "NVDMIRROR_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.data_dir, "NVDMIRROR_GENERAL_DATA_DIR");

        // Feed
        override_string(&mut self.feed.base_url, "NVDMIRROR_FEED_BASE_URL");
        override_string(&mut self.feed.schema_version, "NVDMIRROR_FEED_SCHEMA_VERSION");
        override_string(&mut self.feed.api_key, "NVDMIRROR_FEED_API_KEY");
        override_u64(
            &mut self.feed.request_timeout_secs,
            "NVDMIRROR_FEED_REQUEST_TIMEOUT_SECS",
        );
        override_u32(
            &mut self.feed.results_per_page,
            "NVDMIRROR_FEED_RESULTS_PER_PAGE",
        );

        // Store
        override_string(&mut self.store.partition_dir, "NVDMIRROR_STORE_PARTITION_DIR");
        override_string(&mut self.store.audit_dir, "NVDMIRROR_STORE_AUDIT_DIR");
        override_string(&mut self.store.findings_path, "NVDMIRROR_STORE_FINDINGS_PATH");

        // Sync
        override_string(&mut self.sync.cursor_path, "NVDMIRROR_SYNC_CURSOR_PATH");
        override_bool(
            &mut self.sync.require_confirmation,
            "NVDMIRROR_SYNC_REQUIRE_CONFIRMATION",
        );
        override_bool(&mut self.sync.check_only, "NVDMIRROR_SYNC_CHECK_ONLY");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), NvdMirrorError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // 피드 URL 검증
        if !self.feed.base_url.starts_with("http://") && !self.feed.base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "feed.base_url".to_owned(),
                reason: "must be an http(s) URL".to_owned(),
            }
            .into());
        }

        if self.feed.schema_version.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "feed.schema_version".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.feed.results_per_page == 0 || self.feed.results_per_page > MAX_RESULTS_PER_PAGE {
            return Err(ConfigError::InvalidValue {
                field: "feed.results_per_page".to_owned(),
                reason: format!("must be 1-{MAX_RESULTS_PER_PAGE}"),
            }
            .into());
        }

        if self.feed.request_timeout_secs == 0
            || self.feed.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS
        {
            return Err(ConfigError::InvalidValue {
                field: "feed.request_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_REQUEST_TIMEOUT_SECS}"),
            }
            .into());
        }

        // 경로 검증: 비어있으면 안 되며 ".." 컴포넌트 금지
        let required_paths = [
            ("store.partition_dir", &self.store.partition_dir),
            ("store.findings_path", &self.store.findings_path),
            ("sync.cursor_path", &self.sync.cursor_path),
        ];
        for (field, value) in required_paths {
            if value.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "must not be empty".to_owned(),
                }
                .into());
            }
            check_no_parent_dir(field, value)?;
        }

        // audit_dir는 비어있으면 감사 파일 비활성화
        if !self.store.audit_dir.is_empty() {
            check_no_parent_dir("store.audit_dir", &self.store.audit_dir)?;
        }

        Ok(())
    }
}

fn check_no_parent_dir(field: &str, value: &str) -> Result<(), NvdMirrorError> {
    if Path::new(value)
        .components()
        .any(|c| c == std::path::Component::ParentDir)
    {
        return Err(ConfigError::InvalidValue {
            field: field.to_owned(),
            reason: format!("path '{value}' contains path traversal pattern '..'"),
        }
        .into());
    }
    Ok(())
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 데이터 디렉토리
    pub data_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            data_dir: "/var/lib/nvdmirror".to_owned(),
        }
    }
}

/// 원격 피드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// 피드 기본 URL (스키마 버전 제외)
    pub base_url: String,
    /// 피드 스키마 버전 (URL 경로에 붙음)
    pub schema_version: String,
    /// NVD API 키 (비어있으면 사용하지 않음)
    pub api_key: String,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 페이지당 결과 수 (최대 2000)
    pub results_per_page: u32,
    /// 페이지 요청 사이 지연 (밀리초). 없으면 API 키 유무로 결정
    pub request_delay_ms: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://services.nvd.nist.gov/rest/json/cves".to_owned(),
            schema_version: "2.0".to_owned(),
            api_key: String::new(),
            request_timeout_secs: 30,
            results_per_page: MAX_RESULTS_PER_PAGE,
            request_delay_ms: None,
        }
    }
}

/// 파티션 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 연도별 파티션 CSV 디렉토리
    pub partition_dir: String,
    /// 검색 감사 CSV 디렉토리 (비어있으면 기록하지 않음)
    pub audit_dir: String,
    /// 취약점 판정 감사 CSV 경로
    pub findings_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            partition_dir: "/var/lib/nvdmirror/partitions".to_owned(),
            audit_dir: String::new(),
            findings_path: "/var/lib/nvdmirror/findings.csv".to_owned(),
        }
    }
}

/// 동기화 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// 재개 커서를 저장하는 상태 파일 경로
    pub cursor_path: String,
    /// 백그라운드 동기화 시작 전 확인 필요 여부
    pub require_confirmation: bool,
    /// 크기 산정만 수행하고 실제 동기화는 하지 않음
    pub check_only: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cursor_path: "/var/lib/nvdmirror/state.toml".to_owned(),
            require_confirmation: true,
            check_only: false,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
