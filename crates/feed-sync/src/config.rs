//! 피드 동기화 설정
//!
//! [`FeedSyncConfig`]는 core의 `[feed]`, `[sync]` 섹션에서 파생되며
//! 요청 간 지연을 API 키 유무에 따라 결정합니다.
//!
//! # 사용 예시
//!
//! ```
//! use std::time::Duration;
//! use nvdmirror_feed_sync::FeedSyncConfigBuilder;
//!
//! let config = FeedSyncConfigBuilder::new()
//!     .base_url("https://services.nvd.nist.gov/rest/json/cves")
//!     .request_delay(Duration::ZERO)
//!     .check_only(true)
//!     .build()
//!     .unwrap();
//! assert!(config.check_only);
//! ```

use std::path::{Component, PathBuf};
use std::time::Duration;

use nvdmirror_core::config::NvdMirrorConfig;

use crate::error::FeedSyncError;

/// API 키 없이 요청할 때의 요청 간 지연 (공개 한도: 30초당 5회)
pub const ANONYMOUS_REQUEST_DELAY: Duration = Duration::from_secs(6);

/// API 키로 요청할 때의 요청 간 지연 (30초당 50회)
pub const KEYED_REQUEST_DELAY: Duration = Duration::from_millis(600);

/// 페이지당 최대 결과 수 (원격 API 상한)
const MAX_RESULTS_PER_PAGE: u32 = 2000;

/// 피드 동기화 설정
#[derive(Debug, Clone)]
pub struct FeedSyncConfig {
    /// 피드 기본 URL (스키마 버전 제외)
    pub base_url: String,
    /// 피드 스키마 버전 (URL 경로에 붙음)
    pub schema_version: String,
    /// API 키 (없으면 익명 요청)
    pub api_key: Option<String>,
    /// 요청 타임아웃
    pub request_timeout: Duration,
    /// 페이지당 결과 수
    pub results_per_page: u32,
    /// 요청 간 지연
    pub request_delay: Duration,
    /// 커서 상태 파일 경로
    pub cursor_path: PathBuf,
    /// 백그라운드 실행 전 승인 필요 여부
    pub require_confirmation: bool,
    /// 계획만 산정하고 실행하지 않음
    pub check_only: bool,
}

impl Default for FeedSyncConfig {
    fn default() -> Self {
        Self::from_core(&NvdMirrorConfig::default())
    }
}

impl FeedSyncConfig {
    /// core 설정에서 동기화 설정을 생성합니다.
    ///
    /// 빈 `api_key`는 키 없음으로 취급하며, `request_delay_ms`가 없으면
    /// 키 유무에 따른 기본 지연을 사용합니다.
    pub fn from_core(core: &NvdMirrorConfig) -> Self {
        let api_key = Some(core.feed.api_key.trim().to_owned()).filter(|k| !k.is_empty());
        let request_delay = match core.feed.request_delay_ms {
            Some(ms) => Duration::from_millis(ms),
            None => default_request_delay(api_key.is_some()),
        };

        Self {
            base_url: core.feed.base_url.clone(),
            schema_version: core.feed.schema_version.clone(),
            api_key,
            request_timeout: Duration::from_secs(core.feed.request_timeout_secs),
            results_per_page: core.feed.results_per_page,
            request_delay,
            cursor_path: PathBuf::from(&core.sync.cursor_path),
            require_confirmation: core.sync.require_confirmation,
            check_only: core.sync.check_only,
        }
    }

    /// 피드 엔드포인트 (`{base_url}/{schema_version}`)
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.schema_version.trim_matches('/')
        )
    }

    /// 설정 값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), FeedSyncError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(config_error("base_url", "must start with http:// or https://"));
        }
        if self.schema_version.trim().is_empty() {
            return Err(config_error("schema_version", "must not be empty"));
        }
        if self.results_per_page == 0 || self.results_per_page > MAX_RESULTS_PER_PAGE {
            return Err(config_error(
                "results_per_page",
                &format!("must be 1-{MAX_RESULTS_PER_PAGE}"),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(config_error("request_timeout", "must be greater than zero"));
        }
        if self.cursor_path.as_os_str().is_empty() {
            return Err(config_error("cursor_path", "must not be empty"));
        }
        if self
            .cursor_path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(config_error("cursor_path", "path traversal not allowed"));
        }
        Ok(())
    }
}

/// API 키 유무에 따른 기본 요청 간 지연
pub fn default_request_delay(has_api_key: bool) -> Duration {
    if has_api_key {
        KEYED_REQUEST_DELAY
    } else {
        ANONYMOUS_REQUEST_DELAY
    }
}

fn config_error(field: &str, reason: &str) -> FeedSyncError {
    FeedSyncError::Config {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}

/// 피드 동기화 설정 빌더
#[derive(Debug, Default)]
pub struct FeedSyncConfigBuilder {
    config: FeedSyncConfig,
}

impl FeedSyncConfigBuilder {
    /// 기본값으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 피드 기본 URL을 설정합니다.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// 스키마 버전을 설정합니다.
    pub fn schema_version(mut self, version: impl Into<String>) -> Self {
        self.config.schema_version = version.into();
        self
    }

    /// API 키를 설정합니다. 지연이 명시되지 않았다면 키 기준 기본값으로 바뀝니다.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        if self.config.request_delay == ANONYMOUS_REQUEST_DELAY {
            self.config.request_delay = KEYED_REQUEST_DELAY;
        }
        self.config.api_key = Some(key.into());
        self
    }

    /// 요청 타임아웃을 설정합니다.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// 페이지당 결과 수를 설정합니다.
    pub fn results_per_page(mut self, count: u32) -> Self {
        self.config.results_per_page = count;
        self
    }

    /// 요청 간 지연을 설정합니다.
    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.config.request_delay = delay;
        self
    }

    /// 커서 상태 파일 경로를 설정합니다.
    pub fn cursor_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cursor_path = path.into();
        self
    }

    /// 승인 필요 여부를 설정합니다.
    pub fn require_confirmation(mut self, required: bool) -> Self {
        self.config.require_confirmation = required;
        self
    }

    /// 계획만 산정하는 모드를 설정합니다.
    pub fn check_only(mut self, check_only: bool) -> Self {
        self.config.check_only = check_only;
        self
    }

    /// 설정을 검증하고 반환합니다.
    pub fn build(self) -> Result<FeedSyncConfig, FeedSyncError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
