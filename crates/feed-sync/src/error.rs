//! 피드 동기화 에러 타입
//!
//! - [`RemoteFetchError`]: 원격 피드 전송/HTTP/디코딩 실패. 복구 가능하며
//!   실행 결과(`SyncOutcome::Failed`)로 보고되고 다음 실행에서 재시도됩니다.
//! - [`FeedSyncError`]: 동기화 시작 단계의 에러. 저장소의 `Setup`/`Validation`
//!   에러는 치명적이므로 그대로 전파됩니다.

use nvdmirror_core::error::{ConfigError, NvdMirrorError};
use nvdmirror_record_store::StoreError;

/// 원격 피드 조회 실패 (복구 가능)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("remote fetch failed for window {window}: {reason}")]
pub struct RemoteFetchError {
    /// 실패한 윈도우 (`[start, end)`)
    pub window: String,
    /// 원본 에러 메시지
    pub reason: String,
}

impl RemoteFetchError {
    /// 윈도우와 사유로 에러를 생성합니다.
    pub fn new(window: impl ToString, reason: impl Into<String>) -> Self {
        Self {
            window: window.to_string(),
            reason: reason.into(),
        }
    }
}

/// 피드 동기화 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum FeedSyncError {
    /// 저장소 에러 (Setup/Validation은 치명적)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// 원격 피드 조회 실패
    #[error(transparent)]
    RemoteFetch(#[from] RemoteFetchError),

    /// 이미 백그라운드 실행이 진행 중
    #[error("a synchronization run is already in progress")]
    AlreadyRunning,

    /// 커서 파일 읽기/쓰기 실패
    #[error("cursor error: {path}: {reason}")]
    Cursor {
        /// 커서 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 백그라운드 태스크 조인 실패
    #[error("background task failed: {0}")]
    Task(String),
}

impl FeedSyncError {
    /// 운영자 개입이 필요한 에러인지 반환합니다.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_fatal())
    }
}

impl From<FeedSyncError> for NvdMirrorError {
    fn from(err: FeedSyncError) -> Self {
        match err {
            FeedSyncError::Store(e) => e.into(),
            FeedSyncError::RemoteFetch(e) => NvdMirrorError::RemoteFetch(e.to_string()),
            FeedSyncError::Config { field, reason } => {
                NvdMirrorError::Config(ConfigError::InvalidValue { field, reason })
            }
            other => NvdMirrorError::Sync(other.to_string()),
        }
    }
}
