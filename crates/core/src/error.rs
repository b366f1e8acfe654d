//! 에러 타입: 도메인별 에러 정의
//!
//! 각 크레이트는 자체 에러 타입(`StoreError`, `FeedSyncError`, `MatcherError`)을
//! 가지며, `From<...> for NvdMirrorError` 구현으로 최상위 타입으로 전파됩니다.
//!
//! # 분류
//!
//! - **Setup** (치명적): 초기 전체 이력 가져오기가 되어 있지 않음
//! - **Validation** (치명적): 파티션 내용이 연도 라벨과 불일치
//! - **RemoteFetch** (복구 가능): 원격 피드 전송/HTTP 실패
//! - 버전 비교의 모호함은 에러가 아니라 분류된 판정 사유로 표현됩니다.

/// nvdmirror 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum NvdMirrorError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 부트스트랩 데이터 없음, 운영자 조치 필요
    #[error("setup error: {0}")]
    Setup(String),

    /// 파티션 검증 실패, 운영자 조치 필요
    #[error("validation error: {0}")]
    Validation(String),

    /// 원격 피드 조회 실패 (다음 실행에서 재시도)
    #[error("remote fetch error: {0}")]
    RemoteFetch(String),

    /// 동기화 실행 에러
    #[error("sync error: {0}")]
    Sync(String),

    /// 취약점 매칭 에러
    #[error("matcher error: {0}")]
    Matcher(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl NvdMirrorError {
    /// 운영자 개입이 필요한 치명적 에러인지 반환합니다.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Setup(_) | Self::Validation(_))
    }
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: NvdMirrorError = ConfigError::InvalidValue {
            field: "feed.base_url".to_owned(),
            reason: "must not be empty".to_owned(),
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("feed.base_url"));
        assert!(msg.contains("must not be empty"));
    }

    #[test]
    fn setup_and_validation_are_fatal() {
        assert!(NvdMirrorError::Setup("no partitions".to_owned()).is_fatal());
        assert!(NvdMirrorError::Validation("row 3".to_owned()).is_fatal());
        assert!(!NvdMirrorError::RemoteFetch("timeout".to_owned()).is_fatal());
        assert!(!NvdMirrorError::Sync("cancelled".to_owned()).is_fatal());
    }

    #[test]
    fn io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = NvdMirrorError::from(io_err);
        assert!(err.to_string().contains("no such file"));
    }
}
