//! 레코드 저장소 에러 타입
//!
//! [`StoreError`]는 파티션 읽기/쓰기/검증 중 발생하는 에러를 나타냅니다.
//! `From<StoreError> for NvdMirrorError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **치명적**: `Setup`, `Validation`, 운영자 조치 전까지 동기화 불가
//! - **I/O**: `Io`, `Csv`
//! - **설정**: `Config`

use nvdmirror_core::error::NvdMirrorError;

/// 레코드 저장소 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 파티션이 하나도 없음
    #[error(
        "no year partitions found in {dir}: bootstrap the mirror with a one-time full-history import before syncing"
    )]
    Setup {
        /// 파티션 디렉토리
        dir: String,
    },

    /// 파티션 내용이 연도 라벨과 불일치하거나 날짜 필드 파싱 실패
    #[error("partition {path} is invalid at row {row}: {reason} (row: {content})")]
    Validation {
        /// 파티션 파일 경로
        path: String,
        /// 데이터 행 인덱스 (0부터)
        row: usize,
        /// 행 내용
        content: String,
        /// 실패 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// CSV 인코딩/디코딩 에러
    #[error("csv error: {path}: {reason}")]
    Csv {
        /// 관련 파일 경로
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
}

impl StoreError {
    /// 운영자 개입이 필요한 에러인지 반환합니다.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Setup { .. } | Self::Validation { .. })
    }
}

impl From<StoreError> for NvdMirrorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Setup { .. } => NvdMirrorError::Setup(err.to_string()),
            StoreError::Validation { .. } => NvdMirrorError::Validation(err.to_string()),
            StoreError::Io { source, .. } => NvdMirrorError::Io(source),
            StoreError::Csv { .. } | StoreError::Config { .. } => {
                NvdMirrorError::Sync(err.to_string())
            }
        }
    }
}
