//! 매처 에러 타입
//!
//! 버전 비교의 모호함은 에러가 아닙니다 ([`crate::version::VerdictReason`]).
//! [`MatcherError`]는 저장소 검색, 인벤토리 로딩, 감사 파일 기록 실패만 다룹니다.

use nvdmirror_core::error::NvdMirrorError;
use nvdmirror_record_store::StoreError;

/// 매처 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    /// 레코드 저장소 검색 실패
    #[error(transparent)]
    Store(#[from] StoreError),

    /// 인벤토리 파일 로딩/파싱 실패
    #[error("inventory error: {path}: {reason}")]
    Inventory {
        /// 인벤토리 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 판정 감사 파일 기록 실패
    #[error("findings audit error: {path}: {reason}")]
    Audit {
        /// 감사 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },
}

impl From<MatcherError> for NvdMirrorError {
    fn from(err: MatcherError) -> Self {
        match err {
            MatcherError::Store(store) => store.into(),
            other => NvdMirrorError::Matcher(other.to_string()),
        }
    }
}
