//! 원격 피드 추상화
//!
//! [`FeedSource`] trait은 날짜 윈도우 하나의 후보 레코드를 가져옵니다.
//! 운영 환경은 [`NvdFeedClient`]를, 테스트는 모의 구현을 사용합니다.
//!
//! ```text
//!   SyncOrchestrator
//!          |
//!     FeedSource (trait)
//!       |        |
//!  NvdFeedClient  Mock
//!       |
//!   NVD REST API
//! ```

mod nvd;
mod parse;

use std::future::Future;

use nvdmirror_core::types::CveRecord;

use crate::error::RemoteFetchError;
use crate::planner::DateWindow;

pub use nvd::NvdFeedClient;
pub use parse::{FeedPage, parse_feed};

/// 윈도우 하나의 조회 결과 (모든 페이지 병합)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedBatch {
    /// 필터링을 통과한 후보 행
    pub records: Vec<CveRecord>,
    /// 응답에 포함된 전체 취약점 수 (필터링 전)
    pub raw_count: usize,
    /// 요청한 페이지 수
    pub pages: usize,
}

/// 원격 CVE 피드
///
/// `Send + Sync + 'static`이므로 `Arc`로 백그라운드 태스크와 공유할 수 있습니다.
///
/// # Errors
///
/// 전송, HTTP 상태, 디코딩 실패는 모두 [`RemoteFetchError`]로 반환되며
/// 패닉하거나 치명적 에러가 되지 않습니다.
pub trait FeedSource: Send + Sync + 'static {
    /// 공개일이 `[window.start, window.end)`인 후보 레코드를 가져옵니다.
    fn fetch_window(
        &self,
        window: &DateWindow,
    ) -> impl Future<Output = Result<FeedBatch, RemoteFetchError>> + Send;
}
