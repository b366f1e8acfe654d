//! NVD 피드 증분 동기화
//!
//! 마지막 동기화 이후 누락된 공개일 범위만 원격 피드에서 가져와
//! 연도 파티션 저장소에 중복 없이 추가합니다.
//!
//! # 모듈 구조
//!
//! - [`planner`]: 날짜 윈도우 플래너 (앞쪽 일 / 월 단위 / 뒤쪽 일)
//! - [`feed`]: 원격 피드 추상화 (`FeedSource`), NVD 클라이언트, 순수 파서
//! - [`cursor`]: 재개 커서 영속화 (`CursorStore`)
//! - [`progress`]: 진행 상황 관찰자 (`SyncProgress`)
//! - [`orchestrator`]: 백그라운드 동기화 실행 (`SyncOrchestrator`)
//! - [`config`]: 동기화 설정 (`FeedSyncConfig`)
//! - [`error`]: 에러 타입 (`FeedSyncError`, `RemoteFetchError`)
//!
//! # 데이터 흐름
//!
//! ```text
//! RecordStore::resume_cursor() ──> planner::plan(from, today)
//!                                        |
//!                     for each (phase, window), in order
//!                                        |
//!                          FeedSource::fetch_window()
//!                                        |
//!                     RecordStore::append(records, year)
//!                                        |
//!                   CursorStore::save(today)  (전체 성공 시에만)
//! ```

pub mod config;
pub mod cursor;
pub mod error;
pub mod feed;
pub mod orchestrator;
pub mod planner;
pub mod progress;

pub use config::{FeedSyncConfig, FeedSyncConfigBuilder};
pub use cursor::{CursorStore, FileCursorStore, MemoryCursorStore};
pub use error::{FeedSyncError, RemoteFetchError};
pub use feed::{FeedBatch, FeedSource, NvdFeedClient, parse_feed};
pub use orchestrator::{
    SyncOrchestrator, SyncOrchestratorBuilder, SyncOutcome, SyncReport, SyncStart, SyncState,
};
pub use planner::{DateWindow, Phase, SyncPlan, plan};
pub use progress::{NoopProgress, SyncProgress, TracingProgress};
