//! 연도별 CVE 파티션 저장소
//!
//! # 모듈 구조
//!
//! - [`error`]: 저장소 에러 타입 (`StoreError`)
//! - [`config`]: 저장소 설정 (`RecordStoreConfig`)
//! - [`partition`]: 파티션 CSV 형식 (헤더, 행 변환, 읽기/쓰기)
//! - [`dedup`]: `cve_id|published` 중복 제거 인덱스 (`DedupIndex`)
//! - [`store`]: 저장소 본체 (`RecordStore`)
//!
//! # 디렉토리 구조
//!
//! ```text
//! <partition_dir>/
//!   2022.csv
//!   2023.csv      # 가장 최근 파티션이 재개 커서를 결정
//! <audit_dir>/
//!   search_log4j.csv
//! ```

pub mod config;
pub mod dedup;
pub mod error;
pub mod partition;
pub mod store;

pub use config::RecordStoreConfig;
pub use dedup::DedupIndex;
pub use error::StoreError;
pub use partition::PARTITION_HEADER;
pub use store::{AppendOutcome, ImportSummary, RecordStore};
