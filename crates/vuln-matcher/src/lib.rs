//! 설치 버전 취약점 판정
//!
//! 설치된 패키지 버전을 CVE의 취약 버전 범위와 비교합니다. 시맨틱 버전 규격이
//! 아닌, 점으로 구분된 숫자 구성요소의 좌→우 첫 차이 비교를 사용하며
//! 비교할 수 없는 경우를 에러 대신 분류된 판정 사유로 보고합니다.
//!
//! # 모듈 구조
//!
//! - [`version`]: 판정 알고리즘 (`evaluate`, `Verdict`, `VerdictReason`)
//! - [`finding`]: 판정 결과 (`VulnerabilityFinding`, `ScanReport`)
//! - [`inventory`]: 설치 패키지 목록 JSON 로더
//! - [`scanner`]: 저장소 검색 + 판정 (`VulnScanner`)
//! - [`audit`]: 판정 감사 CSV (`FindingsAudit`)
//! - [`error`]: 에러 타입 (`MatcherError`)

pub mod audit;
pub mod error;
pub mod finding;
pub mod inventory;
pub mod scanner;
pub mod version;

pub use audit::{FINDINGS_HEADER, FindingsAudit};
pub use error::MatcherError;
pub use finding::{ScanReport, VulnerabilityFinding};
pub use inventory::{load_inventory, parse_inventory};
pub use scanner::{VulnScanner, criteria_needle};
pub use version::{Verdict, VerdictReason, evaluate};
