//! nvdmirror 공통 크레이트
//!
//! NVD 피드 미러링과 버전 취약점 매칭을 구성하는 모든 크레이트가 공유하는
//! 타입, 에러, 설정, 메트릭 이름을 정의합니다.
//!
//! # 모듈 구조
//!
//! - [`config`]: `nvdmirror.toml` 파싱 및 환경변수 오버라이드 (`NvdMirrorConfig`)
//! - [`error`]: 최상위 에러 타입 (`NvdMirrorError`, `ConfigError`)
//! - [`metrics`]: 메트릭 이름 상수 및 설명 등록
//! - [`types`]: 도메인 타입 (`CveRecord`, `VersionBounds`, `Severity`, `InstalledPackage`)

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, NvdMirrorError};

// 설정
pub use config::NvdMirrorConfig;

// 도메인 타입
pub use types::{CveRecord, InstalledPackage, PackageInventory, Severity, VersionBounds};
