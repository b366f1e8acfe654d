//! 레코드 저장소 설정
//!
//! [`RecordStoreConfig`]는 core의 [`StoreConfig`](nvdmirror_core::config::StoreConfig)에서
//! 파생됩니다. 빈 문자열인 `audit_dir`는 검색 감사 기록 비활성화를 뜻합니다.
//!
//! # 사용 예시
//!
//! ```
//! use nvdmirror_record_store::RecordStoreConfig;
//!
//! let config = RecordStoreConfig::new("/tmp/partitions").with_audit_dir("/tmp/audit");
//! config.validate().unwrap();
//! ```

use std::path::{Component, Path, PathBuf};

use crate::error::StoreError;

/// 레코드 저장소 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStoreConfig {
    /// 연도 파티션 디렉토리
    pub partition_dir: PathBuf,
    /// 검색 감사 CSV 디렉토리 (None이면 기록하지 않음)
    pub audit_dir: Option<PathBuf>,
}

impl RecordStoreConfig {
    /// 파티션 디렉토리만 지정하여 생성합니다.
    pub fn new(partition_dir: impl Into<PathBuf>) -> Self {
        Self {
            partition_dir: partition_dir.into(),
            audit_dir: None,
        }
    }

    /// 검색 감사 디렉토리를 지정합니다.
    pub fn with_audit_dir(mut self, audit_dir: impl Into<PathBuf>) -> Self {
        self.audit_dir = Some(audit_dir.into());
        self
    }

    /// core의 `StoreConfig`에서 저장소 설정을 생성합니다.
    pub fn from_core(core: &nvdmirror_core::config::StoreConfig) -> Self {
        let audit_dir = if core.audit_dir.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&core.audit_dir))
        };

        Self {
            partition_dir: PathBuf::from(&core.partition_dir),
            audit_dir,
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// - `partition_dir`: 비어있으면 안 되며 `..` 구성요소 금지
    /// - `audit_dir`: 지정된 경우 `..` 구성요소 금지
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.partition_dir.as_os_str().is_empty() {
            return Err(StoreError::Config {
                field: "partition_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        reject_parent_dir("partition_dir", &self.partition_dir)?;

        if let Some(audit_dir) = &self.audit_dir {
            reject_parent_dir("audit_dir", audit_dir)?;
        }

        Ok(())
    }
}

fn reject_parent_dir(field: &str, path: &Path) -> Result<(), StoreError> {
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(StoreError::Config {
            field: field.to_owned(),
            reason: format!("path traversal not allowed: {}", path.display()),
        });
    }
    Ok(())
}
