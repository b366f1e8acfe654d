//! 재개 커서 영속화
//!
//! 커서는 마지막으로 전체 동기화에 성공한 날짜(`yyyy-mm-dd`)입니다.
//! [`FileCursorStore`]는 TOML 상태 파일의 `last_sync_date` 키에 저장하며
//! 같은 파일의 다른 키는 보존합니다.
//!
//! ```toml
//! last_sync_date = "2023-05-10"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::FeedSyncError;

/// 상태 파일에서 커서를 저장하는 고정 키
pub const CURSOR_KEY: &str = "last_sync_date";

/// 커서 날짜 형식
const CURSOR_DATE_FORMAT: &str = "%Y-%m-%d";

/// 재개 커서 저장소
///
/// 동기 파일 I/O를 수행하므로 구현은 작고 빠르게 유지합니다.
pub trait CursorStore: Send + Sync + 'static {
    /// 저장된 커서를 읽습니다. 저장된 적이 없으면 `None`입니다.
    fn load(&self) -> Result<Option<NaiveDate>, FeedSyncError>;

    /// 커서를 저장합니다.
    fn save(&self, date: NaiveDate) -> Result<(), FeedSyncError>;
}

/// TOML 파일 기반 커서 저장소
#[derive(Debug, Clone)]
pub struct FileCursorStore {
    path: PathBuf,
}

impl FileCursorStore {
    /// 상태 파일 경로로 생성합니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 상태 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, reason: impl Into<String>) -> FeedSyncError {
        FeedSyncError::Cursor {
            path: self.path.display().to_string(),
            reason: reason.into(),
        }
    }

    fn read_table(&self) -> Result<toml::Table, FeedSyncError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => content
                .parse::<toml::Table>()
                .map_err(|e| self.error(format!("failed to parse state file: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(toml::Table::new()),
            Err(e) => Err(self.error(format!("failed to read state file: {e}"))),
        }
    }
}

impl CursorStore for FileCursorStore {
    fn load(&self) -> Result<Option<NaiveDate>, FeedSyncError> {
        let table = self.read_table()?;
        let Some(value) = table.get(CURSOR_KEY) else {
            return Ok(None);
        };

        let raw = value
            .as_str()
            .ok_or_else(|| self.error(format!("'{CURSOR_KEY}' must be a string")))?;
        let date = NaiveDate::parse_from_str(raw, CURSOR_DATE_FORMAT)
            .map_err(|e| self.error(format!("invalid '{CURSOR_KEY}' value '{raw}': {e}")))?;

        Ok(Some(date))
    }

    fn save(&self, date: NaiveDate) -> Result<(), FeedSyncError> {
        let mut table = self.read_table()?;
        table.insert(
            CURSOR_KEY.to_owned(),
            toml::Value::String(date.format(CURSOR_DATE_FORMAT).to_string()),
        );

        let content = toml::to_string(&table)
            .map_err(|e| self.error(format!("failed to encode state file: {e}")))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| self.error(format!("failed to create state dir: {e}")))?;
        }

        // 임시 파일에 쓴 뒤 교체하여 부분 기록을 남기지 않음
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| self.error(format!("failed to write state file: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| self.error(format!("failed to replace state file: {e}")))?;

        debug!(path = %self.path.display(), cursor = %date, "cursor saved");
        Ok(())
    }
}

/// 메모리 커서 저장소 (테스트, 일회성 실행용)
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    date: Mutex<Option<NaiveDate>>,
}

impl MemoryCursorStore {
    /// 초기 커서로 생성합니다.
    pub fn new(date: Option<NaiveDate>) -> Self {
        Self {
            date: Mutex::new(date),
        }
    }
}

impl CursorStore for MemoryCursorStore {
    fn load(&self) -> Result<Option<NaiveDate>, FeedSyncError> {
        self.date
            .lock()
            .map(|guard| *guard)
            .map_err(|e| FeedSyncError::Cursor {
                path: "<memory>".to_owned(),
                reason: e.to_string(),
            })
    }

    fn save(&self, date: NaiveDate) -> Result<(), FeedSyncError> {
        let mut guard = self.date.lock().map_err(|e| FeedSyncError::Cursor {
            path: "<memory>".to_owned(),
            reason: e.to_string(),
        })?;
        *guard = Some(date);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn missing_file_has_no_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCursorStore::new(dir.path().join("state.toml"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCursorStore::new(dir.path().join("nested").join("state.toml"));
        store.save(date(2023, 5, 10)).unwrap();
        assert_eq!(store.load().unwrap(), Some(date(2023, 5, 10)));

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("last_sync_date = \"2023-05-10\""));
    }

    #[test]
    fn save_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");
        std::fs::write(&path, "operator = \"ops\"\nlast_sync_date = \"2023-01-01\"\n").unwrap();

        let store = FileCursorStore::new(&path);
        store.save(date(2023, 2, 1)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("operator = \"ops\""));
        assert_eq!(store.load().unwrap(), Some(date(2023, 2, 1)));
    }

    #[test]
    fn invalid_cursor_value_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");
        std::fs::write(&path, "last_sync_date = \"10/05/2023\"\n").unwrap();

        let err = FileCursorStore::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("last_sync_date"));

        std::fs::write(&path, "last_sync_date = 20230510\n").unwrap();
        assert!(FileCursorStore::new(&path).load().is_err());
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryCursorStore::default();
        assert_eq!(store.load().unwrap(), None);
        store.save(date(2024, 1, 1)).unwrap();
        assert_eq!(store.load().unwrap(), Some(date(2024, 1, 1)));
    }
}
