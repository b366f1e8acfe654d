//! 레코드 저장소 -- 연도 파티션 추가, 재개 커서, 검색
//!
//! [`RecordStore`]는 `<partition_dir>/<year>.csv` 파일 집합을 관리합니다.
//!
//! # 불변 조건
//!
//! - 각 파티션의 모든 행은 파티션 연도에 공개된 레코드입니다.
//! - 한 파티션 안에서 `cve_id|published` 키는 유일합니다.
//! - 행은 추가만 되며 수정/삭제되지 않습니다.
//!
//! # 동기 I/O
//!
//! 모든 메서드는 블로킹 파일 I/O를 수행합니다. async 컨텍스트에서는
//! `tokio::task::spawn_blocking`으로 감싸서 호출하세요.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use nvdmirror_core::metrics as m;
use nvdmirror_core::types::CveRecord;
use tracing::{debug, info, warn};

use crate::config::RecordStoreConfig;
use crate::dedup::DedupIndex;
use crate::error::StoreError;
use crate::partition::{self, io_error};

/// 파티션 추가 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    /// 새로 기록된 행 수
    pub appended: usize,
    /// 파티션에 이미 있는 키라서 제외된 행 수
    pub duplicates: usize,
    /// 공개 연도가 파티션 연도와 달라 제외된 행 수
    pub misplaced: usize,
}

/// 전체 이력 가져오기 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// 연도별 추가된 행 수
    pub appended_per_year: BTreeMap<i32, usize>,
    /// 중복으로 제외된 행 수
    pub duplicates: usize,
    /// 공개 연도를 알 수 없어 건너뛴 행 수
    pub skipped: usize,
}

impl ImportSummary {
    /// 전체 추가된 행 수
    pub fn total_appended(&self) -> usize {
        self.appended_per_year.values().sum()
    }
}

/// 연도별 CVE 파티션 저장소
///
/// 중복 제거 인덱스는 파티션마다 처음 추가할 때 한 번 구축되고 이후 재사용됩니다.
pub struct RecordStore {
    config: RecordStoreConfig,
    dedup: HashMap<i32, DedupIndex>,
}

impl RecordStore {
    /// 저장소를 엽니다.
    ///
    /// 디렉토리가 없어도 에러가 아닙니다 (첫 추가 시 생성).
    pub fn open(config: RecordStoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        Ok(Self {
            config,
            dedup: HashMap::new(),
        })
    }

    /// 저장소 설정
    pub fn config(&self) -> &RecordStoreConfig {
        &self.config
    }

    /// 연도에 해당하는 파티션 파일 경로
    pub fn partition_path(&self, year: i32) -> PathBuf {
        self.config
            .partition_dir
            .join(partition::partition_file_name(year))
    }

    /// 존재하는 파티션 연도 목록 (오름차순)
    pub fn years(&self) -> Result<Vec<i32>, StoreError> {
        let dir = &self.config.partition_dir;
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&dir.display().to_string(), e)),
        };

        let mut years = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&dir.display().to_string(), e))?;
            if !entry.path().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && let Some(year) = partition::parse_year_label(name)
            {
                years.push(year);
            }
        }
        years.sort_unstable();
        Ok(years)
    }

    /// 가장 최근 파티션 연도
    pub fn latest_year(&self) -> Result<Option<i32>, StoreError> {
        Ok(self.years()?.last().copied())
    }

    /// 파티션의 행 수 (파티션이 없으면 0)
    pub fn row_count(&self, year: i32) -> Result<usize, StoreError> {
        let path = self.partition_path(year);
        if !path.exists() {
            return Ok(0);
        }
        Ok(partition::read_partition(&path)?.len())
    }

    /// 파티션을 검증하고 가장 늦은 공개일을 반환합니다.
    ///
    /// 모든 행의 공개 연도가 파티션 연도와 같아야 하며 날짜 필드가 파싱되어야 합니다.
    /// 행이 없는 파티션은 `Ok(None)`입니다.
    pub fn validate(&self, year: i32) -> Result<Option<NaiveDate>, StoreError> {
        let path = self.partition_path(year);
        let records = partition::read_partition(&path)?;
        let Some((month, day)) = partition::validate_rows(&path, year, &records)? else {
            return Ok(None);
        };

        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            StoreError::Validation {
                path: path.display().to_string(),
                row: records.len().saturating_sub(1),
                content: format!("{year}-{month:02}-{day:02}"),
                reason: "latest published date is not a calendar date".to_owned(),
            }
        })?;

        debug!(year, rows = records.len(), latest = %date, "partition validated");
        Ok(Some(date))
    }

    /// 재개 커서: 가장 최근 파티션의 가장 늦은 공개일
    ///
    /// 파티션이 없으면 [`StoreError::Setup`], 최근 파티션이 연도 라벨과 불일치하면
    /// [`StoreError::Validation`]입니다. 최근 파티션에 행이 없으면 전년도 12월 31일을
    /// 반환하여 해당 연도 1월 1일부터 동기화가 시작되게 합니다.
    pub fn resume_cursor(&self) -> Result<NaiveDate, StoreError> {
        let Some(year) = self.latest_year()? else {
            return Err(StoreError::Setup {
                dir: self.config.partition_dir.display().to_string(),
            });
        };

        match self.validate(year)? {
            Some(date) => Ok(date),
            None => NaiveDate::from_ymd_opt(year - 1, 12, 31).ok_or_else(|| StoreError::Config {
                field: "partition_dir".to_owned(),
                reason: format!("partition year {year} is out of range"),
            }),
        }
    }

    /// 레코드를 연도 파티션에 추가합니다.
    ///
    /// 파티션에 이미 존재하는 키만 제외합니다. 한 CVE의 cpeMatch 행들은 같은 키를
    /// 공유하므로 배치 안에서는 서로를 걸러내지 않습니다. 새 키는 기록에 성공한 뒤
    /// 인덱스에 등록합니다. 남은 행이 없으면 파일을 건드리지 않으며 새 파일에만
    /// 헤더를 씁니다.
    pub fn append(&mut self, records: &[CveRecord], year: i32) -> Result<AppendOutcome, StoreError> {
        let mut outcome = AppendOutcome::default();
        if records.is_empty() {
            return Ok(outcome);
        }

        let path = self.partition_path(year);
        let file_exists = path.exists();
        let index = self.dedup_index(year, &path, file_exists)?;

        let mut fresh = Vec::with_capacity(records.len());
        for record in records {
            if record.published_year() != Some(year) {
                warn!(
                    cve_id = %record.cve_id,
                    published = %record.published,
                    year,
                    "record does not belong to partition, skipping"
                );
                outcome.misplaced += 1;
                continue;
            }
            if index.contains(record) {
                outcome.duplicates += 1;
            } else {
                fresh.push(record.clone());
            }
        }

        metrics::counter!(m::STORE_ROWS_DEDUPLICATED_TOTAL).increment(outcome.duplicates as u64);

        if fresh.is_empty() {
            debug!(year, duplicates = outcome.duplicates, "nothing new to append");
            return Ok(outcome);
        }

        if !file_exists {
            std::fs::create_dir_all(&self.config.partition_dir)
                .map_err(|e| io_error(&self.config.partition_dir.display().to_string(), e))?;
        }

        if let Err(e) = partition::append_rows(&path, &fresh, !file_exists) {
            // 부분 기록이 있을 수 있으므로 다음 호출에서 디스크로부터 다시 구축
            self.dedup.remove(&year);
            return Err(e);
        }

        if let Some(index) = self.dedup.get_mut(&year) {
            index.extend(&fresh);
        }

        outcome.appended = fresh.len();
        metrics::counter!(m::STORE_ROWS_APPENDED_TOTAL).increment(outcome.appended as u64);
        info!(
            year,
            appended = outcome.appended,
            duplicates = outcome.duplicates,
            path = %path.display(),
            "partition appended"
        );

        Ok(outcome)
    }

    fn dedup_index(
        &mut self,
        year: i32,
        path: &Path,
        file_exists: bool,
    ) -> Result<&mut DedupIndex, StoreError> {
        if !self.dedup.contains_key(&year) {
            let index = if file_exists {
                let existing = partition::read_partition(path)?;
                debug!(year, rows = existing.len(), "building dedup index");
                DedupIndex::from_records(&existing)
            } else {
                DedupIndex::new()
            };
            self.dedup.insert(year, index);
        }

        self.dedup.get_mut(&year).ok_or_else(|| StoreError::Config {
            field: "dedup".to_owned(),
            reason: format!("index for {year} missing after build"),
        })
    }

    /// 모든 파티션에서 `criteria` 부분 문자열을 포함하는 행을 찾습니다.
    ///
    /// 결과는 연도 오름차순, 파티션 내 기록 순서입니다. 감사 디렉토리가 설정되어
    /// 있으면 결과를 `search_<criteria>.csv`로 기록합니다.
    pub fn search(&self, criteria: &str) -> Result<Vec<CveRecord>, StoreError> {
        let mut matches = Vec::new();
        for year in self.years()? {
            let rows = partition::read_partition(&self.partition_path(year))?;
            matches.extend(rows.into_iter().filter(|r| r.criteria.contains(criteria)));
        }

        debug!(criteria, matches = matches.len(), "partition search finished");

        if let Some(audit_path) = self.audit_path(criteria) {
            if let Some(parent) = audit_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| io_error(&parent.display().to_string(), e))?;
            }
            partition::write_rows(&audit_path, &matches)?;
            debug!(path = %audit_path.display(), "search audit written");
        }

        Ok(matches)
    }

    /// 검색어에 대한 감사 파일 경로 (감사 비활성화 시 None)
    pub fn audit_path(&self, criteria: &str) -> Option<PathBuf> {
        let audit_dir = self.config.audit_dir.as_ref()?;
        let sanitized: String = criteria
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Some(audit_dir.join(format!("search_{}.csv", sanitized.trim_matches('_'))))
    }

    /// 전체 이력 CSV를 가져와 연도 파티션으로 분배합니다 (초기 1회 부트스트랩).
    ///
    /// 원본은 파티션과 같은 컬럼 형식이어야 합니다. 이미 존재하는 키는 제외되므로
    /// 재실행해도 안전합니다.
    pub fn import_file(&mut self, source: &Path) -> Result<ImportSummary, StoreError> {
        let records = partition::read_partition(source)?;
        let mut summary = ImportSummary::default();

        let mut by_year: BTreeMap<i32, Vec<CveRecord>> = BTreeMap::new();
        for record in records {
            match record.published_year() {
                Some(year) => by_year.entry(year).or_default().push(record),
                None => {
                    warn!(cve_id = %record.cve_id, published = %record.published, "no published year, skipping");
                    summary.skipped += 1;
                }
            }
        }

        for (year, rows) in by_year {
            let outcome = self.append(&rows, year)?;
            summary.duplicates += outcome.duplicates;
            summary.appended_per_year.insert(year, outcome.appended);
        }

        info!(
            source = %source.display(),
            appended = summary.total_appended(),
            duplicates = summary.duplicates,
            skipped = summary.skipped,
            "history import finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use nvdmirror_core::types::{Severity, VersionBounds};

    use super::*;

    fn record(cve_id: &str, published: &str, criteria: &str) -> CveRecord {
        CveRecord {
            cve_id: cve_id.to_owned(),
            published: published.to_owned(),
            last_modified: published.to_owned(),
            severity: Severity::High,
            criteria: criteria.to_owned(),
            bounds: VersionBounds {
                start_including: Some("1.0".to_owned()),
                end_excluding: None,
                end_including: None,
            },
            description: String::new(),
        }
    }

    fn open(dir: &Path) -> RecordStore {
        RecordStore::open(RecordStoreConfig::new(dir.join("partitions"))).unwrap()
    }

    #[test]
    fn years_empty_when_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        assert!(store.years().unwrap().is_empty());
        assert_eq!(store.latest_year().unwrap(), None);
    }

    #[test]
    fn resume_cursor_without_partitions_is_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let err = store.resume_cursor().unwrap_err();
        assert!(matches!(err, StoreError::Setup { .. }));
    }

    #[test]
    fn append_deduplicates_against_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());

        let a = record("CVE-2023-1", "2023-01-02T00:00:00.000", "cpe:2.3:a:x:lib:*");
        let b = record("CVE-2023-2", "2023-01-03T00:00:00.000", "cpe:2.3:a:x:lib:*");

        let first = store.append(&[a.clone()], 2023).unwrap();
        assert_eq!(first.appended, 1);
        assert_eq!(first.duplicates, 0);

        let second = store.append(&[a.clone(), b], 2023).unwrap();
        assert_eq!(second.appended, 1);
        assert_eq!(second.duplicates, 1);

        assert_eq!(store.row_count(2023).unwrap(), 2);
    }

    #[test]
    fn append_keeps_every_cpe_match_row_of_a_cve() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());

        let published = "2023-03-22T11:15:10.033";
        let mut tomcat_85 = record("CVE-2023-28708", published, "cpe:2.3:a:apache:tomcat:*");
        tomcat_85.bounds = VersionBounds {
            start_including: Some("8.5.0".to_owned()),
            end_excluding: Some("8.5.86".to_owned()),
            end_including: None,
        };
        let mut tomcat_90 = tomcat_85.clone();
        tomcat_90.bounds = VersionBounds {
            start_including: Some("9.0.0".to_owned()),
            end_excluding: Some("9.0.72".to_owned()),
            end_including: None,
        };
        let batch = vec![tomcat_85, tomcat_90];

        let first = store.append(&batch, 2023).unwrap();
        assert_eq!(first.appended, 2);
        assert_eq!(first.duplicates, 0);

        let found = store.search(":tomcat:").unwrap();
        let upper: Vec<_> = found
            .iter()
            .filter_map(|r| r.bounds.end_excluding.as_deref())
            .collect();
        assert_eq!(upper, vec!["8.5.86", "9.0.72"]);

        // 같은 윈도우 재처리는 아무것도 추가하지 않음
        let before = std::fs::read(store.partition_path(2023)).unwrap();
        let second = store.append(&batch, 2023).unwrap();
        assert_eq!(second.appended, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(std::fs::read(store.partition_path(2023)).unwrap(), before);

        // 디스크에서 다시 구축한 인덱스도 같은 결과
        let mut reopened = open(dir.path());
        assert_eq!(reopened.append(&batch, 2023).unwrap().appended, 0);
        assert_eq!(reopened.row_count(2023).unwrap(), 2);
    }

    #[test]
    fn append_rebuilds_index_from_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = record("CVE-2023-1", "2023-01-02T00:00:00.000", "cpe:2.3:a:x:lib:*");

        open(dir.path()).append(&[a.clone()], 2023).unwrap();

        // 새 인스턴스는 디스크에서 인덱스를 구축해야 함
        let mut reopened = open(dir.path());
        let outcome = reopened.append(&[a], 2023).unwrap();
        assert_eq!(outcome.appended, 0);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(reopened.row_count(2023).unwrap(), 1);
    }

    #[test]
    fn append_with_nothing_new_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        let outcome = store.append(&[], 2024).unwrap();
        assert_eq!(outcome, AppendOutcome::default());
        assert!(!store.partition_path(2024).exists());
    }

    #[test]
    fn append_skips_misplaced_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        let stray = record("CVE-2022-9", "2022-12-31T00:00:00.000", "cpe:2.3:a:x:lib:*");
        let outcome = store.append(&[stray], 2023).unwrap();
        assert_eq!(outcome.misplaced, 1);
        assert!(!store.partition_path(2023).exists());
    }

    #[test]
    fn resume_cursor_uses_latest_partition() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path());
        store
            .append(&[record("CVE-2022-1", "2022-12-30T00:00:00.000", "c")], 2022)
            .unwrap();
        store
            .append(
                &[
                    record("CVE-2023-1", "2023-05-09T00:00:00.000", "c"),
                    record("CVE-2023-2", "2023-03-01T00:00:00.000", "c"),
                ],
                2023,
            )
            .unwrap();

        assert_eq!(store.years().unwrap(), vec![2022, 2023]);
        assert_eq!(
            store.resume_cursor().unwrap(),
            NaiveDate::from_ymd_opt(2023, 5, 9).unwrap()
        );
    }

    #[test]
    fn resume_cursor_rejects_corrupt_latest_partition() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        std::fs::create_dir_all(&store.config().partition_dir).unwrap();
        std::fs::write(
            store.partition_path(2023),
            "cve_id,cve_published,severity\n\
             CVE-2023-1,2023-01-01T00:00:00.000,HIGH\n\
             CVE-2022-5,2022-07-01T00:00:00.000,HIGH\n",
        )
        .unwrap();

        let err = store.resume_cursor().unwrap_err();
        match err {
            StoreError::Validation { row, content, .. } => {
                assert_eq!(row, 1);
                assert!(content.contains("CVE-2022-5"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resume_cursor_for_header_only_partition() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        std::fs::create_dir_all(&store.config().partition_dir).unwrap();
        std::fs::write(store.partition_path(2024), "cve_id,cve_published,severity\n").unwrap();

        assert_eq!(
            store.resume_cursor().unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
    }

    #[test]
    fn search_matches_substring_and_writes_audit() {
        let dir = tempfile::tempdir().unwrap();
        let config = RecordStoreConfig::new(dir.path().join("partitions"))
            .with_audit_dir(dir.path().join("audit"));
        let mut store = RecordStore::open(config).unwrap();

        store
            .append(
                &[record("CVE-2022-1", "2022-02-01T00:00:00.000", "cpe:2.3:a:apache:log4j:*")],
                2022,
            )
            .unwrap();
        store
            .append(
                &[
                    record("CVE-2023-1", "2023-02-01T00:00:00.000", "cpe:2.3:a:apache:log4j:*"),
                    record("CVE-2023-2", "2023-02-02T00:00:00.000", "cpe:2.3:a:openssl:openssl:*"),
                ],
                2023,
            )
            .unwrap();

        let found = store.search(":log4j:").unwrap();
        let ids: Vec<&str> = found.iter().map(|r| r.cve_id.as_str()).collect();
        assert_eq!(ids, vec!["CVE-2022-1", "CVE-2023-1"]);

        let audit = store.audit_path(":log4j:").unwrap();
        assert!(audit.ends_with("search_log4j.csv"));
        let written = partition::read_partition(&audit).unwrap();
        assert_eq!(written.len(), 2);
    }

    #[test]
    fn search_without_audit_dir_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        assert!(store.search("anything").unwrap().is_empty());
        assert!(store.audit_path("anything").is_none());
    }

    #[test]
    fn import_distributes_rows_by_year() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("history.csv");
        std::fs::write(
            &source,
            "cve_id,cve_published,severity,criteria\n\
             CVE-2021-1,2021-04-01T00:00:00.000,HIGH,cpe:a\n\
             CVE-2022-1,2022-04-01T00:00:00.000,MEDIUM,cpe:b\n\
             CVE-2022-1,2022-04-01T00:00:00.000,MEDIUM,cpe:b2\n\
             CVE-XXXX-1,unknown,HIGH,cpe:c\n",
        )
        .unwrap();

        let mut store = open(dir.path());
        let summary = store.import_file(&source).unwrap();
        assert_eq!(summary.total_appended(), 3);
        assert_eq!(summary.duplicates, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(store.years().unwrap(), vec![2021, 2022]);
        assert_eq!(store.row_count(2022).unwrap(), 2);

        // 재실행은 아무것도 추가하지 않음
        let again = store.import_file(&source).unwrap();
        assert_eq!(again.total_appended(), 0);
        assert_eq!(again.duplicates, 3);
    }
}
