//! 파티션 CSV 형식 -- 헤더, 행 변환, 읽기/쓰기
//!
//! 파티션은 `<year>.csv` 이름의 CSV 파일이며 한 행이 하나의 [`CveRecord`]입니다.
//!
//! # 컬럼
//!
//! ```text
//! cve_id,cve_published,cve_last_modified,severity,criteria,
//! versionStartIncluding,versionEndExcluding,versionEndIncluding,description
//! ```
//!
//! 읽기는 헤더 이름으로 컬럼을 찾습니다. `cve_id`, `cve_published` 외의 컬럼은
//! 생략될 수 있습니다 (부트스트랩 파일에는 `description`이 없는 경우가 있음).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use nvdmirror_core::types::{CveRecord, Severity, VersionBounds};

use crate::error::StoreError;

/// 파티션 파일 헤더
pub const PARTITION_HEADER: [&str; 9] = [
    "cve_id",
    "cve_published",
    "cve_last_modified",
    "severity",
    "criteria",
    "versionStartIncluding",
    "versionEndExcluding",
    "versionEndIncluding",
    "description",
];

/// 파티션 파일 확장자
const PARTITION_EXTENSION: &str = "csv";

/// 연도에 해당하는 파티션 파일 이름
pub fn partition_file_name(year: i32) -> String {
    format!("{year}.{PARTITION_EXTENSION}")
}

/// 파일 이름에서 연도 라벨을 추출합니다 (`2023.csv` → 2023).
///
/// 네 자리 숫자 라벨이 아니면 `None`입니다.
pub fn parse_year_label(file_name: &str) -> Option<i32> {
    let stem = file_name.strip_suffix(".csv")?;
    if stem.len() != 4 || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// 레코드를 파티션 컬럼 순서의 필드 목록으로 변환합니다.
pub fn to_fields(record: &CveRecord) -> [&str; 9] {
    [
        &record.cve_id,
        &record.published,
        &record.last_modified,
        record.severity.as_str(),
        &record.criteria,
        record.bounds.start_including.as_deref().unwrap_or(""),
        record.bounds.end_excluding.as_deref().unwrap_or(""),
        record.bounds.end_including.as_deref().unwrap_or(""),
        &record.description,
    ]
}

/// 로그/에러 메시지용 행 표현
pub fn row_content(record: &CveRecord) -> String {
    to_fields(record).join(",")
}

/// 헤더 이름 → 컬럼 인덱스
struct ColumnMap {
    cve_id: usize,
    published: usize,
    last_modified: Option<usize>,
    severity: Option<usize>,
    criteria: Option<usize>,
    start_including: Option<usize>,
    end_excluding: Option<usize>,
    end_including: Option<usize>,
    description: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord, path: &Path) -> Result<Self, StoreError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &str| {
            find(name).ok_or_else(|| StoreError::Csv {
                path: path.display().to_string(),
                reason: format!("missing required column '{name}'"),
            })
        };

        Ok(Self {
            cve_id: required("cve_id")?,
            published: required("cve_published")?,
            last_modified: find("cve_last_modified"),
            severity: find("severity"),
            criteria: find("criteria"),
            start_including: find("versionStartIncluding"),
            end_excluding: find("versionEndExcluding"),
            end_including: find("versionEndIncluding"),
            description: find("description"),
        })
    }
}

fn field(row: &StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| row.get(i)).unwrap_or("").trim().to_owned()
}

fn optional_field(row: &StringRecord, idx: Option<usize>) -> Option<String> {
    let value = field(row, idx);
    if value.is_empty() { None } else { Some(value) }
}

/// 파티션 파일의 모든 행을 읽습니다.
///
/// 컬럼 수가 다른 행도 허용합니다. 심각도가 HIGH/MEDIUM이 아닌 행은
/// [`StoreError::Validation`]으로 거부합니다.
pub fn read_partition(path: &Path) -> Result<Vec<CveRecord>, StoreError> {
    let display = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(&display, e))?;

    let headers = reader.headers().map_err(|e| csv_error(&display, e))?.clone();
    let columns = ColumnMap::from_headers(&headers, path)?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let raw = result.map_err(|e| csv_error(&display, e))?;
        let severity_raw = field(&raw, columns.severity);
        let severity =
            Severity::from_str_loose(&severity_raw).ok_or_else(|| StoreError::Validation {
                path: display.clone(),
                row,
                content: raw.iter().collect::<Vec<_>>().join(","),
                reason: format!("unsupported severity '{severity_raw}'"),
            })?;

        records.push(CveRecord {
            cve_id: field(&raw, Some(columns.cve_id)),
            published: field(&raw, Some(columns.published)),
            last_modified: field(&raw, columns.last_modified),
            severity,
            criteria: field(&raw, columns.criteria),
            bounds: VersionBounds {
                start_including: optional_field(&raw, columns.start_including),
                end_excluding: optional_field(&raw, columns.end_excluding),
                end_including: optional_field(&raw, columns.end_including),
            },
            description: field(&raw, columns.description),
        });
    }

    Ok(records)
}

/// 공개 시각에서 (연, 월, 일)을 추출합니다.
///
/// `YYYY-MM-DD` 접두어가 숫자로 파싱되고 실제 존재하는 날짜여야 합니다.
pub fn published_date_parts(published: &str) -> Option<(i32, u32, u32)> {
    let year: i32 = published.get(0..4)?.parse().ok()?;
    let month: u32 = published.get(5..7)?.parse().ok()?;
    let day: u32 = published.get(8..10)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?;
    Some((year, month, day))
}

/// 파티션 행이 연도 라벨과 일치하는지 검증하고 가장 늦은 (월, 일)을 반환합니다.
///
/// 행이 없으면 `Ok(None)`입니다.
pub fn validate_rows(
    path: &Path,
    year: i32,
    records: &[CveRecord],
) -> Result<Option<(u32, u32)>, StoreError> {
    let mut latest: Option<(u32, u32)> = None;

    for (row, record) in records.iter().enumerate() {
        let invalid = |reason: String| StoreError::Validation {
            path: path.display().to_string(),
            row,
            content: row_content(record),
            reason,
        };

        let (row_year, month, day) = published_date_parts(&record.published)
            .ok_or_else(|| invalid(format!("unparseable published date '{}'", record.published)))?;

        if row_year != year {
            return Err(invalid(format!(
                "published year {row_year} does not belong to partition {year}"
            )));
        }

        latest = latest.max(Some((month, day)));
    }

    Ok(latest)
}

/// 레코드를 파티션 파일 끝에 추가합니다.
///
/// 모든 행을 메모리에서 인코딩한 뒤 한 번의 쓰기로 추가하므로 동시 독자가
/// 일부만 기록된 행을 보지 않습니다. `write_header`가 참이면 헤더를 먼저 씁니다.
pub fn append_rows(path: &Path, records: &[CveRecord], write_header: bool) -> Result<(), StoreError> {
    let display = path.display().to_string();
    let buffer = encode_rows(&display, records, write_header)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| io_error(&display, e))?;
    file.write_all(&buffer).map_err(|e| io_error(&display, e))?;
    file.sync_data().map_err(|e| io_error(&display, e))?;

    Ok(())
}

/// 레코드를 새 CSV 파일로 씁니다 (기존 내용은 덮어씀).
pub fn write_rows(path: &Path, records: &[CveRecord]) -> Result<(), StoreError> {
    let display = path.display().to_string();
    let buffer = encode_rows(&display, records, true)?;
    std::fs::write(path, buffer).map_err(|e| io_error(&display, e))
}

fn encode_rows(display: &str, records: &[CveRecord], write_header: bool) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    if write_header {
        writer
            .write_record(PARTITION_HEADER)
            .map_err(|e| csv_error(display, e))?;
    }
    for record in records {
        writer
            .write_record(to_fields(record))
            .map_err(|e| csv_error(display, e))?;
    }

    writer.into_inner().map_err(|e| StoreError::Csv {
        path: display.to_owned(),
        reason: e.to_string(),
    })
}

fn csv_error(path: &str, err: csv::Error) -> StoreError {
    StoreError::Csv {
        path: path.to_owned(),
        reason: err.to_string(),
    }
}

pub(crate) fn io_error(path: &str, err: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_owned(),
        source: err,
    }
}
