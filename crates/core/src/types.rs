//! 도메인 타입: 시스템 전역에서 사용되는 공통 타입
//!
//! 피드 동기화, 레코드 저장소, 버전 매처가 공유하는 데이터 구조를 정의합니다.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 심각도 레벨
///
/// 미러는 CVSS v3.1 기준 HIGH/MEDIUM 항목만 보관합니다.
/// `Ord` 구현으로 비교가 가능합니다 (`Medium < High`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다. LOW, CRITICAL 등 보관 대상이 아닌 값은 `None`입니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" | "med" => Some(Self::Medium),
            _ => None,
        }
    }

    /// 파티션 파일에 기록되는 표기 (`HIGH`, `MEDIUM`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CVE가 공지한 취약 버전 범위
///
/// 세 경계 모두 선택적입니다. 피드에서 가져온 레코드는 최소 하나를 가집니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionBounds {
    /// 이 버전부터 영향 (포함)
    pub start_including: Option<String>,
    /// 이 버전부터 영향 없음 (제외)
    pub end_excluding: Option<String>,
    /// 이 버전까지 영향 (포함)
    pub end_including: Option<String>,
}

impl VersionBounds {
    /// 경계가 하나라도 존재하는지 반환합니다.
    pub fn has_any(&self) -> bool {
        self.start_including.is_some() || self.end_excluding.is_some() || self.end_including.is_some()
    }

    /// 상한 경계가 존재하는지 반환합니다.
    pub fn has_upper(&self) -> bool {
        self.end_excluding.is_some() || self.end_including.is_some()
    }
}

impl fmt::Display for VersionBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.start_including.as_deref().unwrap_or("*");
        match (&self.end_excluding, &self.end_including) {
            (Some(end), _) => write!(f, "[{start}, {end})"),
            (None, Some(end)) => write!(f, "[{start}, {end}]"),
            (None, None) => write!(f, "[{start}, *)"),
        }
    }
}

/// 단일 CVE 레코드 (파티션의 한 행)
///
/// 저장된 후에는 변경되거나 삭제되지 않고 추가만 됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CveRecord {
    /// CVE ID (예: CVE-2023-12345)
    pub cve_id: String,
    /// 공개 시각 (ISO 8601, 예: `2023-02-16T10:15:12.345`)
    pub published: String,
    /// 마지막 수정 시각 (ISO 8601)
    pub last_modified: String,
    /// 심각도
    pub severity: Severity,
    /// CPE 매칭 문자열 (vendor:product:version)
    pub criteria: String,
    /// 취약 버전 범위
    pub bounds: VersionBounds,
    /// 영어 설명 (부트스트랩 행에는 없을 수 있음)
    pub description: String,
}

impl CveRecord {
    /// 중복 제거 키 (`cve_id|published`)
    pub fn dedup_key(&self) -> String {
        format!("{}|{}", self.cve_id, self.published)
    }

    /// 공개 시각의 연도 부분을 반환합니다.
    ///
    /// 앞 네 글자가 정수가 아니면 `None`입니다.
    pub fn published_year(&self) -> Option<i32> {
        self.published.get(0..4)?.parse().ok()
    }
}

impl fmt::Display for CveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} {}",
            self.cve_id, self.severity, self.criteria, self.bounds
        )
    }
}

/// 설치된 패키지 (외부 수집기가 생성, 읽기 전용)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    /// 패키지를 선언한 소스 파일 경로
    pub source: PathBuf,
    /// 패키지 이름
    pub name: String,
    /// 설치된 버전 문자열
    pub version: String,
}

/// 소스 파일 경로 → {패키지 이름 → 버전} 매핑
///
/// 생태계별 매니페스트 파싱 결과를 정규화한 형태입니다.
pub type PackageInventory = BTreeMap<PathBuf, BTreeMap<String, String>>;

/// 인벤토리를 평탄화하여 패키지 목록으로 반환합니다 (경로, 이름 순서).
pub fn flatten_inventory(inventory: &PackageInventory) -> Vec<InstalledPackage> {
    inventory
        .iter()
        .flat_map(|(source, packages)| {
            packages.iter().map(move |(name, version)| InstalledPackage {
                source: source.clone(),
                name: name.clone(),
                version: version.clone(),
            })
        })
        .collect()
}
