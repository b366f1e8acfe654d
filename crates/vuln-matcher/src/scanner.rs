//! 인벤토리 스캐너 -- 저장소 검색 + 버전 판정
//!
//! [`VulnScanner`]는 패키지마다 `:<name>:` 부분 문자열로 [`RecordStore`]를
//! 검색하고, 찾은 CVE 행 각각을 [`evaluate`]로 판정합니다.
//!
//! # 사용 흐름
//!
//! 1. `load_inventory()` -- 인벤토리 JSON 로드
//! 2. `VulnScanner::new(&store)` -- 스캐너 생성
//! 3. `VulnScanner::scan(&inventory)` -- 전체 스캔
//! 4. `FindingsAudit::write()` -- 감사 CSV 기록

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use metrics::counter;
use tracing::{debug, info};

use nvdmirror_core::metrics as m;
use nvdmirror_core::types::{
    CveRecord, InstalledPackage, PackageInventory, Severity, flatten_inventory,
};
use nvdmirror_record_store::RecordStore;

use crate::error::MatcherError;
use crate::finding::{ScanReport, VulnerabilityFinding};
use crate::version::evaluate;

/// 패키지 이름에 대한 criteria 검색 문자열 (`:<소문자 이름>:`)
///
/// CPE 문자열의 product 필드는 콜론으로 둘러싸여 있습니다.
pub fn criteria_needle(package: &str) -> String {
    format!(":{}:", package.trim().to_lowercase())
}

/// 인벤토리 스캐너
pub struct VulnScanner<'a> {
    store: &'a RecordStore,
    /// 판정 대상 최소 심각도
    min_severity: Severity,
}

impl<'a> VulnScanner<'a> {
    /// 저장소를 검색하는 스캐너를 생성합니다. 최소 심각도 기본값은 MEDIUM입니다.
    pub fn new(store: &'a RecordStore) -> Self {
        Self {
            store,
            min_severity: Severity::Medium,
        }
    }

    /// 판정 대상 최소 심각도를 설정합니다.
    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    /// 최소 심각도
    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    /// 설치 패키지 하나를 판정합니다.
    pub fn scan_package(
        &self,
        package: &InstalledPackage,
    ) -> Result<Vec<VulnerabilityFinding>, MatcherError> {
        let records = self.store.search(&criteria_needle(&package.name))?;
        Ok(self.judge(package, &records))
    }

    /// 인벤토리 전체를 판정합니다.
    ///
    /// 같은 이름의 패키지가 여러 소스에 있으면 저장소 검색은 한 번만 합니다.
    pub fn scan(&self, inventory: &PackageInventory) -> Result<ScanReport, MatcherError> {
        let packages = flatten_inventory(inventory);
        let mut searched: HashMap<String, Vec<CveRecord>> = HashMap::new();
        let mut report = ScanReport {
            packages_scanned: packages.len(),
            findings: Vec::new(),
        };

        for package in &packages {
            let records = match searched.entry(criteria_needle(&package.name)) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let found = self.store.search(entry.key())?;
                    entry.insert(found)
                }
            };
            report.findings.extend(self.judge(package, records));
        }

        info!(
            packages = report.packages_scanned,
            findings = report.findings.len(),
            vulnerable = report.vulnerable_count(),
            "inventory scan finished"
        );
        Ok(report)
    }

    fn judge(&self, package: &InstalledPackage, records: &[CveRecord]) -> Vec<VulnerabilityFinding> {
        let findings: Vec<VulnerabilityFinding> = records
            .iter()
            .filter(|record| record.severity >= self.min_severity)
            .map(|record| {
                let verdict = evaluate(&package.version, &record.bounds);
                counter!(m::MATCHER_VERDICTS_TOTAL, m::LABEL_REASON => verdict.reason.tag())
                    .increment(1);
                VulnerabilityFinding {
                    source: package.source.clone(),
                    package: package.name.clone(),
                    version: package.version.clone(),
                    vulnerable: verdict.vulnerable,
                    cve_id: record.cve_id.clone(),
                    severity: record.severity,
                    bounds: record.bounds.clone(),
                    reason: verdict.reason,
                    description: record.description.clone(),
                }
            })
            .collect();

        debug!(
            package = %package.name,
            version = %package.version,
            candidates = records.len(),
            vulnerable = findings.iter().filter(|f| f.vulnerable).count(),
            "package evaluated"
        );
        findings
    }
}
