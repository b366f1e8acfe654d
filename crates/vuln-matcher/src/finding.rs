//! 판정 결과 타입

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use nvdmirror_core::types::{Severity, VersionBounds};

use crate::version::VerdictReason;

/// 설치 패키지 하나와 CVE 행 하나의 판정 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VulnerabilityFinding {
    /// 패키지를 선언한 소스 파일 경로
    pub source: PathBuf,
    /// 패키지 이름
    pub package: String,
    /// 설치된 버전
    pub version: String,
    /// 취약 여부
    pub vulnerable: bool,
    /// CVE ID
    pub cve_id: String,
    /// 심각도
    pub severity: Severity,
    /// CVE 버전 범위
    pub bounds: VersionBounds,
    /// 판정 사유
    pub reason: VerdictReason,
    /// CVE 설명
    pub description: String,
}

impl VulnerabilityFinding {
    /// 소스 경로의 파일 이름 (감사 파일의 `basename` 컬럼)
    pub fn basename(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// 인벤토리 전체 스캔 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// 검사한 패키지 수
    pub packages_scanned: usize,
    /// 판정 목록 (인벤토리 순서, 패키지 내 저장소 순서)
    pub findings: Vec<VulnerabilityFinding>,
}

impl ScanReport {
    /// 취약 판정 목록
    pub fn vulnerable(&self) -> impl Iterator<Item = &VulnerabilityFinding> {
        self.findings.iter().filter(|f| f.vulnerable)
    }

    /// 취약 판정 수
    pub fn vulnerable_count(&self) -> usize {
        self.vulnerable().count()
    }

    /// 사유 태그별 판정 수
    pub fn reason_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.reason.tag()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(source: &str, vulnerable: bool, reason: VerdictReason) -> VulnerabilityFinding {
        VulnerabilityFinding {
            source: PathBuf::from(source),
            package: "openssl".to_owned(),
            version: "3.0.1".to_owned(),
            vulnerable,
            cve_id: "CVE-2023-0286".to_owned(),
            severity: Severity::High,
            bounds: VersionBounds::default(),
            reason,
            description: String::new(),
        }
    }

    #[test]
    fn basename_strips_directories() {
        let f = finding("/srv/app/requirements.txt", true, VerdictReason::DefiniteVulnerable);
        assert_eq!(f.basename(), "requirements.txt");
    }

    #[test]
    fn report_counts() {
        let report = ScanReport {
            packages_scanned: 2,
            findings: vec![
                finding("a", true, VerdictReason::DefiniteVulnerable),
                finding("a", false, VerdictReason::DefiniteSane),
                finding("b", true, VerdictReason::DefiniteVulnerable),
                finding("b", false, VerdictReason::UnknownInsufficientPrecision),
            ],
        };
        assert_eq!(report.vulnerable_count(), 2);
        let counts = report.reason_counts();
        assert_eq!(counts["definite-vulnerable"], 2);
        assert_eq!(counts["definite-sane"], 1);
        assert_eq!(counts["unknown-insufficient-precision"], 1);
    }
}
