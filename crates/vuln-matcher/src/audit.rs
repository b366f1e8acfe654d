//! 판정 감사 CSV
//!
//! 스캔마다 덮어쓰며, 권위 있는 상태로 다시 읽지 않습니다.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::MatcherError;
use crate::finding::VulnerabilityFinding;

/// 감사 CSV 헤더
pub const FINDINGS_HEADER: [&str; 10] = [
    "basename",
    "package",
    "version",
    "vulnerable",
    "cve_id",
    "versionStartIncluding",
    "versionEndIncluding",
    "versionEndExcluding",
    "reason",
    "description",
];

/// 판정 감사 파일
#[derive(Debug, Clone)]
pub struct FindingsAudit {
    path: PathBuf,
}

impl FindingsAudit {
    /// 감사 파일 경로로 생성합니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 감사 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, reason: impl ToString) -> MatcherError {
        MatcherError::Audit {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// 판정 목록을 기록합니다. 기록한 행 수를 반환합니다.
    pub fn write(&self, findings: &[VulnerabilityFinding]) -> Result<usize, MatcherError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }

        let mut writer = csv::Writer::from_path(&self.path).map_err(|e| self.error(e))?;
        writer
            .write_record(FINDINGS_HEADER)
            .map_err(|e| self.error(e))?;

        for finding in findings {
            let basename = finding.basename();
            let vulnerable = if finding.vulnerable { "true" } else { "false" };
            let reason = finding.reason.to_string();
            writer
                .write_record([
                    basename.as_str(),
                    finding.package.as_str(),
                    finding.version.as_str(),
                    vulnerable,
                    finding.cve_id.as_str(),
                    finding.bounds.start_including.as_deref().unwrap_or(""),
                    finding.bounds.end_including.as_deref().unwrap_or(""),
                    finding.bounds.end_excluding.as_deref().unwrap_or(""),
                    reason.as_str(),
                    finding.description.as_str(),
                ])
                .map_err(|e| self.error(e))?;
        }
        writer.flush().map_err(|e| self.error(e))?;

        info!(path = %self.path.display(), rows = findings.len(), "findings audit written");
        Ok(findings.len())
    }
}

#[cfg(test)]
mod tests {
    use nvdmirror_core::types::{Severity, VersionBounds};

    use super::*;
    use crate::version::VerdictReason;

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let audit = FindingsAudit::new(dir.path().join("reports").join("findings.csv"));
        let findings = vec![VulnerabilityFinding {
            source: PathBuf::from("/srv/app/requirements.txt"),
            package: "django".to_owned(),
            version: "4.0.rc1".to_owned(),
            vulnerable: true,
            cve_id: "CVE-2023-0001".to_owned(),
            severity: Severity::High,
            bounds: VersionBounds {
                start_including: Some("4.0".to_owned()),
                end_excluding: Some("4.1.7".to_owned()),
                end_including: None,
            },
            reason: VerdictReason::AssumedVulnerableIncomparable {
                component: "rc1".to_owned(),
                version: "4.0.rc1".to_owned(),
            },
            description: "SQL injection, via crafted input".to_owned(),
        }];

        assert_eq!(audit.write(&findings).unwrap(), 1);

        let mut reader = csv::Reader::from_path(audit.path()).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_owned).collect();
        assert_eq!(header, FINDINGS_HEADER);

        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "requirements.txt");
        assert_eq!(&row[3], "true");
        assert_eq!(&row[5], "4.0");
        assert_eq!(&row[6], "");
        assert_eq!(&row[7], "4.1.7");
        assert!(row[8].starts_with("assumed-vulnerable-incomparable"));
        assert!(row[8].contains("rc1"));
        assert_eq!(&row[9], "SQL injection, via crafted input");
    }

    #[test]
    fn empty_findings_still_write_header() {
        let dir = tempfile::tempdir().unwrap();
        let audit = FindingsAudit::new(dir.path().join("findings.csv"));
        assert_eq!(audit.write(&[]).unwrap(), 0);

        let content = std::fs::read_to_string(audit.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("basename,package,version,vulnerable,cve_id"));
    }
}
