//! `nvdmirror search` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use nvdmirror_core::config::NvdMirrorConfig;
use nvdmirror_core::types::{CveRecord, Severity};
use nvdmirror_record_store::{RecordStore, RecordStoreConfig};
use nvdmirror_vuln_matcher::criteria_needle;

use crate::cli::SearchArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, truncate};

/// Execute the `search` command.
pub async fn execute(
    args: SearchArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = NvdMirrorConfig::load(config_path).await?;
    let store = RecordStore::open(RecordStoreConfig::from_core(&config.store))?;

    let criteria = if args.package {
        criteria_needle(&args.criteria)
    } else {
        args.criteria.clone()
    };
    if criteria.is_empty() {
        return Err(CliError::Command("search criteria must not be empty".to_owned()));
    }

    let query = criteria.clone();
    let (matches, audit_path) = tokio::task::spawn_blocking(move || {
        let matches = store.search(&query)?;
        let audit_path = store.audit_path(&query);
        Ok::<_, CliError>((matches, audit_path))
    })
    .await
    .map_err(|e| CliError::Command(format!("search task failed: {e}")))??;

    let report = SearchReport {
        criteria,
        audit_path: audit_path.map(|p| p.display().to_string()),
        matches,
    };
    writer.render(&report)?;

    Ok(())
}

/// `search` command output.
#[derive(Serialize)]
pub struct SearchReport {
    pub criteria: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_path: Option<String>,
    pub matches: Vec<CveRecord>,
}

impl Render for SearchReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Search: {}", self.criteria.bold())?;
        writeln!(w, "Matches: {}", self.matches.len())?;
        if let Some(path) = &self.audit_path {
            writeln!(w, "Audit: {path}")?;
        }
        writeln!(w)?;

        if self.matches.is_empty() {
            writeln!(w, "{}", "No matching rows.".dimmed())?;
            return Ok(());
        }

        writeln!(
            w,
            "{:<18} {:<8} {:<11} {:<32} Criteria",
            "CVE", "Severity", "Published", "Affected"
        )?;
        writeln!(w, "{}", "-".repeat(110))?;
        for record in &self.matches {
            let severity = match record.severity {
                Severity::High => record.severity.as_str().red(),
                Severity::Medium => record.severity.as_str().yellow(),
            };
            writeln!(
                w,
                "{:<18} {:<8} {:<11} {:<32} {}",
                record.cve_id,
                severity,
                record.published.get(..10).unwrap_or(&record.published),
                truncate(&record.bounds.to_string(), 32),
                truncate(&record.criteria, 40)
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nvdmirror_core::types::VersionBounds;

    use super::*;

    #[test]
    fn test_search_report_render() {
        colored::control::set_override(false);
        let report = SearchReport {
            criteria: ":openssl:".to_owned(),
            audit_path: Some("/var/lib/nvdmirror/audit/search_openssl.csv".to_owned()),
            matches: vec![CveRecord {
                cve_id: "CVE-2023-2650".to_owned(),
                published: "2023-05-30T14:15:09.683".to_owned(),
                last_modified: "2024-02-04T09:15:08.580".to_owned(),
                severity: Severity::Medium,
                criteria: "cpe:2.3:a:openssl:openssl:*:*:*:*:*:*:*:*".to_owned(),
                bounds: VersionBounds {
                    start_including: Some("3.0.0".to_owned()),
                    end_excluding: Some("3.0.9".to_owned()),
                    end_including: None,
                },
                description: String::new(),
            }],
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("utf8");
        assert!(output.contains("Matches: 1"));
        assert!(output.contains("CVE-2023-2650"));
        assert!(output.contains("2023-05-30 "));
        assert!(output.contains("search_openssl.csv"));
    }

    #[test]
    fn test_empty_search_render() {
        let report = SearchReport {
            criteria: ":nothing:".to_owned(),
            audit_path: None,
            matches: Vec::new(),
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        assert!(String::from_utf8(buffer).expect("utf8").contains("No matching rows."));
    }
}
