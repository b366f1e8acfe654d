//! `nvdmirror scan` command handler

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use nvdmirror_core::config::NvdMirrorConfig;
use nvdmirror_core::types::Severity;
use nvdmirror_record_store::{RecordStore, RecordStoreConfig};
use nvdmirror_vuln_matcher::{
    FindingsAudit, ScanReport, VulnScanner, VulnerabilityFinding, load_inventory,
};

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, truncate};

/// Execute the `scan` command.
///
/// Returns `CliError::Vulnerable` (exit code 4) when any verdict is vulnerable.
pub async fn execute(
    args: ScanArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = NvdMirrorConfig::load(config_path).await?;
    let min_severity = parse_severity(&args.min_severity)?;
    let audit_path = args
        .findings
        .clone()
        .or_else(|| non_empty_path(&config.store.findings_path));

    let inventory = load_inventory(&args.inventory)?;
    let store = RecordStore::open(RecordStoreConfig::from_core(&config.store))?;

    info!(inventory = %args.inventory.display(), min_severity = %min_severity, "starting inventory scan");

    let task_audit = audit_path.clone();
    let report = tokio::task::spawn_blocking(move || {
        let report = VulnScanner::new(&store)
            .with_min_severity(min_severity)
            .scan(&inventory)?;
        if let Some(path) = task_audit {
            FindingsAudit::new(path).write(&report.findings)?;
        }
        Ok::<_, CliError>(report)
    })
    .await
    .map_err(|e| CliError::Command(format!("scan task failed: {e}")))??;

    let output = ScanOutput::new(
        args.inventory.display().to_string(),
        audit_path,
        report,
        args.all,
    );
    writer.render(&output)?;

    if output.vulnerable > 0 {
        return Err(CliError::Vulnerable {
            count: output.vulnerable,
        });
    }
    Ok(())
}

fn parse_severity(s: &str) -> Result<Severity, CliError> {
    Severity::from_str_loose(s).ok_or_else(|| {
        CliError::Command(format!("invalid severity: {s} (expected: medium, high)"))
    })
}

fn non_empty_path(path: &str) -> Option<PathBuf> {
    (!path.trim().is_empty()).then(|| PathBuf::from(path))
}

/// `scan` command output.
#[derive(Serialize)]
pub struct ScanOutput {
    pub inventory: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub findings_audit: Option<String>,
    pub packages_scanned: usize,
    pub verdicts: usize,
    pub vulnerable: usize,
    pub reasons: BTreeMap<&'static str, usize>,
    /// Vulnerable findings, or every finding with `--all`
    pub findings: Vec<VulnerabilityFinding>,
}

impl ScanOutput {
    fn new(inventory: String, audit: Option<PathBuf>, report: ScanReport, all: bool) -> Self {
        let vulnerable = report.vulnerable_count();
        let reasons = report.reason_counts();
        let verdicts = report.findings.len();
        let findings = if all {
            report.findings
        } else {
            report.findings.into_iter().filter(|f| f.vulnerable).collect()
        };

        Self {
            inventory,
            findings_audit: audit.map(|p| p.display().to_string()),
            packages_scanned: report.packages_scanned,
            verdicts,
            vulnerable,
            reasons,
            findings,
        }
    }
}

impl Render for ScanOutput {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Scan: {}", self.inventory.bold())?;
        writeln!(w, "Packages scanned: {}", self.packages_scanned)?;
        writeln!(w, "Verdicts: {}", self.verdicts)?;
        for (reason, count) in &self.reasons {
            writeln!(w, "  {reason:<32} {count}")?;
        }
        if let Some(path) = &self.findings_audit {
            writeln!(w, "Findings audit: {path}")?;
        }
        writeln!(w)?;

        let vulnerable = format!("{} vulnerable", self.vulnerable);
        if self.vulnerable > 0 {
            writeln!(w, "Result: {}", vulnerable.red().bold())?;
        } else {
            writeln!(w, "Result: {}", vulnerable.green().bold())?;
        }

        if self.findings.is_empty() {
            return Ok(());
        }

        writeln!(w)?;
        writeln!(
            w,
            "{:<18} {:<8} {:<20} {:<12} {:<24} Reason",
            "CVE", "Severity", "Package", "Version", "Affected"
        )?;
        writeln!(w, "{}", "-".repeat(110))?;
        for f in &self.findings {
            let severity = match f.severity {
                Severity::High => f.severity.as_str().red(),
                Severity::Medium => f.severity.as_str().yellow(),
            };
            let reason = if f.vulnerable {
                f.reason.to_string().red()
            } else {
                f.reason.to_string().normal()
            };
            writeln!(
                w,
                "{:<18} {:<8} {:<20} {:<12} {:<24} {}",
                f.cve_id,
                severity,
                truncate(&f.package, 20),
                truncate(&f.version, 12),
                truncate(&f.bounds.to_string(), 24),
                reason
            )?;
        }

        Ok(())
    }
}
