//! `nvdmirror sync` command handler

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use nvdmirror_core::config::NvdMirrorConfig;
use nvdmirror_feed_sync::{
    FeedSyncConfig, FileCursorStore, NvdFeedClient, Phase, SyncOrchestratorBuilder, SyncOutcome,
    SyncPlan, SyncReport, SyncStart,
};
use nvdmirror_record_store::{RecordStore, RecordStoreConfig};

use crate::cli::SyncArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `sync` command.
pub async fn execute(
    args: SyncArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = NvdMirrorConfig::load(config_path).await?;

    let mut sync_config = FeedSyncConfig::from_core(&config);
    if args.check_only {
        sync_config.check_only = true;
    }
    if args.yes {
        sync_config.require_confirmation = false;
    }

    let feed = Arc::new(NvdFeedClient::new(&sync_config)?);
    let store = RecordStore::open(RecordStoreConfig::from_core(&config.store))?;
    let cursor = Arc::new(FileCursorStore::new(&sync_config.cursor_path));

    let mut orchestrator = SyncOrchestratorBuilder::new()
        .config(sync_config)
        .feed(feed)
        .store(store)
        .cursor(cursor)
        .build()?;

    let start = orchestrator.synchronize(confirm).await?;

    let summary = match start {
        SyncStart::AlreadySynced => SyncSummary::new(SyncStatus::AlreadySynced, None),
        SyncStart::NothingToDo(plan) => SyncSummary::new(SyncStatus::NothingToDo, Some(&plan)),
        SyncStart::CheckOnly(plan) => SyncSummary::new(SyncStatus::CheckOnly, Some(&plan)),
        SyncStart::Declined(plan) => SyncSummary::new(SyncStatus::Declined, Some(&plan)),
        SyncStart::Started { run_id, plan } => {
            info!(run_id = %run_id, "waiting for background synchronization");

            let token = orchestrator.cancel_token();
            let interrupt = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, stopping after the current window");
                    token.cancel();
                }
            });

            let report = orchestrator.wait().await?;
            interrupt.abort();

            let report = report
                .ok_or_else(|| CliError::Command("background run vanished".to_owned()))?;
            let status = match report.outcome {
                SyncOutcome::Completed => SyncStatus::Completed,
                SyncOutcome::Failed { .. } => SyncStatus::Failed,
                SyncOutcome::Cancelled => SyncStatus::Cancelled,
            };
            let mut summary = SyncSummary::new(status, Some(&plan));
            summary.report = Some(report);
            summary
        }
    };

    writer.render(&summary)?;

    match summary.report.map(|r| r.outcome) {
        Some(SyncOutcome::Failed { reason }) => Err(CliError::SyncFailed(reason)),
        Some(SyncOutcome::Cancelled) => {
            Err(CliError::Command("synchronization cancelled".to_owned()))
        }
        _ => Ok(()),
    }
}

/// Ask on the terminal before starting a background run.
fn confirm(plan: &SyncPlan) -> bool {
    let mut stderr = std::io::stderr();
    let _ = write!(
        stderr,
        "Synchronize {} month(s) and {} day(s) published in [{}, {})? [y/N] ",
        plan.month_count(),
        plan.day_count(),
        plan.from(),
        plan.till()
    );
    let _ = stderr.flush();

    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_affirmative(&answer)
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Final state reported by `sync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    AlreadySynced,
    NothingToDo,
    CheckOnly,
    Declined,
    Completed,
    Failed,
    Cancelled,
}

impl SyncStatus {
    fn label(&self) -> &'static str {
        match self {
            Self::AlreadySynced => "already synchronized today",
            Self::NothingToDo => "nothing to synchronize",
            Self::CheckOnly => "check only",
            Self::Declined => "declined",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One planned window.
#[derive(Debug, Clone, Serialize)]
pub struct PlanWindow {
    pub phase: Phase,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Serializable view of a [`SyncPlan`].
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub from: NaiveDate,
    pub till: NaiveDate,
    pub months: usize,
    pub days: u64,
    pub units: u64,
    pub windows: Vec<PlanWindow>,
}

impl PlanSummary {
    pub fn new(plan: &SyncPlan) -> Self {
        Self {
            from: plan.from(),
            till: plan.till(),
            months: plan.month_count(),
            days: plan.day_count(),
            units: plan.total_units(),
            windows: plan
                .windows()
                .iter()
                .map(|(phase, window)| PlanWindow {
                    phase: *phase,
                    start: window.start,
                    end: window.end,
                })
                .collect(),
        }
    }

    pub fn render_text(&self, w: &mut dyn Write, verbose: bool) -> std::io::Result<()> {
        writeln!(w, "Plan: [{}, {})", self.from, self.till)?;
        writeln!(
            w,
            "  {} month(s), {} day(s), {} window(s)",
            self.months,
            self.days,
            self.windows.len()
        )?;
        if verbose {
            for window in &self.windows {
                writeln!(
                    w,
                    "  {:<14} [{}, {})",
                    window.phase.as_str(),
                    window.start,
                    window.end
                )?;
            }
        }
        Ok(())
    }
}

/// `sync` command output.
#[derive(Debug, Serialize)]
pub struct SyncSummary {
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SyncReport>,
}

impl SyncSummary {
    fn new(status: SyncStatus, plan: Option<&SyncPlan>) -> Self {
        Self {
            status,
            plan: plan.map(PlanSummary::new),
            report: None,
        }
    }
}

impl Render for SyncSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let label = self.status.label();
        let status = match self.status {
            SyncStatus::Completed | SyncStatus::AlreadySynced => label.green().bold(),
            SyncStatus::Failed => label.red().bold(),
            SyncStatus::Cancelled | SyncStatus::Declined => label.yellow().bold(),
            SyncStatus::NothingToDo | SyncStatus::CheckOnly => label.normal(),
        };
        writeln!(w, "Sync: {status}")?;

        if let Some(plan) = &self.plan {
            plan.render_text(w, self.status == SyncStatus::CheckOnly)?;
        }

        if let Some(report) = &self.report {
            writeln!(w)?;
            writeln!(w, "Run:              {}", report.run_id)?;
            writeln!(w, "Windows:          {}", report.windows_completed)?;
            writeln!(
                w,
                "Synced:           {} month(s), {} day(s)",
                report.months_synced, report.days_synced
            )?;
            writeln!(w, "Vulnerabilities:  {}", report.raw_vulnerabilities)?;
            writeln!(w, "Rows added:       {}", report.rows_added)?;
            if let Some(cursor) = report.cursor {
                writeln!(w, "Cursor:           {cursor}")?;
            }
            writeln!(w, "Duration:         {} ms", report.duration_ms)?;
            if let SyncOutcome::Failed { reason } = &report.outcome {
                writeln!(w, "Reason:           {}", reason.red())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nvdmirror_feed_sync::plan;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_affirmative_answers() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative("\n"));
        assert!(!is_affirmative("no"));
    }

    #[test]
    fn test_plan_summary_matches_plan() {
        let plan = plan(date(2023, 2, 16), date(2023, 5, 10));
        let summary = PlanSummary::new(&plan);
        assert_eq!(summary.months, 2);
        assert_eq!(summary.days, 13 + 8);
        assert_eq!(summary.windows.len(), 4);
        assert_eq!(summary.windows[0].phase, Phase::LeadingDays);
        assert_eq!(summary.till, date(2023, 5, 9));
    }

    #[test]
    fn test_check_only_render_lists_windows() {
        let plan = plan(date(2023, 2, 16), date(2023, 5, 10));
        let summary = SyncSummary::new(SyncStatus::CheckOnly, Some(&plan));

        let mut buffer = Vec::new();
        summary.render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("utf8");
        assert!(output.contains("check only"));
        assert!(output.contains("[2023-02-16, 2023-03-01)"));
        assert!(output.contains("[2023-05-01, 2023-05-09)"));
    }

    #[test]
    fn test_summary_json_status() {
        let summary = SyncSummary::new(SyncStatus::AlreadySynced, None);
        let json = serde_json::to_value(&summary).expect("json");
        assert_eq!(json["status"], "already-synced");
        assert!(json.get("plan").is_none());
    }
}
