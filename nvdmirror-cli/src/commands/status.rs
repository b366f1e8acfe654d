//! `nvdmirror status` command handler

use std::io::Write;
use std::path::Path;

use chrono::{Days, Local, NaiveDate};
use serde::Serialize;
use tracing::debug;

use nvdmirror_core::config::NvdMirrorConfig;
use nvdmirror_feed_sync::{CursorStore, FeedSyncConfig, FileCursorStore, plan};
use nvdmirror_record_store::{RecordStore, RecordStoreConfig, StoreError};

use crate::cli::StatusArgs;
use crate::commands::sync::PlanSummary;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `status` command.
pub async fn execute(
    args: StatusArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = NvdMirrorConfig::load(config_path).await?;
    let sync_config = FeedSyncConfig::from_core(&config);
    let store = RecordStore::open(RecordStoreConfig::from_core(&config.store))?;
    let cursor_store = FileCursorStore::new(&sync_config.cursor_path);
    let today = Local::now().date_naive();

    let report = tokio::task::spawn_blocking(move || {
        let last_synced = cursor_store.load()?;
        build_status_report(&store, last_synced, today, args.verbose)
    })
    .await
    .map_err(|e| CliError::Command(format!("status task failed: {e}")))??;

    writer.render(&report)?;

    Ok(())
}

fn build_status_report(
    store: &RecordStore,
    last_synced: Option<NaiveDate>,
    today: NaiveDate,
    verbose: bool,
) -> Result<StatusReport, CliError> {
    let mut partitions = Vec::new();
    for year in store.years()? {
        let rows = if verbose {
            Some(store.row_count(year)?)
        } else {
            None
        };
        partitions.push(PartitionStatus { year, rows });
    }

    let (resume_after, bootstrap_required) = match store.resume_cursor() {
        Ok(date) => (Some(date), false),
        Err(StoreError::Setup { .. }) => (None, true),
        Err(e) => return Err(e.into()),
    };

    let synced_today = last_synced == Some(today);
    let pending = match resume_after {
        Some(date) if !synced_today => {
            let from = date.checked_add_days(Days::new(1)).unwrap_or(date);
            let pending = plan(from, today);
            (!pending.is_empty()).then(|| PlanSummary::new(&pending))
        }
        _ => None,
    };

    debug!(
        partitions = partitions.len(),
        bootstrap_required,
        synced_today,
        "status computed"
    );

    Ok(StatusReport {
        partition_dir: store.config().partition_dir.display().to_string(),
        partitions,
        bootstrap_required,
        last_synced,
        resume_after,
        synced_today,
        pending,
    })
}

/// One year partition.
#[derive(Serialize)]
pub struct PartitionStatus {
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
}

/// `status` command output.
#[derive(Serialize)]
pub struct StatusReport {
    pub partition_dir: String,
    pub partitions: Vec<PartitionStatus>,
    pub bootstrap_required: bool,
    /// Date stored in the cursor state file
    pub last_synced: Option<NaiveDate>,
    /// Latest published date in the newest partition
    pub resume_after: Option<NaiveDate>,
    pub synced_today: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PlanSummary>,
}

impl Render for StatusReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Partitions: {}", self.partition_dir.bold())?;
        if self.bootstrap_required {
            writeln!(
                w,
                "  {}",
                "no year partitions, run `nvdmirror import <history.csv>` first"
                    .red()
                    .bold()
            )?;
            return Ok(());
        }

        for partition in &self.partitions {
            match partition.rows {
                Some(rows) => writeln!(w, "  {}.csv  {rows} rows", partition.year)?,
                None => writeln!(w, "  {}.csv", partition.year)?,
            }
        }
        writeln!(w)?;

        let last = self
            .last_synced
            .map(|d| d.to_string())
            .unwrap_or_else(|| "never".to_owned());
        writeln!(w, "Last sync:    {last}")?;
        if let Some(date) = self.resume_after {
            writeln!(w, "Resume after: {date}")?;
        }

        if self.synced_today {
            writeln!(w, "{}", "Up to date.".green())?;
        } else if let Some(pending) = &self.pending {
            writeln!(w)?;
            pending.render_text(w, false)?;
        } else {
            writeln!(w, "{}", "Nothing pending.".green())?;
        }

        Ok(())
    }
}
