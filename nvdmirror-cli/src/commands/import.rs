//! `nvdmirror import` command handler

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use nvdmirror_core::config::NvdMirrorConfig;
use nvdmirror_record_store::{ImportSummary, RecordStore, RecordStoreConfig};

use crate::cli::ImportArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `import` command.
pub async fn execute(
    args: ImportArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = NvdMirrorConfig::load(config_path).await?;
    let store_config = RecordStoreConfig::from_core(&config.store);

    info!(source = %args.source.display(), "importing full history");

    let source = args.source.clone();
    let summary = tokio::task::spawn_blocking(move || -> Result<ImportSummary, CliError> {
        let mut store = RecordStore::open(store_config)?;
        Ok(store.import_file(&source)?)
    })
    .await
    .map_err(|e| CliError::Command(format!("import task failed: {e}")))??;

    let report = ImportReport::new(args.source.display().to_string(), summary);
    writer.render(&report)?;

    Ok(())
}

/// Bootstrap import result.
#[derive(Serialize)]
pub struct ImportReport {
    pub source: String,
    pub appended_per_year: BTreeMap<i32, usize>,
    pub appended: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

impl ImportReport {
    fn new(source: String, summary: ImportSummary) -> Self {
        Self {
            source,
            appended: summary.total_appended(),
            appended_per_year: summary.appended_per_year,
            duplicates: summary.duplicates,
            skipped: summary.skipped,
        }
    }
}

impl Render for ImportReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Import: {}", self.source.bold())?;
        writeln!(w)?;
        writeln!(w, "{:<8} Rows", "Year")?;
        writeln!(w, "{}", "-".repeat(20))?;
        for (year, rows) in &self.appended_per_year {
            writeln!(w, "{year:<8} {rows}")?;
        }
        writeln!(w)?;
        writeln!(
            w,
            "Appended: {}  Duplicates: {}  Skipped: {}",
            self.appended.to_string().green().bold(),
            self.duplicates,
            self.skipped
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_report_render() {
        let summary = ImportSummary {
            appended_per_year: BTreeMap::from([(2021, 2), (2022, 3)]),
            duplicates: 1,
            skipped: 0,
        };
        let report = ImportReport::new("history.csv".to_owned(), summary);
        assert_eq!(report.appended, 5);

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render");
        let output = String::from_utf8(buffer).expect("utf8");
        assert!(output.contains("history.csv"));
        assert!(output.contains("2021"));
        assert!(output.contains("Duplicates: 1"));
    }
}
