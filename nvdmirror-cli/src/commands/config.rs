//! `nvdmirror config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use nvdmirror_core::config::NvdMirrorConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

const REDACTED: &str = "***REDACTED***";

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load and validate the configuration file, reporting any errors.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = match NvdMirrorConfig::load(config_path).await {
        Ok(_) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Display the effective configuration with the API key redacted.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let mut config = NvdMirrorConfig::load(config_path).await?;
    redact_credentials(&mut config);

    let report = build_config_report(&config, config_path, section)?;
    writer.render(&report)?;

    Ok(())
}

fn build_config_report(
    config: &NvdMirrorConfig,
    config_path: &Path,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let value = match section.as_deref() {
        None => toml::Value::try_from(config),
        Some("general") => toml::Value::try_from(&config.general),
        Some("feed") => toml::Value::try_from(&config.feed),
        Some("store") => toml::Value::try_from(&config.store),
        Some("sync") => toml::Value::try_from(&config.sync),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: general, feed, store, sync)"
            )));
        }
    }
    .map_err(|e| CliError::Config(format!("failed to serialize configuration: {e}")))?;

    let config_toml = toml::to_string_pretty(&value)
        .unwrap_or_else(|e| format!("(serialization error: {e})"));

    Ok(ConfigReport {
        source: config_path.display().to_string(),
        section,
        config: value,
        config_toml,
    })
}

/// Replace the NVD API key with a placeholder.
fn redact_credentials(config: &mut NvdMirrorConfig) {
    if !config.feed.api_key.is_empty() {
        config.feed.api_key = REDACTED.to_owned();
    }
}

/// Configuration display report.
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Effective configuration values
    pub config: toml::Value,
    /// Serialized TOML (text rendering only)
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{section}]");
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    /// Configuration file path
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn render(report: &impl Render) -> String {
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("text rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_redact_api_key() {
        let mut config = NvdMirrorConfig::default();
        config.feed.api_key = "0123-secret".to_owned();
        redact_credentials(&mut config);
        assert_eq!(config.feed.api_key, REDACTED);

        let mut empty = NvdMirrorConfig::default();
        redact_credentials(&mut empty);
        assert!(empty.feed.api_key.is_empty(), "empty key stays empty");
    }

    #[test]
    fn test_section_report() {
        let config = NvdMirrorConfig::default();
        let report =
            build_config_report(&config, &PathBuf::from("nvdmirror.toml"), Some("feed".to_owned()))
                .expect("feed section exists");

        let output = render(&report);
        assert!(output.contains("[feed]"));
        assert!(output.contains("schema_version"));
        assert!(!output.contains("partition_dir"));
    }

    #[test]
    fn test_full_report_json_has_sections() {
        let config = NvdMirrorConfig::default();
        let report = build_config_report(&config, &PathBuf::from("nvdmirror.toml"), None)
            .expect("full config");

        let json = serde_json::to_value(&report).expect("JSON serialization should succeed");
        assert_eq!(json["source"].as_str(), Some("nvdmirror.toml"));
        assert!(json.get("section").is_none());
        assert!(json["config"]["store"]["partition_dir"].is_string());
        assert!(json.get("config_toml").is_none(), "config_toml is text-only");
    }

    #[test]
    fn test_unknown_section_is_error() {
        let config = NvdMirrorConfig::default();
        let err = build_config_report(&config, &PathBuf::from("x.toml"), Some("ebpf".to_owned()))
            .err()
            .expect("unknown section");
        assert!(err.to_string().contains("unknown section"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_validation_report_invalid() {
        let report = ConfigValidationReport {
            source: "bad.toml".to_owned(),
            valid: false,
            errors: vec!["failed to parse config".to_owned()],
        };
        let output = render(&report);
        assert!(output.contains("INVALID"));
        assert!(output.contains("failed to parse config"));
    }
}
