//! `ironscope config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use ironscope_core::config::IronscopeConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "ironscope.toml";

const SECTIONS: [&str; 3] = ["general", "persistence", "plugins"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load the effective configuration.
///
/// An explicit path must exist. Without one, `./ironscope.toml` is read if present and
/// built-in defaults are used otherwise. Environment overrides apply in both cases.
pub async fn load(config_path: Option<&Path>) -> Result<IronscopeConfig, CliError> {
    let config = match config_path {
        Some(path) => IronscopeConfig::load(path).await?,
        None => IronscopeConfig::load_or_default(DEFAULT_CONFIG_PATH).await?,
    };
    Ok(config)
}

fn source_label(config_path: Option<&Path>) -> String {
    match config_path {
        Some(path) => path.display().to_string(),
        None => format!("{DEFAULT_CONFIG_PATH} (defaults if absent)"),
    }
}

async fn execute_validate(
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(source = %source_label(config_path), "validating configuration");

    let report = match load(config_path).await {
        Ok(_) => ConfigValidationReport {
            source: source_label(config_path),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: source_label(config_path),
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

async fn execute_show(
    config_path: Option<&Path>,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load(config_path).await?;
    let report = build_report(&config, source_label(config_path), section)?;
    writer.render(&report)
}

fn build_report(
    config: &IronscopeConfig,
    source: String,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let (config_toml, value) = match section.as_deref() {
        None => (to_toml(config), to_json(config)?),
        Some("general") => (to_toml(&config.general), to_json(&config.general)?),
        Some("persistence") => (to_toml(&config.persistence), to_json(&config.persistence)?),
        Some("plugins") => (to_toml(&config.plugins), to_json(&config.plugins)?),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: {})",
                SECTIONS.join(", ")
            )));
        }
    };

    Ok(ConfigReport {
        source,
        section,
        config: value,
        config_toml,
    })
}

fn to_toml<T: Serialize>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("(serialization error: {e})\n"))
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, CliError> {
    Ok(serde_json::to_value(value)?)
}

/// Effective configuration, whole or one section.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub config: serde_json::Value,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match &self.section {
            Some(section) => writeln!(
                w,
                "Configuration {} (source: {})",
                format!("[{section}]").bold(),
                self.source
            )?,
            None => writeln!(w, "Configuration (source: {})", self.source.bold())?,
        }
        writeln!(w)?;
        write!(w, "{}", self.config_toml)
    }
}

/// Result of `config validate`.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty when valid.
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
    use super::*;

    fn render(report: &impl Render) -> String {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        report.render_text(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf-8")
    }

    #[test]
    fn full_report_contains_every_section() {
        let report =
            build_report(&IronscopeConfig::default(), "test.toml".to_owned(), None).expect("report");
        assert!(report.section.is_none());
        for section in SECTIONS {
            assert!(report.config_toml.contains(&format!("[{section}]")), "{section}");
            assert!(report.config.get(section).is_some(), "{section}");
        }

        let text = render(&report);
        assert!(text.contains("Configuration (source: test.toml)"));
        assert!(text.contains("default_backend = \"fs\""));
    }

    #[test]
    fn section_report_is_filtered() {
        let report = build_report(
            &IronscopeConfig::default(),
            "test.toml".to_owned(),
            Some("plugins".to_owned()),
        )
        .expect("report");
        assert!(report.config_toml.contains("max_output_size"));
        assert!(!report.config_toml.contains("log_level"));
        assert_eq!(report.config["max_output_size"], 64 * 1024 * 1024);
        assert!(render(&report).contains("[plugins]"));

        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["section"], "plugins");
        assert!(json.get("config_toml").is_none());
    }

    #[test]
    fn unknown_section_is_command_error() {
        let err = build_report(
            &IronscopeConfig::default(),
            "test.toml".to_owned(),
            Some("storage".to_owned()),
        )
        .err()
        .expect("unknown section");
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("persistence"));
    }

    #[test]
    fn validation_report_lists_errors() {
        let report = ConfigValidationReport {
            source: "bad.toml".to_owned(),
            valid: false,
            errors: vec!["invalid config value for 'general.log_level'".to_owned()],
        };
        let text = render(&report);
        assert!(text.contains("INVALID"));
        assert!(text.contains("general.log_level"));

        let ok = ConfigValidationReport {
            source: "good.toml".to_owned(),
            valid: true,
            errors: Vec::new(),
        };
        assert!(render(&ok).contains("VALID"));
    }

    #[test]
    fn source_label_mentions_defaults_without_path() {
        assert_eq!(source_label(Some(Path::new("/etc/i.toml"))), "/etc/i.toml");
        assert!(source_label(None).contains("defaults"));
    }

    #[tokio::test]
    async fn explicit_missing_file_is_config_error() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let err = load(Some(&dir.path().join("missing.toml")))
            .await
            .expect_err("missing explicit config");
        assert_eq!(err.exit_code(), 2);
    }
}
