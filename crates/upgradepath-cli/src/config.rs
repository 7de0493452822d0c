use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::render::OutputFormat;

pub(crate) const DEFAULT_FROM_VERSIONS: [&str; 6] = ["4.12", "4.13", "4.14", "4.15", "4.16", "4.17"];
pub(crate) const DEFAULT_TO_VERSION: &str = "4.18";
pub(crate) const DEFAULT_CATALOGS_DIR: &str = "catalogs";
pub(crate) const DEFAULT_CONFIG_FILE: &str = "upgradepath.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigFile {
    #[serde(default)]
    pub(crate) from: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) to: Option<String>,
    #[serde(default)]
    pub(crate) catalogs_dir: Option<PathBuf>,
    #[serde(default)]
    pub(crate) current_catalogs_dir: Option<PathBuf>,
    #[serde(default)]
    pub(crate) output: Option<OutputFormat>,
}

/// Values given on the command line; they take priority over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CliOverrides {
    pub(crate) from: Vec<String>,
    pub(crate) to: Option<String>,
    pub(crate) catalogs_dir: Option<PathBuf>,
    pub(crate) current_catalogs_dir: Option<PathBuf>,
    pub(crate) output: Option<OutputFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunModeRequest {
    Reach,
    Incident,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RunMode {
    Reach,
    Incident { current_catalogs_dir: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunConfig {
    pub(crate) from_versions: Vec<String>,
    pub(crate) to_version: String,
    pub(crate) catalogs_dir: PathBuf,
    pub(crate) mode: RunMode,
    pub(crate) output: OutputFormat,
}

pub(crate) fn parse_config_file(content: &str) -> Result<ConfigFile> {
    toml::from_str(content).context("failed parsing upgradepath configuration")
}

/// Reads `explicit`, or `upgradepath.toml` in the working directory when no
/// path is given. Only the implicit file may be absent.
pub(crate) fn load_config_file(explicit: Option<&Path>) -> Result<ConfigFile> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
            return Ok(ConfigFile::default());
        }
        Err(err) => {
            return Err(err).with_context(|| {
                format!("failed reading configuration file: {}", path.display())
            });
        }
    };

    parse_config_file(&content)
        .with_context(|| format!("invalid configuration file: {}", path.display()))
}

pub(crate) fn resolve_run_config(
    file: ConfigFile,
    overrides: CliOverrides,
    request: RunModeRequest,
) -> Result<RunConfig> {
    let from_versions = if !overrides.from.is_empty() {
        overrides.from
    } else if let Some(from) = file.from {
        from
    } else {
        DEFAULT_FROM_VERSIONS.iter().map(ToString::to_string).collect()
    };
    let to_version = overrides
        .to
        .or(file.to)
        .unwrap_or_else(|| DEFAULT_TO_VERSION.to_string());
    let catalogs_dir = overrides
        .catalogs_dir
        .or(file.catalogs_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOGS_DIR));
    let output = overrides.output.or(file.output).unwrap_or_default();

    let mode = match request {
        RunModeRequest::Reach => RunMode::Reach,
        RunModeRequest::Incident => {
            let current_catalogs_dir = overrides
                .current_catalogs_dir
                .or(file.current_catalogs_dir)
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "incident mode requires a current catalogs directory (--current-catalogs-dir or current_catalogs_dir)"
                    )
                })?;
            if current_catalogs_dir == catalogs_dir {
                anyhow::bail!(
                    "current catalogs directory must differ from the incident catalogs directory: {}",
                    catalogs_dir.display()
                );
            }
            RunMode::Incident {
                current_catalogs_dir,
            }
        }
    };

    let config = RunConfig {
        from_versions,
        to_version,
        catalogs_dir,
        mode,
        output,
    };
    validate_run_config(&config)?;
    Ok(config)
}

fn validate_run_config(config: &RunConfig) -> Result<()> {
    if config.from_versions.is_empty() {
        anyhow::bail!("at least one version to evaluate is required");
    }
    validate_version_label(&config.to_version)?;
    for label in &config.from_versions {
        validate_version_label(label)?;
        if *label == config.to_version {
            anyhow::bail!("version '{label}' cannot be compared against itself");
        }
    }
    Ok(())
}

fn validate_version_label(label: &str) -> Result<()> {
    if label.trim().is_empty() {
        anyhow::bail!("invalid version label: must not be empty");
    }
    if label == "." || label == ".." || label.contains(['/', '\\']) {
        anyhow::bail!("invalid version label '{label}': must name a single catalog directory");
    }
    Ok(())
}
