//! Configuration file loading and parsing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use super::model::{AppConfig, OutputSelection, SelectionFile};
use crate::disc::DiscKey;
use crate::error::ConfigError;
use crate::validation::{self, report, Findings, Severity};

/// Loads the configuration file from disk and parses it.
pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: AppConfig =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(config)
}

/// Loads the configuration file, falling back to defaults when it does not exist.
pub fn load_or_default(path: &Path) -> Result<AppConfig, ConfigError> {
    if path.exists() {
        load_from_path(path)
    } else {
        Ok(AppConfig::default())
    }
}

/// Checks a loaded configuration, logging warnings and rejecting errors.
pub fn validate_loaded(config: &AppConfig, base_dir: &Path) -> Result<()> {
    reject_errors(&validation::check_config(config, base_dir))
}

/// Logs warnings and bails if any finding is an error.
pub fn reject_errors(findings: &Findings) -> Result<()> {
    for finding in findings.of(Severity::Warning) {
        warn!(
            scope = %finding.scope,
            field = %finding.field,
            hint = ?finding.hint,
            "{}",
            finding.message
        );
    }

    if findings.has_errors() {
        error!("Configuration rejected\n{}", report::render(findings));
        anyhow::bail!(ConfigError::ValidationFailed {
            error_count: findings.count(Severity::Error)
        });
    }

    Ok(())
}

/// Returns the directory config-relative paths are resolved against.
pub fn base_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Expands the configured selection globs into file paths.
pub fn selection_paths(config: &AppConfig, base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut paths = Vec::new();

    for pattern in &config.selections {
        let full = base_dir.join(pattern);
        let full = full.to_string_lossy();
        let entries = glob::glob(&full).map_err(|e| ConfigError::InvalidGlob {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        for entry in entries.filter_map(|e| e.ok()) {
            if !paths.contains(&entry) {
                paths.push(entry);
            }
        }
    }

    debug!(count = paths.len(), "Expanded selection globs");
    Ok(paths)
}

/// Reads and parses one selection file.
pub async fn load_selection_file(path: &Path) -> Result<SelectionFile, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Loads every configured title from the given selection files.
///
/// With a non-empty `filter`, a title is kept when the filter names its
/// selection file, its disc (by name or hash) or its source key.
pub async fn load_selections(paths: &[PathBuf], filter: &[String]) -> Result<Vec<OutputSelection>> {
    let mut outputs = Vec::new();

    for path in paths {
        let file = load_selection_file(path)
            .await
            .with_context(|| format!("Failed to load selections from {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let accept_file = filter.is_empty() || filter.contains(&file_name);

        for (disc_key, titles) in file {
            let disc = DiscKey::parse(&disc_key);
            let accept_disc = accept_file
                || filter.contains(&disc.name)
                || disc.hash.as_ref().is_some_and(|hash| filter.contains(hash));

            for (key, selection) in titles {
                if !accept_disc && !filter.contains(&key) {
                    continue;
                }
                outputs.push(OutputSelection {
                    file: path.clone(),
                    disc: disc.clone(),
                    key,
                    selection,
                });
            }
        }
    }

    info!(count = outputs.len(), "Loaded title selections");
    Ok(outputs)
}

/// Checks loaded selections, logging warnings and rejecting errors.
pub fn validate_selections(outputs: &[OutputSelection]) -> Result<()> {
    reject_errors(&validation::check_selections(outputs))
}
