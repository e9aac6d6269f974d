//! Checks that the selection globs point at files.

use std::path::Path;

use crate::config::model::AppConfig;

use super::{Finding, Findings, Scope};

/// Checks that every selection glob is well-formed and matches at least one file.
pub fn check(config: &AppConfig, base_dir: &Path) -> Findings {
    let mut findings = Findings::new();

    if config.selections.is_empty() {
        findings.push(
            Finding::warning(Scope::Settings, "selections", "No selection files are configured")
                .with_hint("add a glob such as 'selections/*.json'"),
        );
    }

    for (i, pattern) in config.selections.iter().enumerate() {
        let field = format!("selections[{}]", i);
        let full = base_dir.join(pattern);

        match glob::glob(&full.to_string_lossy()) {
            Err(e) => {
                findings.push(Finding::error(
                    Scope::Settings,
                    field,
                    format!("Invalid glob pattern '{}': {}", pattern, e),
                ));
            }
            Ok(entries) => {
                let matched = entries.filter_map(|e| e.ok()).filter(|p| p.is_file()).count();
                if matched == 0 {
                    findings.push(
                        Finding::warning(Scope::Settings, field, format!("Pattern '{}' matches no files", pattern))
                            .with_hint(format!("patterns are resolved relative to '{}'", base_dir.display())),
                    );
                }
            }
        }
    }

    findings
}
