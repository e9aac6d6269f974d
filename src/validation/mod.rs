//! Checks run on the config file and selection files before any disc is resolved.
//!
//! Findings are attached to a [`Scope`]: either a setting of the config file
//! or one configured title of a selection file. Reports group them that way.

pub mod paths;
pub mod report;
pub mod semantic;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::config::model::{AppConfig, OutputSelection};

/// How serious a finding is. Errors sort before warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Blocks resolution.
    Error,
    Warning,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// Where a finding was made.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Scope {
    /// The application config file.
    Settings,
    /// One configured title of a selection file.
    Title {
        file: String,
        disc: String,
        title: String,
    },
}

impl Scope {
    /// Scope of a configured title, named by its selection file's base name.
    pub fn of(output: &OutputSelection) -> Self {
        let file = output
            .file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| output.file.display().to_string());
        Self::Title {
            file,
            disc: output.disc.to_string(),
            title: output.key.clone(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Settings => write!(f, "config"),
            Self::Title { file, disc, title } => write!(f, "{} / {} / {}", file, disc, title),
        }
    }
}

/// One problem found in the configuration.
#[derive(Debug, Clone)]
pub struct Finding {
    pub severity: Severity,
    pub scope: Scope,
    /// Field within the scope, e.g. `audio[1].language`.
    pub field: String,
    pub message: String,
    /// How to fix it, when there is an obvious way.
    pub hint: Option<String>,
}

impl Finding {
    pub fn error(scope: Scope, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, scope, field.into(), message.into())
    }

    pub fn warning(scope: Scope, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, scope, field.into(), message.into())
    }

    fn new(severity: Severity, scope: Scope, field: String, message: String) -> Self {
        Self {
            severity,
            scope,
            field,
            message,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Everything found while checking a configuration.
#[derive(Debug, Default)]
pub struct Findings {
    items: Vec<Finding>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, finding: Finding) {
        self.items.push(finding);
    }

    pub fn append(&mut self, other: Findings) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when at least one finding blocks resolution.
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.of(severity).count()
    }

    pub fn of(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.items.iter().filter(move |f| f.severity == severity)
    }

    /// Findings grouped by scope, settings first, errors before warnings within a scope.
    pub fn by_scope(&self) -> BTreeMap<&Scope, Vec<&Finding>> {
        let mut grouped: BTreeMap<&Scope, Vec<&Finding>> = BTreeMap::new();
        for finding in &self.items {
            grouped.entry(&finding.scope).or_default().push(finding);
        }
        for findings in grouped.values_mut() {
            findings.sort_by_key(|f| f.severity);
        }
        grouped
    }
}

/// Checks the application settings and the selection globs.
pub fn check_config(config: &AppConfig, base_dir: &Path) -> Findings {
    let mut findings = semantic::check_settings(config);
    findings.append(paths::check(config, base_dir));
    findings
}

/// Checks loaded title selections.
pub fn check_selections(outputs: &[OutputSelection]) -> Findings {
    let mut findings = Findings::new();
    for output in outputs {
        findings.append(semantic::check_selection(output));
    }
    findings
}
