//! Error types for disc inventory parsing and stream resolution.

use std::path::PathBuf;
use thiserror::Error;

use crate::disc::StreamKind;

/// Top-level application errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading and parsing errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("Invalid selection glob '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("Config validation failed with {error_count} error(s)")]
    ValidationFailed { error_count: usize },
}

/// Inconsistencies in the disc-info report. These always abort the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Did not get an output file for title {title} in {disc}")]
    MissingOutputFile { disc: String, title: String },

    #[error("Did not get an output size for title {title} in {disc}")]
    MissingOutputSize { disc: String, title: String },

    #[error("Title {key} in {disc} was listed as a duplicate but has data")]
    DuplicateHasData { disc: String, key: String },

    #[error("Title {key} in {disc} is a duplicate of itself")]
    DuplicateCycle { disc: String, key: String },

    #[error("Title {key} in {disc} is a duplicate of nonexistent title {target}")]
    DuplicateOfMissing {
        disc: String,
        key: String,
        target: String,
    },

    #[error("Title {title} in {disc} marks stream {index} as derived but lists no such stream")]
    DerivedOutsideStreams { disc: String, title: String, index: u32 },

    #[error("Malformed disc-info line {line}: {message}")]
    MalformedLine { line: usize, message: String },
}

/// Selector-versus-inventory mismatches, before and after extraction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Disc {disc} referenced by title {title} was not loaded")]
    UnknownDisc { disc: String, title: String },

    #[error("Title {title} is not present on disc {disc}")]
    UnknownTitle { disc: String, title: String },

    #[error("Could not find {kind} track {ordinal} in title {title}, only {available} tracks found")]
    TrackOutOfRange {
        title: String,
        kind: StreamKind,
        ordinal: usize,
        available: usize,
    },

    #[error("Expected {kind} track {ordinal} in title {title} to have a derived stream at index {disc_index}")]
    MissingDerived {
        title: String,
        kind: StreamKind,
        ordinal: usize,
        disc_index: u32,
    },

    #[error("{kind} {} {ordinal} of title {title} (disc stream {disc_index}) not found in the extracted file", track_label(.derived))]
    TrackNotInContainer {
        title: String,
        kind: StreamKind,
        ordinal: usize,
        derived: bool,
        disc_index: u32,
    },
}

impl ResolveError {
    /// Returns the title the failing selector refers to.
    pub fn title(&self) -> &str {
        match self {
            Self::UnknownDisc { title, .. }
            | Self::UnknownTitle { title, .. }
            | Self::TrackOutOfRange { title, .. }
            | Self::MissingDerived { title, .. }
            | Self::TrackNotInContainer { title, .. } => title,
        }
    }
}

fn track_label(derived: &bool) -> &'static str {
    if *derived {
        "derived track"
    } else {
        "track"
    }
}

/// Container inspection output errors.
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Failed to parse container inspection output: {0}")]
    ParseFailed(#[from] serde_json::Error),
}
