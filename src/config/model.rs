//! Configuration data structures.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::disc::{DiscKey, StreamKind};
use crate::streams::{Cropping, StreamSelector};

/// Application settings loaded from the YAML config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Glob patterns locating selection files, relative to the config file.
    #[serde(default = "default_selections")]
    pub selections: Vec<String>,

    /// What to do when a configured title fails to resolve.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            selections: default_selections(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable lines.
    Pretty,
}

/// How resolution errors affect the rest of the run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing title.
    #[default]
    Abort,
    /// Log the failure, drop that configured title and continue.
    SkipTitle,
}

/// A selection file: disc keys (`NAME` or `NAME:HASH`), then configured titles by source key.
pub type SelectionFile = BTreeMap<String, BTreeMap<String, TitleSelection>>;

/// Desired output streams for one configured title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleSelection {
    #[serde(default = "default_primary_stream")]
    pub video: Vec<StreamEntry>,

    #[serde(default = "default_primary_stream")]
    pub audio: Vec<StreamEntry>,

    #[serde(default)]
    pub subtitle: Vec<StreamEntry>,
}

impl TitleSelection {
    /// Returns the entries of one kind.
    pub fn entries(&self, kind: StreamKind) -> &[StreamEntry] {
        match kind {
            StreamKind::Video => &self.video,
            StreamKind::Audio => &self.audio,
            StreamKind::Subtitle => &self.subtitle,
        }
    }
}

/// One stream entry as authored in a selection file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEntry {
    /// Which disc stream to take.
    pub track: TrackRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Language code written to the track header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commentary: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cropping: Option<Cropping>,
}

/// Reference to a disc stream: a bare ordinal or a detailed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackRef {
    Ordinal(usize),
    Detailed(TrackSpec),
}

/// Detailed stream reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSpec {
    /// Ordinal among the actual streams of the kind.
    pub index: usize,

    /// Take the core (derived) variant of the stream.
    #[serde(default)]
    pub core: bool,

    /// Take the forced (derived) variant of the stream.
    #[serde(default)]
    pub forced: bool,

    /// Source key of another title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Key of another disc the title lives on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl StreamEntry {
    /// Builds the engine selector for this entry.
    pub fn to_selector(&self, kind: StreamKind, context_disc: &DiscKey, context_title: &str) -> StreamSelector {
        let (disc, title, ordinal, derived) = match &self.track {
            TrackRef::Ordinal(index) => (context_disc.clone(), context_title, *index, false),
            TrackRef::Detailed(spec) => (
                spec.source
                    .as_deref()
                    .map(DiscKey::parse)
                    .unwrap_or_else(|| context_disc.clone()),
                spec.title.as_deref().unwrap_or(context_title),
                spec.index,
                spec.core || spec.forced,
            ),
        };

        StreamSelector {
            disc,
            name: self.name.clone(),
            language: self.language.clone(),
            default: self.default,
            forced: self.forced,
            commentary: self.commentary,
            cropping: self.cropping,
            ..StreamSelector::new(title, kind, ordinal, derived)
        }
    }
}

/// A configured title together with where it was declared.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSelection {
    /// Selection file the title came from.
    pub file: PathBuf,
    /// Disc the configured title belongs to.
    pub disc: DiscKey,
    /// Source key of the configured title.
    pub key: String,
    pub selection: TitleSelection,
}

impl OutputSelection {
    /// Returns the selectors of one kind, in configuration order.
    pub fn selectors(&self, kind: StreamKind) -> Vec<StreamSelector> {
        self.selection
            .entries(kind)
            .iter()
            .map(|entry| entry.to_selector(kind, &self.disc, &self.key))
            .collect()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_selections() -> Vec<String> {
    vec!["selections/*.json".to_string()]
}

fn default_primary_stream() -> Vec<StreamEntry> {
    vec![StreamEntry {
        track: TrackRef::Ordinal(0),
        name: None,
        language: None,
        default: None,
        forced: None,
        commentary: None,
        cropping: None,
    }]
}
