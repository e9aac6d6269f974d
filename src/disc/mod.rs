//! Disc stream inventory and title identity resolution.

pub mod identity;
pub mod info;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

pub use identity::resolve_titles;
pub use info::{parse_disc_info, DiscReport, TitleRecord};

/// Stream type as reported by the disc inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
}

impl StreamKind {
    /// All kinds in muxing order.
    pub const ALL: [StreamKind; 3] = [Self::Video, Self::Audio, Self::Subtitle];

    /// Whether an unused derived alternate of a selected stream is worth reporting.
    pub fn reports_unused_derived(self) -> bool {
        !matches!(self, Self::Audio)
    }

    /// Track type name the muxer reports for streams of this kind.
    pub fn container_type(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Subtitle => "subtitles",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Subtitle => write!(f, "subtitle"),
        }
    }
}

/// One selectable program on a disc with its stream inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Title {
    /// Identifier assigned by the ripping tool.
    pub title_id: String,
    /// File name the ripping tool writes when extracting this title.
    pub output_file: String,
    /// Expected size of the extracted file in bytes.
    pub output_bytes: u64,
    pub video: BTreeSet<u32>,
    pub audio: BTreeSet<u32>,
    pub subtitle: BTreeSet<u32>,
    /// Streams that are alternates of the preceding actual stream.
    pub derived: BTreeSet<u32>,
}

impl Title {
    /// Returns the disc stream indices of one kind.
    pub fn streams(&self, kind: StreamKind) -> &BTreeSet<u32> {
        match kind {
            StreamKind::Video => &self.video,
            StreamKind::Audio => &self.audio,
            StreamKind::Subtitle => &self.subtitle,
        }
    }

    /// Returns the independently selectable streams of one kind, ascending.
    pub fn actual_streams(&self, kind: StreamKind) -> Vec<u32> {
        self.streams(kind)
            .iter()
            .copied()
            .filter(|index| !self.derived.contains(index))
            .collect()
    }

    /// Returns the first derived index that belongs to none of the stream sets.
    pub fn stray_derived(&self) -> Option<u32> {
        self.derived.iter().copied().find(|index| {
            !(self.video.contains(index) || self.audio.contains(index) || self.subtitle.contains(index))
        })
    }
}

/// How selection files name a disc: `NAME` or `NAME:HASH`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiscKey {
    pub name: String,
    /// Hash of the disc's unit key, when known.
    pub hash: Option<String>,
}

impl DiscKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hash: None,
        }
    }

    pub fn parse(key: &str) -> Self {
        let mut parts = key.splitn(2, ':').map(str::trim);
        let name = parts.next().unwrap_or_default().to_string();
        let hash = parts.next().filter(|h| !h.is_empty()).map(String::from);
        Self { name, hash }
    }
}

impl fmt::Display for DiscKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hash {
            Some(hash) => write!(f, "{}:{}", self.name, hash),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Serialize for DiscKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A scanned disc with its titles keyed by source key.
///
/// Several keys may share one title when the ripping tool reported duplicates.
#[derive(Debug, Clone)]
pub struct Disc {
    pub name: String,
    pub hash: Option<String>,
    /// Where the disc-info report was read from.
    pub path: PathBuf,
    pub titles: HashMap<String, Arc<Title>>,
}

impl Disc {
    /// Whether a selection file's disc key refers to this disc.
    ///
    /// Hashes decide when both sides carry one; otherwise names must match.
    pub fn matches(&self, key: &DiscKey) -> bool {
        match (&key.hash, &self.hash) {
            (Some(wanted), Some(known)) => wanted.eq_ignore_ascii_case(known),
            _ => key.name == self.name,
        }
    }

    /// Looks up a title by its source key.
    pub fn title(&self, key: &str) -> Option<&Arc<Title>> {
        self.titles.get(key)
    }

    /// Returns the source keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.titles.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}
