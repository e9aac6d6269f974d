//! Stream selection types and the resolution engine.
//!
//! Resolution happens in two steps. Before extraction, each selector's
//! ordinal is mapped to a disc stream index using only the title inventory
//! ([`resolve_streams`]). After the title has been extracted, the disc
//! indices are translated into the track ids of the extracted file
//! ([`resolve_container_ids`]). Both steps are pure and produce new records;
//! the selectors themselves are never modified.

pub mod container;
pub mod resolve;

use serde::{Deserialize, Serialize};

use crate::disc::{DiscKey, StreamKind};

pub use container::{parse_identification, resolve_container_ids, ContainerTrack, ContainerTrackMap, ResolvedTrack};
pub use resolve::{infer_default_flags, resolve_streams, ResolvedStream, StreamResolution, UnusedDerived};

/// Crop box applied by the muxer, in pixels from each edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cropping {
    #[serde(default)]
    pub left: u32,
    #[serde(default)]
    pub top: u32,
    #[serde(default)]
    pub right: u32,
    #[serde(default)]
    pub bottom: u32,
}

impl Cropping {
    /// Returns true if no edge is cropped.
    pub fn is_empty(&self) -> bool {
        self.left == 0 && self.top == 0 && self.right == 0 && self.bottom == 0
    }
}

/// One desired output stream, addressed relative to the disc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamSelector {
    /// Disc the stream comes from.
    pub disc: DiscKey,
    /// Source key of the title the stream comes from.
    pub title: String,
    pub kind: StreamKind,
    /// Position among the actual (non-derived) streams of `kind`.
    pub ordinal: usize,
    /// Selects the derived sibling of the actual stream instead of the stream itself.
    pub derived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commentary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cropping: Option<Cropping>,
}

impl StreamSelector {
    /// Creates a selector with no presentation metadata.
    pub fn new(title: impl Into<String>, kind: StreamKind, ordinal: usize, derived: bool) -> Self {
        Self {
            disc: DiscKey::default(),
            title: title.into(),
            kind,
            ordinal,
            derived,
            name: None,
            language: None,
            default: None,
            forced: None,
            commentary: None,
            cropping: None,
        }
    }

    /// Returns true if both selectors address the same disc stream.
    pub fn same_source(&self, other: &StreamSelector) -> bool {
        self.disc == other.disc
            && self.title == other.title
            && self.kind == other.kind
            && self.ordinal == other.ordinal
            && self.derived == other.derived
    }
}
