//! Translation of disc stream indices into track ids of an extracted file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::resolve::{ResolvedStream, StreamResolution};
use crate::error::{ContainerError, ResolveError};

/// Parsed output from mkvmerge -J.
#[derive(Debug, Deserialize)]
struct Identification {
    #[serde(default)]
    tracks: Vec<ContainerTrack>,
}

/// One track of the extracted file as reported by the muxer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContainerTrack {
    /// Track id used on the muxer command line.
    pub id: u32,
    #[serde(rename = "type", default)]
    pub track_type: String,
    #[serde(default)]
    pub properties: TrackProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TrackProperties {
    /// One-based track number carried over from the disc stream.
    pub number: Option<u64>,
}

/// Parses the muxer's JSON identification output into its track list.
pub fn parse_identification(json: &str) -> Result<Vec<ContainerTrack>, ContainerError> {
    let identification: Identification = serde_json::from_str(json)?;
    Ok(identification.tracks)
}

/// Disc stream index to container track, built once per extracted title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerTrackMap {
    by_disc_index: BTreeMap<u32, (u32, String)>,
}

impl ContainerTrackMap {
    /// Builds the mapping from the declared track numbers (`number - 1` is the disc index).
    pub fn from_tracks(tracks: &[ContainerTrack]) -> Self {
        let mut by_disc_index = BTreeMap::new();
        for track in tracks {
            let disc_index = track
                .properties
                .number
                .and_then(|n| n.checked_sub(1))
                .and_then(|n| u32::try_from(n).ok());
            match disc_index {
                Some(disc_index) => {
                    by_disc_index.insert(disc_index, (track.id, track.track_type.clone()));
                }
                None => debug!(
                    track_id = track.id,
                    track_type = %track.track_type,
                    "Skipping track without a usable track number"
                ),
            }
        }
        Self { by_disc_index }
    }

    /// Returns the container track id of a disc stream.
    pub fn get(&self, disc_index: u32) -> Option<u32> {
        self.by_disc_index.get(&disc_index).map(|(id, _)| *id)
    }

    /// Returns the muxer's type name for the track of a disc stream.
    pub fn track_type(&self, disc_index: u32) -> Option<&str> {
        self.by_disc_index.get(&disc_index).map(|(_, kind)| kind.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_disc_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_disc_index.is_empty()
    }
}

/// A resolved stream together with its track id in the extracted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTrack {
    #[serde(flatten)]
    pub stream: ResolvedStream,
    pub track_id: u32,
}

/// Looks up every resolved disc index in the extracted file's track map.
///
/// Fails when the extraction dropped a stream the configuration selected.
pub fn resolve_container_ids(
    resolution: &StreamResolution,
    tracks: &ContainerTrackMap,
) -> Result<Vec<ResolvedTrack>, ResolveError> {
    resolution
        .streams
        .iter()
        .map(|stream| {
            let track_id = tracks.get(stream.disc_index).ok_or_else(|| ResolveError::TrackNotInContainer {
                title: resolution.title.clone(),
                kind: resolution.kind,
                ordinal: stream.selector.ordinal,
                derived: stream.selector.derived,
                disc_index: stream.disc_index,
            })?;
            if let Some(found) = tracks.track_type(stream.disc_index) {
                if !found.is_empty() && found != resolution.kind.container_type() {
                    warn!(
                        title = %resolution.title,
                        disc_index = stream.disc_index,
                        track_id,
                        expected = resolution.kind.container_type(),
                        found,
                        "Container track type differs from the disc stream kind"
                    );
                }
            }
            Ok(ResolvedTrack {
                stream: stream.clone(),
                track_id,
            })
        })
        .collect()
}
