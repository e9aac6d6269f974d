//! Drives stream resolution for configured titles.
//!
//! Each configured title becomes an [`OutputPlan`] holding one [`TitlePlan`]
//! per disc title its selectors refer to. Track ids of the extracted files
//! are attached once the container inspection output for a title is known.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::model::{FailurePolicy, OutputSelection};
use crate::disc::{Disc, DiscKey, StreamKind};
use crate::error::ResolveError;
use crate::streams::{
    infer_default_flags, resolve_container_ids, resolve_streams, ContainerTrackMap, ResolvedStream, ResolvedTrack,
    StreamResolution, StreamSelector,
};

/// A title on a loaded disc, as used to look up its extracted file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceTitle {
    /// Name of the loaded disc.
    pub disc: String,
    /// Source key of the title.
    pub title: String,
}

impl SourceTitle {
    pub fn new(disc: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            disc: disc.into(),
            title: title.into(),
        }
    }
}

/// Resolution results for one disc title used by a configured output.
#[derive(Debug, Clone, Serialize)]
pub struct TitlePlan {
    /// Name of the disc the title was found on.
    pub disc: String,
    /// Source key the selectors used.
    pub source: String,
    pub title_id: String,
    pub output_file: String,
    /// One resolution per stream kind, in muxing order.
    pub streams: Vec<StreamResolution>,
    /// Track ids in the extracted file, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks: Option<Vec<ResolvedTrack>>,
}

impl TitlePlan {
    /// Iterates over the resolved streams in muxing order.
    pub fn resolved_streams(&self) -> impl Iterator<Item = &ResolvedStream> {
        self.streams.iter().flat_map(|r| r.streams.iter())
    }

    /// Returns container track ids of one kind, once known.
    pub fn track_ids(&self, kind: StreamKind) -> Option<Vec<u32>> {
        self.tracks.as_ref().map(|tracks| {
            tracks
                .iter()
                .filter(|t| t.stream.selector.kind == kind)
                .map(|t| t.track_id)
                .collect()
        })
    }

    fn source_title(&self) -> SourceTitle {
        SourceTitle::new(self.disc.clone(), self.source.clone())
    }
}

/// Resolution results for one configured title.
#[derive(Debug, Clone, Serialize)]
pub struct OutputPlan {
    pub disc: DiscKey,
    pub key: String,
    pub file: PathBuf,
    /// Source titles in the order their files are given to the muxer.
    pub titles: Vec<TitlePlan>,
    /// `(title position, track id)` pairs for the muxed file, once every title is extracted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux_order: Option<Vec<(usize, u32)>>,
}

impl OutputPlan {
    /// Returns the output track order across all source titles.
    ///
    /// Each entry pairs a title's position in [`OutputPlan::titles`] with a
    /// track id in that title's extracted file. `None` until every title has
    /// its container tracks attached.
    pub fn track_order(&self) -> Option<Vec<(usize, u32)>> {
        let mut order = Vec::new();
        for (position, title) in self.titles.iter().enumerate() {
            let tracks = title.tracks.as_ref()?;
            order.extend(tracks.iter().map(|t| (position, t.track_id)));
        }
        Some(order)
    }
}

/// Resolves configured titles against the loaded discs.
pub struct Planner<'a> {
    discs: &'a [Disc],
    policy: FailurePolicy,
}

impl<'a> Planner<'a> {
    pub fn new(discs: &'a [Disc], policy: FailurePolicy) -> Self {
        Self { discs, policy }
    }

    fn disc(&self, key: &DiscKey) -> Option<&'a Disc> {
        self.discs.iter().find(|disc| disc.matches(key))
    }

    /// Resolves every selector of a configured title to disc stream indices.
    pub fn plan_output(&self, output: &OutputSelection) -> Result<OutputPlan, ResolveError> {
        info!(disc = %output.disc, title = %output.key, file = %output.file.display(), "Resolving streams");

        let mut titles = Vec::new();
        for ((disc_key, source), selectors) in group_by_title(output) {
            let disc = self.disc(&disc_key).ok_or_else(|| ResolveError::UnknownDisc {
                disc: disc_key.to_string(),
                title: source.clone(),
            })?;
            let title = disc.title(&source).ok_or_else(|| ResolveError::UnknownTitle {
                disc: disc.name.clone(),
                title: source.clone(),
            })?;

            let mut streams = Vec::with_capacity(StreamKind::ALL.len());
            for kind in StreamKind::ALL {
                let resolution = resolve_streams(&source, title, kind, &selectors)?;
                report_unused_derived(&disc.name, &resolution);
                streams.push(resolution);
            }

            titles.push(TitlePlan {
                disc: disc.name.clone(),
                source,
                title_id: title.title_id.clone(),
                output_file: title.output_file.clone(),
                streams,
                tracks: None,
            });
        }

        Ok(OutputPlan {
            disc: output.disc.clone(),
            key: output.key.clone(),
            file: output.file.clone(),
            titles,
            mux_order: None,
        })
    }

    /// Translates a title plan's disc indices into track ids of its extracted file.
    pub fn attach_container(plan: &mut TitlePlan, tracks: &ContainerTrackMap) -> Result<(), ResolveError> {
        let mut resolved = Vec::new();
        for resolution in &plan.streams {
            resolved.extend(resolve_container_ids(resolution, tracks)?);
        }
        debug!(disc = %plan.disc, title = %plan.source, tracks = ?resolved.iter().map(|t| t.track_id).collect::<Vec<_>>(), "Mapped container tracks");
        plan.tracks = Some(resolved);
        Ok(())
    }

    /// Plans every configured title of a loaded disc, applying the failure policy to resolution errors.
    ///
    /// Titles configured for discs that were not loaded are left out.
    /// `containers` holds the track map of each extracted title file.
    pub fn plan_all(
        &self,
        outputs: &[OutputSelection],
        containers: &HashMap<SourceTitle, ContainerTrackMap>,
    ) -> Result<Vec<OutputPlan>, ResolveError> {
        let mut plans = Vec::with_capacity(outputs.len());
        let mut skipped = 0usize;

        for output in outputs {
            if self.disc(&output.disc).is_none() {
                debug!(disc = %output.disc, title = %output.key, "Disc not loaded, not planning title");
                continue;
            }

            let planned = self.plan_output(output).and_then(|mut plan| {
                for title in &mut plan.titles {
                    if let Some(tracks) = containers.get(&title.source_title()) {
                        Self::attach_container(title, tracks)?;
                    }
                }
                plan.mux_order = plan.track_order();
                Ok(plan)
            });

            match planned {
                Ok(plan) => plans.push(plan),
                Err(e) => match self.policy {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::SkipTitle => {
                        error!(disc = %output.disc, title = %output.key, error = %e, "Skipping title");
                        skipped += 1;
                    }
                },
            }
        }

        info!(planned = plans.len(), skipped, "Resolution finished");
        Ok(plans)
    }
}

/// Groups an output's selectors by the disc title they refer to.
///
/// Default flags are inferred over each full per-kind list first, so a
/// default chosen on one title also settles the flags of the others.
fn group_by_title(output: &OutputSelection) -> Vec<((DiscKey, String), Vec<StreamSelector>)> {
    let mut groups: Vec<((DiscKey, String), Vec<StreamSelector>)> = Vec::new();

    for kind in StreamKind::ALL {
        let selectors = output.selectors(kind);
        let defaults = infer_default_flags(&selectors);

        for (selector, default) in selectors.into_iter().zip(defaults) {
            let selector = StreamSelector { default, ..selector };
            let found = groups
                .iter_mut()
                .find(|((disc, title), _)| *disc == selector.disc && *title == selector.title);
            match found {
                Some((_, group)) => group.push(selector),
                None => groups.push(((selector.disc.clone(), selector.title.clone()), vec![selector])),
            }
        }
    }

    groups
}

fn report_unused_derived(disc: &str, resolution: &StreamResolution) {
    for unused in &resolution.unused_derived {
        warn!(
            disc = %disc,
            title = %unused.title,
            kind = %unused.kind,
            ordinal = unused.ordinal,
            stream = unused.derived_index,
            "Derived {} track {} is not used",
            unused.kind,
            unused.ordinal
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use crate::disc::Title;
    use crate::streams::container::{ContainerTrack, TrackProperties};

    fn movie() -> Disc {
        let feature = Arc::new(Title {
            title_id: "0".to_string(),
            output_file: "title_t00.mkv".to_string(),
            output_bytes: 1,
            video: BTreeSet::from([0, 1]),
            audio: BTreeSet::from([2, 3, 4]),
            subtitle: BTreeSet::from([5, 6]),
            derived: BTreeSet::from([1, 4, 6]),
        });
        let extras = Arc::new(Title {
            title_id: "1".to_string(),
            output_file: "title_t01.mkv".to_string(),
            output_bytes: 1,
            video: BTreeSet::from([0]),
            audio: BTreeSet::from([1]),
            ..Default::default()
        });

        let mut titles = HashMap::new();
        titles.insert("00800.mpls".to_string(), Arc::clone(&feature));
        titles.insert("00900.mpls".to_string(), feature);
        titles.insert("00801.mpls".to_string(), extras);
        Disc {
            name: "MOVIE".to_string(),
            hash: None,
            path: PathBuf::from("MOVIE.txt"),
            titles,
        }
    }

    fn bonus() -> Disc {
        let featurette = Arc::new(Title {
            title_id: "0".to_string(),
            output_file: "title_t00.mkv".to_string(),
            output_bytes: 1,
            video: BTreeSet::from([0]),
            audio: BTreeSet::from([1, 2]),
            ..Default::default()
        });
        Disc {
            name: "BONUS".to_string(),
            hash: Some("c0ffee".to_string()),
            path: PathBuf::from("BONUS.txt"),
            titles: HashMap::from([("00010.mpls".to_string(), featurette)]),
        }
    }

    fn output(disc: &str, key: &str, json: &str) -> OutputSelection {
        OutputSelection {
            file: PathBuf::from("movies.json"),
            disc: DiscKey::parse(disc),
            key: key.to_string(),
            selection: serde_json::from_str(json).unwrap(),
        }
    }

    fn container(pairs: &[(u32, u64)]) -> ContainerTrackMap {
        let tracks: Vec<ContainerTrack> = pairs
            .iter()
            .map(|&(id, number)| ContainerTrack {
                id,
                track_type: String::new(),
                properties: TrackProperties { number: Some(number) },
            })
            .collect();
        ContainerTrackMap::from_tracks(&tracks)
    }

    #[test]
    fn plans_default_streams() {
        let discs = [movie()];
        let planner = Planner::new(&discs, FailurePolicy::Abort);
        let plan = planner.plan_output(&output("MOVIE", "00800.mpls", "{}")).unwrap();

        assert_eq!(plan.titles.len(), 1);
        let title = &plan.titles[0];
        assert_eq!(title.disc, "MOVIE");
        assert_eq!(title.output_file, "title_t00.mkv");
        let indices: Vec<u32> = title.resolved_streams().map(|s| s.disc_index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert!(plan.track_order().is_none());
    }

    #[test]
    fn alias_key_resolves_to_shared_title() {
        let discs = [movie()];
        let planner = Planner::new(&discs, FailurePolicy::Abort);
        let plan = planner.plan_output(&output("MOVIE", "00900.mpls", "{}")).unwrap();
        assert_eq!(plan.titles[0].title_id, "0");
        assert_eq!(plan.titles[0].source, "00900.mpls");
    }

    #[test]
    fn groups_selectors_by_title_and_infers_defaults_across_titles() {
        let discs = [movie()];
        let planner = Planner::new(&discs, FailurePolicy::Abort);
        let plan = planner
            .plan_output(&output(
                "MOVIE",
                "00800.mpls",
                r#"{"audio": [
                    {"track": 0},
                    {"track": {"index": 0, "title": "00801.mpls"}, "default": true}
                ]}"#,
            ))
            .unwrap();

        assert_eq!(plan.titles.len(), 2);
        assert_eq!(plan.titles[0].source, "00800.mpls");
        assert_eq!(plan.titles[1].source, "00801.mpls");

        let feature_audio = &plan.titles[0].streams[1];
        assert_eq!(feature_audio.kind, StreamKind::Audio);
        assert_eq!(feature_audio.streams[0].default, Some(false));

        let extras_audio = &plan.titles[1].streams[1];
        assert_eq!(extras_audio.streams[0].disc_index, 1);
        assert_eq!(extras_audio.streams[0].default, Some(true));
    }

    #[test]
    fn attaches_container_track_ids_in_muxing_order() {
        let discs = [movie()];
        let planner = Planner::new(&discs, FailurePolicy::Abort);
        let outputs = vec![output(
            "MOVIE",
            "00800.mpls",
            r#"{"video": [{"track": {"index": 0, "core": true}}], "audio": [{"track": 1}, {"track": 0}], "subtitle": [{"track": 0}]}"#,
        )];
        // extraction kept video 1, audio 2-3 and subtitle 5
        let containers = HashMap::from([(
            SourceTitle::new("MOVIE", "00800.mpls"),
            container(&[(0, 2), (1, 3), (2, 4), (3, 6)]),
        )]);

        let plans = planner.plan_all(&outputs, &containers).unwrap();
        let title = &plans[0].titles[0];
        assert_eq!(title.track_ids(StreamKind::Audio), Some(vec![2, 1]));
        assert_eq!(
            plans[0].mux_order,
            Some(vec![(0, 0), (0, 2), (0, 1), (0, 3)])
        );
    }

    #[test]
    fn track_order_spans_source_titles_across_discs() {
        let discs = [movie(), bonus()];
        let planner = Planner::new(&discs, FailurePolicy::Abort);
        let outputs = vec![output(
            "MOVIE",
            "00800.mpls",
            r#"{"audio": [
                {"track": 0},
                {"track": {"index": 1, "source": "BONUS:c0ffee", "title": "00010.mpls"}, "name": "Commentary"}
            ]}"#,
        )];
        let containers = HashMap::from([
            (SourceTitle::new("MOVIE", "00800.mpls"), container(&[(0, 1), (1, 3)])),
            (SourceTitle::new("BONUS", "00010.mpls"), container(&[(0, 2), (1, 3)])),
        ]);

        let plans = planner.plan_all(&outputs, &containers).unwrap();
        let plan = &plans[0];
        assert_eq!(plan.titles.len(), 2);
        assert_eq!(plan.titles[1].disc, "BONUS");
        assert_eq!(plan.titles[1].resolved_streams().next().unwrap().disc_index, 2);
        assert_eq!(plan.track_order(), Some(vec![(0, 0), (0, 1), (1, 1)]));
    }

    #[test]
    fn track_order_waits_for_every_title() {
        let discs = [movie()];
        let planner = Planner::new(&discs, FailurePolicy::Abort);
        let outputs = vec![output(
            "MOVIE",
            "00800.mpls",
            r#"{"audio": [{"track": 0}, {"track": {"index": 0, "title": "00801.mpls"}}]}"#,
        )];
        let containers = HashMap::from([(SourceTitle::new("MOVIE", "00800.mpls"), container(&[(0, 1), (1, 3)]))]);

        let plans = planner.plan_all(&outputs, &containers).unwrap();
        assert!(plans[0].titles[0].tracks.is_some());
        assert!(plans[0].titles[1].tracks.is_none());
        assert_eq!(plans[0].mux_order, None);
    }

    #[test]
    fn titles_of_other_discs_are_left_out() {
        let discs = [movie()];
        let planner = Planner::new(&discs, FailurePolicy::Abort);
        let outputs = vec![
            output("SHOW_D1", "00001.mpls", "{}"),
            output("MOVIE", "00800.mpls", "{}"),
        ];

        let plans = planner.plan_all(&outputs, &HashMap::new()).unwrap();
        let keys: Vec<&str> = plans.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["00800.mpls"]);
    }

    #[test]
    fn redirect_to_unloaded_disc_fails() {
        let discs = [movie()];
        let planner = Planner::new(&discs, FailurePolicy::Abort);
        let err = planner
            .plan_output(&output(
                "MOVIE",
                "00800.mpls",
                r#"{"audio": [{"track": {"index": 0, "source": "BONUS", "title": "00010.mpls"}}]}"#,
            ))
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::UnknownDisc {
                disc: "BONUS".to_string(),
                title: "00010.mpls".to_string(),
            }
        );
    }

    #[test]
    fn abort_policy_stops_at_first_failure() {
        let discs = [movie()];
        let planner = Planner::new(&discs, FailurePolicy::Abort);
        let outputs = vec![
            output("MOVIE", "00800.mpls", r#"{"audio": [{"track": 5}]}"#),
            output("MOVIE", "00801.mpls", "{}"),
        ];

        let err = planner.plan_all(&outputs, &HashMap::new()).unwrap_err();
        assert!(matches!(err, ResolveError::TrackOutOfRange { available: 2, .. }));
    }

    #[test]
    fn skip_policy_drops_only_failing_titles() {
        let discs = [movie()];
        let planner = Planner::new(&discs, FailurePolicy::SkipTitle);
        let outputs = vec![
            output("MOVIE", "missing.mpls", "{}"),
            output("MOVIE", "00800.mpls", r#"{"subtitle": [{"track": 0}]}"#),
            output("MOVIE", "00801.mpls", "{}"),
        ];
        // the extraction dropped subtitle 5
        let containers = HashMap::from([(SourceTitle::new("MOVIE", "00800.mpls"), container(&[(0, 1), (1, 3)]))]);

        let plans = planner.plan_all(&outputs, &containers).unwrap();
        let keys: Vec<&str> = plans.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["00801.mpls"]);
    }

    #[test]
    fn unknown_title_is_reported() {
        let discs = [movie()];
        let planner = Planner::new(&discs, FailurePolicy::Abort);
        let err = planner.plan_output(&output("MOVIE", "nope.mpls", "{}")).unwrap_err();
        assert_eq!(err.title(), "nope.mpls");
    }
}
