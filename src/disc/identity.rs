//! Maps human-meaningful source keys to titles.
//!
//! A title can be addressed by its source playlist (optionally with the
//! angle), by its original title id, or by its comment. Titles the ripping
//! tool skipped as byte-identical copies are aliased to the title they copy.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::info::{DiscReport, TitleRecord};
use super::{Disc, DiscKey, Title};
use crate::error::InventoryError;

/// Builds the `source key -> title` mapping for one disc.
pub fn resolve_titles(key: &DiscKey, path: &Path, report: &DiscReport) -> Result<Disc, InventoryError> {
    let name = key.name.as_str();
    let mut titles: Vec<(&TitleRecord, Arc<Title>)> = Vec::with_capacity(report.records.len());
    for record in &report.records {
        titles.push((record, Arc::new(build_title(name, record)?)));
    }

    let mut keys: HashMap<String, Arc<Title>> = HashMap::new();

    for (record, title) in &titles {
        if let Some(file) = &record.source_file {
            let key = match &record.angle {
                Some(angle) => format!("{}({})", file, angle),
                None => file.clone(),
            };
            keys.insert(key, Arc::clone(title));
        }
    }
    for (record, title) in &titles {
        if let Some(id) = &record.original_title_id {
            keys.insert(id.clone(), Arc::clone(title));
        }
    }
    for (record, title) in &titles {
        if let Some(comment) = &record.comment {
            keys.insert(comment.clone(), Arc::clone(title));
        }
    }

    let with_data: HashSet<String> = keys.keys().cloned().collect();
    let aliases: HashMap<&str, &str> = report
        .duplicates
        .iter()
        .map(|(source, target)| (source.as_str(), target.as_str()))
        .collect();

    for (source, target) in &report.duplicates {
        if with_data.contains(source) {
            return Err(InventoryError::DuplicateHasData {
                disc: name.to_string(),
                key: source.clone(),
            });
        }

        let terminal = follow_alias(&aliases, target).ok_or_else(|| InventoryError::DuplicateCycle {
            disc: name.to_string(),
            key: source.clone(),
        })?;

        let title = keys
            .get(terminal)
            .cloned()
            .ok_or_else(|| InventoryError::DuplicateOfMissing {
                disc: name.to_string(),
                key: source.clone(),
                target: terminal.to_string(),
            })?;
        debug!(source = %source, target = %terminal, "Aliased duplicate title");
        keys.insert(source.clone(), title);
    }

    let mut identified: Vec<&str> = keys.keys().map(String::as_str).collect();
    identified.sort_unstable();
    debug!(disc = %name, keys = ?identified, "Identified titles");

    Ok(Disc {
        name: name.to_string(),
        hash: key.hash.clone(),
        path: path.to_path_buf(),
        titles: keys,
    })
}

/// Follows alias links to a key that is not itself an alias.
///
/// Returns `None` when the chain does not end within `aliases.len() + 1` steps.
fn follow_alias<'a>(aliases: &HashMap<&'a str, &'a str>, start: &'a str) -> Option<&'a str> {
    let mut current = start;
    for _ in 0..=aliases.len() {
        match aliases.get(current) {
            Some(next) => current = *next,
            None => return Some(current),
        }
    }
    None
}

fn build_title(disc: &str, record: &TitleRecord) -> Result<Title, InventoryError> {
    let output_file = record
        .output_file
        .clone()
        .ok_or_else(|| InventoryError::MissingOutputFile {
            disc: disc.to_string(),
            title: record.title_id.clone(),
        })?;
    let output_bytes = record.output_bytes.ok_or_else(|| InventoryError::MissingOutputSize {
        disc: disc.to_string(),
        title: record.title_id.clone(),
    })?;

    let title = Title {
        title_id: record.title_id.clone(),
        output_file,
        output_bytes,
        video: record.video.clone(),
        audio: record.audio.clone(),
        subtitle: record.subtitle.clone(),
        derived: record.derived.clone(),
    };
    if let Some(index) = title.stray_derived() {
        return Err(InventoryError::DerivedOutsideStreams {
            disc: disc.to_string(),
            title: record.title_id.clone(),
            index,
        });
    }
    Ok(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, source: Option<&str>) -> TitleRecord {
        TitleRecord {
            title_id: id.to_string(),
            source_file: source.map(String::from),
            output_file: Some(format!("title_t{:0>2}.mkv", id)),
            output_bytes: Some(100),
            ..Default::default()
        }
    }

    fn resolve(report: &DiscReport) -> Result<Disc, InventoryError> {
        resolve_titles(&DiscKey::new("DISC"), Path::new("DISC.txt"), report)
    }

    fn report(records: Vec<TitleRecord>, duplicates: &[(&str, &str)]) -> DiscReport {
        DiscReport {
            records,
            duplicates: duplicates
                .iter()
                .map(|(s, t)| (s.to_string(), t.to_string()))
                .collect(),
        }
    }

    #[test]
    fn keys_by_source_file_and_angle() {
        let mut angled = record("1", Some("00800.mpls"));
        angled.angle = Some("2".to_string());
        let disc = resolve(&report(vec![record("0", Some("00800.mpls")), angled], &[])).unwrap();

        assert_eq!(disc.title("00800.mpls").unwrap().title_id, "0");
        assert_eq!(disc.title("00800.mpls(2)").unwrap().title_id, "1");
    }

    #[test]
    fn comment_overrides_earlier_keys() {
        let mut first = record("0", Some("00001.mpls"));
        first.original_title_id = Some("main".to_string());
        let mut second = record("1", Some("00002.mpls"));
        second.comment = Some("main".to_string());
        let disc = resolve(&report(vec![first, second], &[])).unwrap();

        assert_eq!(disc.title("main").unwrap().title_id, "1");
        assert_eq!(disc.keys(), vec!["00001.mpls", "00002.mpls", "main"]);
    }

    #[test]
    fn duplicate_chain_resolves_to_real_title() {
        let disc = resolve(
            &report(
                vec![record("0", Some("real.mpls"))],
                &[("source.mpls", "target.mpls"), ("target.mpls", "target2.mpls"), ("target2.mpls", "real.mpls")],
            ),
        )
        .unwrap();

        let real = disc.title("real.mpls").unwrap();
        assert!(Arc::ptr_eq(disc.title("source.mpls").unwrap(), real));
        assert!(Arc::ptr_eq(disc.title("target.mpls").unwrap(), real));
    }

    #[test]
    fn duplicate_cycle_is_rejected() {
        let err = resolve(
            &report(vec![record("0", Some("real.mpls"))], &[("a.mpls", "b.mpls"), ("b.mpls", "a.mpls")]),
        )
        .unwrap_err();
        assert!(matches!(err, InventoryError::DuplicateCycle { ref key, .. } if key == "a.mpls"));
    }

    #[test]
    fn duplicate_with_data_is_rejected() {
        let err = resolve(
            &report(
                vec![record("0", Some("a.mpls")), record("1", Some("b.mpls"))],
                &[("a.mpls", "b.mpls")],
            ),
        )
        .unwrap_err();
        assert!(matches!(err, InventoryError::DuplicateHasData { .. }));
    }

    #[test]
    fn duplicate_of_missing_title_is_rejected() {
        let err = resolve(&report(vec![], &[("a.mpls", "gone.mpls")])).unwrap_err();
        assert_eq!(
            err,
            InventoryError::DuplicateOfMissing {
                disc: "DISC".to_string(),
                key: "a.mpls".to_string(),
                target: "gone.mpls".to_string(),
            }
        );
    }

    #[test]
    fn repeated_duplicate_relation_is_accepted() {
        let disc = resolve(&report(
            vec![record("0", Some("00800.mpls"))],
            &[("00802.mpls", "00800.mpls"), ("00802.mpls", "00800.mpls")],
        ))
        .unwrap();
        assert!(Arc::ptr_eq(
            disc.title("00802.mpls").unwrap(),
            disc.title("00800.mpls").unwrap()
        ));
    }

    #[test]
    fn repeated_duplicate_from_dump_is_accepted() {
        let dump = concat!(
            "TINFO:0,16,0,\"00800.mpls\"\n",
            "TINFO:0,27,0,\"title_t00.mkv\"\n",
            "TINFO:0,11,0,\"1024\"\n",
            "MSG:3309,0,2,\"skipped\",\"Title %1 is equal to title %2\",\"00802.mpls\",\"00800.mpls\"\n",
            "MSG:3309,0,2,\"skipped\",\"Title %1 is equal to title %2\",\"00802.mpls\",\"00800.mpls\"\n",
        );
        let disc = resolve(&crate::disc::parse_disc_info(dump).unwrap()).unwrap();
        assert_eq!(disc.title("00802.mpls").unwrap().title_id, "0");
    }

    #[test]
    fn derived_index_outside_streams_is_rejected() {
        let mut stray = record("2", Some("00900.mpls"));
        stray.audio = [1].into();
        stray.derived = [1, 9].into();
        let err = resolve(&report(vec![stray], &[])).unwrap_err();
        assert_eq!(
            err,
            InventoryError::DerivedOutsideStreams {
                disc: "DISC".to_string(),
                title: "2".to_string(),
                index: 9,
            }
        );
    }

    #[test]
    fn disc_carries_key_and_path() {
        let key = DiscKey::parse("MOVIE:abc1");
        let disc = resolve_titles(&key, Path::new("dumps/MOVIE.txt"), &report(vec![], &[])).unwrap();
        assert_eq!(disc.name, "MOVIE");
        assert_eq!(disc.hash.as_deref(), Some("abc1"));
        assert_eq!(disc.path, Path::new("dumps/MOVIE.txt"));
    }

    #[test]
    fn missing_output_metadata_is_fatal() {
        let mut no_size = record("3", Some("x.mpls"));
        no_size.output_bytes = None;
        let err = resolve(&report(vec![no_size], &[])).unwrap_err();
        assert!(matches!(err, InventoryError::MissingOutputSize { ref title, .. } if title == "3"));

        let mut no_file = record("4", Some("y.mpls"));
        no_file.output_file = None;
        let err = resolve(&report(vec![no_file], &[])).unwrap_err();
        assert!(matches!(err, InventoryError::MissingOutputFile { .. }));
    }
}
