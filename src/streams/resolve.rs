//! Ordinal resolution against a title's stream inventory.

use std::collections::BTreeSet;

use serde::Serialize;

use super::StreamSelector;
use crate::disc::{StreamKind, Title};
use crate::error::ResolveError;

/// A selector paired with the disc stream it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStream {
    pub selector: StreamSelector,
    /// Disc-relative stream index.
    pub disc_index: u32,
    /// Default flag after inference across the selector list.
    pub default: Option<bool>,
}

/// A derived alternate that nobody selected although its actual stream was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnusedDerived {
    pub title: String,
    pub kind: StreamKind,
    /// Ordinal of the actual stream the alternate belongs to.
    pub ordinal: usize,
    pub actual_index: u32,
    pub derived_index: u32,
}

/// Result of resolving one title's selectors of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamResolution {
    pub title: String,
    pub kind: StreamKind,
    pub streams: Vec<ResolvedStream>,
    /// Non-fatal findings; callers decide how to report them.
    pub unused_derived: Vec<UnusedDerived>,
}

/// Computes the effective default flag of each selector.
///
/// When any selector explicitly sets `default = true`, selectors without an
/// explicit flag become `Some(false)`. Otherwise nothing changes.
pub fn infer_default_flags(selectors: &[StreamSelector]) -> Vec<Option<bool>> {
    let any_default = selectors.iter().any(|s| s.default == Some(true));
    selectors
        .iter()
        .map(|s| match s.default {
            None if any_default => Some(false),
            other => other,
        })
        .collect()
}

/// Resolves every selector of `kind` against the title's streams.
///
/// Selectors of other kinds are ignored.
pub fn resolve_streams(
    title_key: &str,
    title: &Title,
    kind: StreamKind,
    selectors: &[StreamSelector],
) -> Result<StreamResolution, ResolveError> {
    let selectors: Vec<StreamSelector> = selectors.iter().filter(|s| s.kind == kind).cloned().collect();
    let actual = title.actual_streams(kind);

    let mut streams = Vec::with_capacity(selectors.len());
    for (selector, default) in selectors.iter().zip(infer_default_flags(&selectors)) {
        let disc_index = resolve_disc_index(title_key, title, &actual, selector)?;
        streams.push(ResolvedStream {
            selector: selector.clone(),
            disc_index,
            default,
        });
    }

    let selected: BTreeSet<u32> = streams.iter().map(|s| s.disc_index).collect();
    let unused_derived = if kind.reports_unused_derived() {
        find_unused_derived(title_key, title, kind, &actual, &selected)
    } else {
        Vec::new()
    };

    Ok(StreamResolution {
        title: title_key.to_string(),
        kind,
        streams,
        unused_derived,
    })
}

fn resolve_disc_index(
    title_key: &str,
    title: &Title,
    actual: &[u32],
    selector: &StreamSelector,
) -> Result<u32, ResolveError> {
    let kind = selector.kind;
    let Some(&actual_index) = actual.get(selector.ordinal) else {
        return Err(ResolveError::TrackOutOfRange {
            title: title_key.to_string(),
            kind,
            ordinal: selector.ordinal,
            available: actual.len(),
        });
    };
    if !selector.derived {
        return Ok(actual_index);
    }

    let derived_index = actual_index + 1;
    if !title.streams(kind).contains(&derived_index) || !title.derived.contains(&derived_index) {
        return Err(ResolveError::MissingDerived {
            title: title_key.to_string(),
            kind,
            ordinal: selector.ordinal,
            disc_index: derived_index,
        });
    }
    Ok(derived_index)
}

/// Finds derived streams left out while the actual stream they belong to was selected.
fn find_unused_derived(
    title_key: &str,
    title: &Title,
    kind: StreamKind,
    actual: &[u32],
    selected: &BTreeSet<u32>,
) -> Vec<UnusedDerived> {
    let streams = title.streams(kind);
    title
        .derived
        .iter()
        .filter(|&&index| streams.contains(&index) && !selected.contains(&index))
        .filter_map(|&derived_index| {
            // actual is ascending, so the owner is the last actual stream below
            let ordinal = actual.partition_point(|&a| a <= derived_index).checked_sub(1)?;
            let actual_index = actual[ordinal];
            selected.contains(&actual_index).then(|| UnusedDerived {
                title: title_key.to_string(),
                kind,
                ordinal,
                actual_index,
                derived_index,
            })
        })
        .collect()
}
