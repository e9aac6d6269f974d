//! Checks on setting values and title selection entries.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::model::{AppConfig, OutputSelection, TrackRef};
use crate::disc::StreamKind;

use super::{Finding, Findings, Scope};

/// Valid ISO 639-2 language codes (common subset).
const VALID_LANGUAGE_CODES: &[&str] = &[
    "eng", "jpn", "deu", "fra", "spa", "ita", "por", "rus", "zho", "kor", "ara", "hin", "tha",
    "vie", "ind", "msa", "pol", "nld", "swe", "nor", "dan", "fin", "ces", "hun", "ron", "tur",
    "ell", "heb", "ukr", "bul", "hrv", "srp", "slv", "slk", "lit", "lav", "est", "und", "mul",
];

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Language tags the muxer accepts: a 2-3 letter code with optional subtags.
fn language_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("language tag pattern is valid")
    })
}

/// Checks global application settings.
pub fn check_settings(config: &AppConfig) -> Findings {
    let mut findings = Findings::new();

    if !VALID_LOG_LEVELS.contains(&config.log_level.as_str()) {
        findings.push(
            Finding::error(
                Scope::Settings,
                "log_level",
                format!("Unknown log level '{}'", config.log_level),
            )
            .with_hint(format!("use one of {}", VALID_LOG_LEVELS.join(", "))),
        );
    }

    findings
}

/// Checks the stream entries of one configured title.
pub fn check_selection(output: &OutputSelection) -> Findings {
    let mut findings = Findings::new();
    let scope = Scope::of(output);

    if output.disc.name.is_empty() {
        findings.push(Finding::error(scope.clone(), "disc", "Disc key has no name"));
    }

    for kind in StreamKind::ALL {
        let selectors = output.selectors(kind);
        let entries = output.selection.entries(kind);

        let explicit_defaults = selectors.iter().filter(|s| s.default == Some(true)).count();
        if explicit_defaults > 1 {
            findings.push(
                Finding::warning(
                    scope.clone(),
                    kind.to_string(),
                    format!("{} {} tracks are marked default", explicit_defaults, kind),
                )
                .with_hint("players honour only one default track per type"),
            );
        }

        for (i, (selector, entry)) in selectors.iter().zip(entries).enumerate() {
            let field = |name: &str| format!("{}[{}].{}", kind, i, name);

            if let TrackRef::Detailed(spec) = &entry.track {
                if spec.source.is_some() && spec.title.is_none() {
                    findings.push(
                        Finding::error(scope.clone(), field("track"), "A disc redirect needs a title")
                            .with_hint("add \"title\" next to \"source\""),
                    );
                }
            }

            if selectors[..i].iter().any(|earlier| earlier.same_source(selector)) {
                findings.push(Finding::warning(
                    scope.clone(),
                    field("track"),
                    "The same disc stream is selected more than once",
                ));
            }

            if let Some(language) = &selector.language {
                if let Some(finding) = check_language(&scope, field("language"), language) {
                    findings.push(finding);
                }
            }

            if let Some(cropping) = &selector.cropping {
                if kind != StreamKind::Video {
                    findings.push(Finding::error(
                        scope.clone(),
                        field("cropping"),
                        format!("Cropping is only supported on video tracks, not {}", kind),
                    ));
                } else if cropping.is_empty() {
                    findings.push(
                        Finding::warning(scope.clone(), field("cropping"), "Crop box is empty")
                            .with_hint("remove the cropping entry or set at least one edge"),
                    );
                }
            }
        }
    }

    findings
}

/// Checks a language tag's shape, then its primary code against known codes.
fn check_language(scope: &Scope, field: String, language: &str) -> Option<Finding> {
    if !language_tag_pattern().is_match(language) {
        return Some(
            Finding::error(scope.clone(), field, format!("Malformed language tag '{}'", language))
                .with_hint(format!("did you mean '{}'?", find_similar_language(language))),
        );
    }

    let primary = language.split('-').next().unwrap_or(language);
    if VALID_LANGUAGE_CODES.contains(&primary) {
        return None;
    }
    Some(
        Finding::warning(scope.clone(), field, format!("Unknown language code '{}'", language))
            .with_hint(format!("did you mean '{}'?", find_similar_language(primary))),
    )
}

/// Finds the most similar language code using Levenshtein distance.
fn find_similar_language(input: &str) -> &'static str {
    let input_lower = input.to_lowercase();

    let common_mappings = [
        ("english", "eng"),
        ("japanese", "jpn"),
        ("german", "deu"),
        ("french", "fra"),
        ("spanish", "spa"),
        ("en", "eng"),
        ("ja", "jpn"),
        ("de", "deu"),
        ("fr", "fra"),
        ("es", "spa"),
    ];

    for (mistake, correct) in common_mappings {
        if input_lower == mistake {
            return correct;
        }
    }

    VALID_LANGUAGE_CODES
        .iter()
        .min_by_key(|code| strsim::levenshtein(&input_lower, code))
        .copied()
        .unwrap_or("und")
}
