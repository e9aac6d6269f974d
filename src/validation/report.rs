//! Renders findings for the terminal, one block per config scope.

use super::{Findings, Severity};

/// Renders every finding, grouped by the setting or configured title it concerns.
///
/// ```text
/// movies.json / MOVIE / 00800.mpls
///   error   subtitle[0].cropping: Cropping is only supported on video tracks
///   warning audio[0].language: Unknown language code 'enu'
///           hint: did you mean 'eng'?
///
/// 1 error, 1 warning
/// ```
pub fn render(findings: &Findings) -> String {
    if findings.is_empty() {
        return format!("{}\n", summary(findings));
    }

    let mut out = String::new();
    for (scope, items) in findings.by_scope() {
        out.push_str(&format!("{}\n", scope));
        for finding in items {
            out.push_str(&format!(
                "  {:<7} {}: {}\n",
                finding.severity.label(),
                finding.field,
                finding.message
            ));
            if let Some(hint) = &finding.hint {
                out.push_str(&format!("          hint: {}\n", hint));
            }
        }
        out.push('\n');
    }
    out.push_str(&summary(findings));
    out.push('\n');
    out
}

/// One-line count of errors and warnings.
pub fn summary(findings: &Findings) -> String {
    let errors = findings.count(Severity::Error);
    let warnings = findings.count(Severity::Warning);
    if errors == 0 && warnings == 0 {
        return "No problems found".to_string();
    }
    format!("{}, {}", plural(errors, "error"), plural(warnings, "warning"))
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{Finding, Scope};

    #[test]
    fn clean_configuration() {
        let findings = Findings::new();
        assert_eq!(render(&findings), "No problems found\n");
    }

    #[test]
    fn renders_blocks_per_title() {
        let scope = Scope::Title {
            file: "movies.json".to_string(),
            disc: "MOVIE".to_string(),
            title: "00800.mpls".to_string(),
        };
        let mut findings = Findings::new();
        findings.push(
            Finding::warning(scope.clone(), "audio[0].language", "Unknown language code 'enu'")
                .with_hint("did you mean 'eng'?"),
        );
        findings.push(Finding::error(
            scope,
            "subtitle[0].cropping",
            "Cropping is only supported on video tracks",
        ));

        let expected = "movies.json / MOVIE / 00800.mpls\n\
                        \x20 error   subtitle[0].cropping: Cropping is only supported on video tracks\n\
                        \x20 warning audio[0].language: Unknown language code 'enu'\n\
                        \x20         hint: did you mean 'eng'?\n\
                        \n\
                        1 error, 1 warning\n";
        assert_eq!(render(&findings), expected);
    }

    #[test]
    fn summary_pluralises() {
        let mut findings = Findings::new();
        findings.push(Finding::warning(Scope::Settings, "selections", "a"));
        findings.push(Finding::warning(Scope::Settings, "selections[0]", "b"));
        assert_eq!(summary(&findings), "0 errors, 2 warnings");
    }
}
