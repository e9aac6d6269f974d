//! Parser for the ripping tool's robot-mode disc-info report.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::error::InventoryError;

const ATTR_ANGLE: u32 = 15;
const ATTR_SOURCE_FILE: u32 = 16;
const ATTR_ORIGINAL_TITLE_ID: u32 = 24;
const ATTR_OUTPUT_FILE: u32 = 27;
const ATTR_OUTPUT_BYTES: u32 = 11;
const ATTR_COMMENT: u32 = 49;

const ATTR_TYPE: u32 = 1;
const TYPE_VIDEO: u32 = 6201;
const TYPE_AUDIO: u32 = 6202;
const TYPE_SUBTITLE: u32 = 6203;

const ATTR_STREAM_FLAGS: u32 = 22;
const STREAM_FLAG_DERIVED: u64 = 2048;

const MSG_DUPLICATE_TITLE: u32 = 3309;

/// Raw per-title fields collected from the report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleRecord {
    pub title_id: String,
    pub source_file: Option<String>,
    pub angle: Option<String>,
    pub original_title_id: Option<String>,
    pub comment: Option<String>,
    pub output_file: Option<String>,
    pub output_bytes: Option<u64>,
    pub video: BTreeSet<u32>,
    pub audio: BTreeSet<u32>,
    pub subtitle: BTreeSet<u32>,
    pub derived: BTreeSet<u32>,
}

impl TitleRecord {
    fn new(title_id: &str) -> Self {
        Self {
            title_id: title_id.to_string(),
            ..Default::default()
        }
    }
}

/// Everything the identity resolver needs from one disc-info report.
#[derive(Debug, Clone, Default)]
pub struct DiscReport {
    /// Titles in the order they first appear in the report.
    pub records: Vec<TitleRecord>,
    /// `(source, target)` pairs, in report order, where `source` duplicates `target`.
    ///
    /// Each source appears once; a repeated report for it replaces the target.
    pub duplicates: Vec<(String, String)>,
}

impl DiscReport {
    fn record_mut(&mut self, positions: &mut HashMap<String, usize>, title_id: &str) -> &mut TitleRecord {
        let index = *positions.entry(title_id.to_string()).or_insert_with(|| {
            self.records.push(TitleRecord::new(title_id));
            self.records.len() - 1
        });
        &mut self.records[index]
    }

    fn record_duplicate(&mut self, source: String, target: String) {
        match self.duplicates.iter_mut().find(|(existing, _)| *existing == source) {
            Some(entry) => entry.1 = target,
            None => self.duplicates.push((source, target)),
        }
    }
}

/// Parses the `info` report into per-title records and duplicate relations.
pub fn parse_disc_info(report: &str) -> Result<DiscReport, InventoryError> {
    let mut parsed = DiscReport::default();
    let mut positions = HashMap::new();

    for (i, line) in report.lines().enumerate() {
        let line_number = i + 1;
        let malformed = |message: &str| InventoryError::MalformedLine {
            line: line_number,
            message: message.to_string(),
        };

        if let Some(rest) = line.strip_prefix("TINFO:") {
            let fields = split_fields(rest, Some(4));
            let [title, attribute, _code, value] = fields.as_slice() else {
                return Err(malformed("expected 4 TINFO fields"));
            };
            let attribute = parse_number(attribute).ok_or_else(|| malformed("invalid attribute id"))?;
            let value = unquote(value);
            let record = parsed.record_mut(&mut positions, title);

            match attribute {
                ATTR_SOURCE_FILE => record.source_file = Some(value),
                ATTR_ANGLE => record.angle = Some(value),
                ATTR_ORIGINAL_TITLE_ID => record.original_title_id = Some(value),
                ATTR_COMMENT => record.comment = Some(value),
                ATTR_OUTPUT_FILE => record.output_file = Some(value),
                ATTR_OUTPUT_BYTES => {
                    let bytes = value
                        .parse::<u64>()
                        .map_err(|_| malformed("invalid output size"))?;
                    record.output_bytes = Some(bytes);
                }
                _ => {}
            }
        } else if let Some(rest) = line.strip_prefix("SINFO:") {
            let fields = split_fields(rest, Some(5));
            let [title, stream, attribute, code, value] = fields.as_slice() else {
                return Err(malformed("expected 5 SINFO fields"));
            };
            let stream = parse_number(stream).ok_or_else(|| malformed("invalid stream index"))?;
            let attribute = parse_number(attribute).ok_or_else(|| malformed("invalid attribute id"))?;
            let code = parse_number(code).ok_or_else(|| malformed("invalid message code"))?;
            let value = unquote(value);
            let record = parsed.record_mut(&mut positions, title);

            match (attribute, code) {
                (ATTR_TYPE, TYPE_VIDEO) => {
                    record.video.insert(stream);
                }
                (ATTR_TYPE, TYPE_AUDIO) => {
                    record.audio.insert(stream);
                }
                (ATTR_TYPE, TYPE_SUBTITLE) => {
                    record.subtitle.insert(stream);
                }
                (ATTR_STREAM_FLAGS, _) => {
                    let flags = value
                        .parse::<u64>()
                        .map_err(|_| malformed("invalid stream flags"))?;
                    if flags & STREAM_FLAG_DERIVED != 0 {
                        record.derived.insert(stream);
                    }
                }
                _ => {}
            }
        } else if let Some(rest) = line.strip_prefix("MSG:") {
            let fields = split_fields(rest, None);
            let Some(code) = fields.first().and_then(|c| parse_number(c)) else {
                return Err(malformed("invalid message code"));
            };
            if code != MSG_DUPLICATE_TITLE {
                continue;
            }
            // code, flags, count, text, format, then the format parameters
            let (Some(source), Some(target)) = (fields.get(5), fields.get(6)) else {
                return Err(malformed("duplicate title message without parameters"));
            };
            parsed.record_duplicate(unquote(source), unquote(target));
        }
    }

    debug!(
        titles = parsed.records.len(),
        duplicates = parsed.duplicates.len(),
        "Parsed disc info"
    );
    Ok(parsed)
}

fn parse_number(field: &str) -> Option<u32> {
    field.trim().parse().ok()
}

/// Splits on commas outside double quotes. With a limit, the last field keeps the remainder.
fn split_fields(line: &str, limit: Option<usize>) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if limit.is_some_and(|max| fields.len() + 1 == max) {
            break;
        }
        match c {
            '\\' if quoted => escaped = !escaped,
            '"' if !escaped => quoted = !quoted,
            ',' if !quoted => {
                fields.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        if c != '\\' {
            escaped = false;
        }
    }
    fields.push(&line[start..]);
    fields
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    inner.replace("\\\"", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"MSG:1005,0,1,"MakeMKV started","%1 started","MakeMKV"
CINFO:2,0,"DISC"
TINFO:0,16,0,"00800.mpls"
TINFO:0,27,0,"title_t00.mkv"
TINFO:0,11,0,"30937661440"
SINFO:0,0,1,6201,"Video"
SINFO:0,1,1,6202,"Audio"
SINFO:0,2,1,6202,"Audio"
SINFO:0,2,22,0,"2048"
SINFO:0,3,1,6203,"Subtitles"
TINFO:1,16,0,"00801.mpls"
TINFO:1,15,0,"2"
TINFO:1,49,0,"Feature, extended"
TINFO:1,27,0,"title_t01.mkv"
TINFO:1,11,0,"1024"
SINFO:1,0,1,6201,"Video"
MSG:3309,0,2,"Title 00802.mpls is equal to title 00800.mpls and was skipped","Title %1 is equal to title %2 and was skipped","00802.mpls","00800.mpls"
"#;

    #[test]
    fn collects_title_fields_and_streams() {
        let report = parse_disc_info(REPORT).unwrap();
        assert_eq!(report.records.len(), 2);

        let first = &report.records[0];
        assert_eq!(first.title_id, "0");
        assert_eq!(first.source_file.as_deref(), Some("00800.mpls"));
        assert_eq!(first.output_file.as_deref(), Some("title_t00.mkv"));
        assert_eq!(first.output_bytes, Some(30_937_661_440));
        assert_eq!(first.video, BTreeSet::from([0]));
        assert_eq!(first.audio, BTreeSet::from([1, 2]));
        assert_eq!(first.subtitle, BTreeSet::from([3]));
        assert_eq!(first.derived, BTreeSet::from([2]));

        let second = &report.records[1];
        assert_eq!(second.angle.as_deref(), Some("2"));
        assert_eq!(second.comment.as_deref(), Some("Feature, extended"));
    }

    #[test]
    fn collects_duplicate_relations() {
        let report = parse_disc_info(REPORT).unwrap();
        assert_eq!(
            report.duplicates,
            vec![("00802.mpls".to_string(), "00800.mpls".to_string())]
        );
    }

    #[test]
    fn repeated_duplicate_keeps_last_target() {
        let line = |target: &str| {
            format!(
                "MSG:3309,0,2,\"Title skipped\",\"Title %1 is equal to title %2 and was skipped\",\"00802.mpls\",\"{}\"\n",
                target
            )
        };
        let dump = format!(
            "{}{}{}MSG:3309,0,2,\"x\",\"x\",\"00803.mpls\",\"00800.mpls\"\n",
            line("00800.mpls"),
            line("00800.mpls"),
            line("00801.mpls")
        );

        let report = parse_disc_info(&dump).unwrap();
        assert_eq!(
            report.duplicates,
            vec![
                ("00802.mpls".to_string(), "00801.mpls".to_string()),
                ("00803.mpls".to_string(), "00800.mpls".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_non_numeric_stream_index() {
        let err = parse_disc_info("SINFO:0,x,1,6201,\"Video\"").unwrap_err();
        assert!(matches!(err, InventoryError::MalformedLine { line: 1, .. }));
    }

    #[test]
    fn split_respects_quotes_and_limit() {
        assert_eq!(split_fields(r#"0,49,0,"a, b""#, Some(4)), vec!["0", "49", "0", r#""a, b""#]);
        assert_eq!(split_fields("a,b,c,d", Some(2)), vec!["a", "b,c,d"]);
        assert_eq!(unquote(r#""say \"hi\"""#), r#"say "hi""#);
    }
}
