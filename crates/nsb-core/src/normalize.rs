//! Response normalization: an ordered chain of parser strategies turning a
//! free-form upstream body into a structured record set.

use regex::Regex;
use serde_json::{Map, Value};

use crate::{errors::Error, Result};

/// One normalized result row; keys are upstream field names.
pub type Record = Map<String, Value>;

/// Field names recognized by the last-resort extraction pass.
const KNOWN_FIELDS: &[&str] = &[
    "name",
    "father_name",
    "address",
    "mobile",
    "alt_mobile",
    "circle",
    "email",
    "id_number",
];

/// Strict parse → first `[...]` fragment → first `{...}` fragment →
/// field-level pattern extraction. The first strategy that yields at least
/// one non-empty record wins; provenance fields are stripped before the
/// records are handed back.
pub fn normalize(raw: &str) -> Result<Vec<Record>> {
    let strategies: [fn(&str) -> Option<Vec<Record>>; 4] = [
        parse_strict,
        parse_array_fragment,
        parse_object_fragment,
        extract_fields,
    ];

    for strategy in strategies {
        if let Some(records) = strategy(raw) {
            let records = scrub(records);
            if !records.is_empty() {
                return Ok(records);
            }
        }
    }

    Err(Error::Normalize(
        "no recognizable fields in response".to_string(),
    ))
}

fn scrub(records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .map(|mut record| {
            record.retain(|key, _| !is_provenance_key(key));
            record
        })
        .filter(|record| !record.is_empty())
        .collect()
}

/// Upstream responses tag results with the API operator's handle under
/// assorted spellings ("owner", "Owner", "API Owner", "api_owner"); those
/// never reach the caller.
fn is_provenance_key(key: &str) -> bool {
    let folded: String = key
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    folded.contains("owner")
}

fn parse_strict(raw: &str) -> Option<Vec<Record>> {
    let value: Value = serde_json::from_str(raw.trim()).ok()?;
    records_from_value(value)
}

fn parse_array_fragment(raw: &str) -> Option<Vec<Record>> {
    let fragment = bounded_fragment(raw, '[', ']')?;
    let value: Value = serde_json::from_str(fragment).ok()?;
    records_from_value(value)
}

fn parse_object_fragment(raw: &str) -> Option<Vec<Record>> {
    let fragment = bounded_fragment(raw, '{', '}')?;
    let value: Value = serde_json::from_str(fragment).ok()?;
    records_from_value(value)
}

fn records_from_value(value: Value) -> Option<Vec<Record>> {
    match value {
        Value::Array(items) => {
            let records: Vec<Record> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect();
            if records.is_empty() {
                None
            } else {
                Some(records)
            }
        }
        Value::Object(map) => Some(vec![map]),
        _ => None,
    }
}

/// First syntactically-bounded `open … close` fragment, respecting string
/// literals and escapes so brackets inside values don't end the scan.
fn bounded_fragment(raw: &str, open: char, close: char) -> Option<&str> {
    let start = raw.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in raw[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&raw[start..=start + i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Apply one labeled matcher per known field and assemble whatever matched
/// into a single synthetic record.
fn extract_fields(raw: &str) -> Option<Vec<Record>> {
    let mut record = Record::new();

    for field in KNOWN_FIELDS {
        let pattern = format!(r#"(?i)"{field}"\s*:\s*"([^"]*)""#);
        let re = Regex::new(&pattern).expect("valid field pattern");
        if let Some(cap) = re.captures(raw) {
            let value = cap[1].trim();
            if !value.is_empty() {
                record.insert((*field).to_string(), Value::String(value.to_string()));
            }
        }
    }

    if record.is_empty() {
        None
    } else {
        Some(vec![record])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
        record.get(key).and_then(|v| v.as_str())
    }

    #[test]
    fn strict_array_parses_directly() {
        let records =
            normalize(r#"[{"mobile":"9876543210","name":"John"},{"mobile":"111"}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(field(&records[0], "name"), Some("John"));
    }

    #[test]
    fn lone_object_becomes_single_record_set() {
        let records = normalize(r#"{"mobile":"9876543210"}"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(field(&records[0], "mobile"), Some("9876543210"));
    }

    #[test]
    fn array_fragment_is_extracted_from_noise() {
        let raw = "noise [ {\"mobile\":\"9876543210\"} ] trailing";
        let records = normalize(raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(field(&records[0], "mobile"), Some("9876543210"));
    }

    #[test]
    fn brackets_inside_strings_do_not_end_the_fragment() {
        let raw = r#"xx [{"address":"Block ]A[ Street"}] yy"#;
        let records = normalize(raw).unwrap();
        assert_eq!(field(&records[0], "address"), Some("Block ]A[ Street"));
    }

    #[test]
    fn object_fragment_wins_when_array_fragment_is_garbage() {
        let raw = r#"status [down] but {"mobile":"123"} was cached"#;
        let records = normalize(raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(field(&records[0], "mobile"), Some("123"));
    }

    #[test]
    fn field_extraction_handles_unbracketed_text() {
        let raw = "server said \"name\": \"John\" and died";
        let records = normalize(raw).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(field(&records[0], "name"), Some("John"));
        assert_eq!(records[0].len(), 1);
    }

    #[test]
    fn owner_variants_are_stripped() {
        let raw = r#"[{"name":"J","Owner":"@someone","api_owner":"x","API OWNER":"y"}]"#;
        let records = normalize(raw).unwrap();
        assert_eq!(records[0].len(), 1);
        assert_eq!(field(&records[0], "name"), Some("J"));
    }

    #[test]
    fn record_of_only_provenance_fields_is_not_a_result() {
        assert!(normalize(r#"{"owner":"@someone"}"#).is_err());
    }

    #[test]
    fn unrecognizable_text_fails() {
        assert!(normalize("502 Bad Gateway").is_err());
        assert!(normalize("").is_err());
        assert!(normalize("[1, 2, 3]").is_err());
    }

    #[test]
    fn fragment_scanner_requires_balance() {
        assert!(bounded_fragment("open [ never closes", '[', ']').is_none());
        assert_eq!(bounded_fragment("a [x] b", '[', ']'), Some("[x]"));
    }
}
