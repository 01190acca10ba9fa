//! Telegram HTML rendering for lookup results.

use serde_json::Value;

use nsb_core::normalize::Record;

/// Telegram messages cap out at 4096 bytes; stay under with headroom.
pub const SAFE_MESSAGE_LIMIT: usize = 4000;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// One block per record, one `Key: value` line per field.
pub fn render_records(term: &str, records: &[Record]) -> String {
    let mut out = format!("🔍 <b>Results for</b> <code>{}</code>\n", escape_html(term));

    for (i, record) in records.iter().enumerate() {
        out.push('\n');
        if records.len() > 1 {
            out.push_str(&format!("<b>Record {}</b>\n", i + 1));
        }
        for (key, value) in record {
            out.push_str(&format!(
                "<b>{}:</b> <code>{}</code>\n",
                escape_html(&prettify_key(key)),
                escape_html(&value_to_display(value)),
            ));
        }
    }

    out
}

/// Truncate oversized output. Rendered lines are self-contained HTML, so a
/// line-boundary cut keeps tags balanced.
pub fn clamp(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }

    let mut cut = limit.min(text.len());
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    // Never leave a dangling half-line.
    let head = &text[..cut];
    let head = head.rfind('\n').map(|i| &head[..i]).unwrap_or(head);
    format!("{head}\n…")
}

fn prettify_key(key: &str) -> String {
    key.split(['_', '-', ' '])
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
