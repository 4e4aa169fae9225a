use crate::types::{ClassificationEntry, ClassificationIntent};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Parses raw AI completion text into validated classification entries,
/// keyed by item index.
///
/// Classification is best-effort enrichment, so this function never fails:
/// every malformed input degrades to an empty or partial map, and indices
/// absent from the result mean "unclassified". One bad entry does not
/// invalidate its siblings. Duplicate indices follow last-write-wins map
/// semantics.
pub fn parse_classification_response(
    raw: &str,
    expected_count: usize,
) -> HashMap<usize, ClassificationEntry> {
    let mut entries = HashMap::new();

    if raw.trim().is_empty() {
        return entries;
    }

    // Some providers wrap JSON output in a Markdown code fence, with or
    // without a language tag.
    let body = strip_code_fence(raw);

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            debug!("Classification response is not valid JSON: {}", e);
            return entries;
        }
    };

    let list = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("classifications") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => {
                debug!("Classification response has no classifications array");
                return entries;
            }
        },
        _ => {
            debug!("Classification response has unexpected top-level shape");
            return entries;
        }
    };

    for raw_entry in list {
        if let Some(entry) = validate_entry(raw_entry, expected_count) {
            entries.insert(entry.index, entry);
        }
    }

    entries
}

/// Validates a single entry independently of its siblings. Any missing or
/// out-of-domain field skips the entry, except `confidence`, which defaults
/// to 0 and is clamped to [0, 1] regardless of input magnitude or sign.
fn validate_entry(value: &Value, expected_count: usize) -> Option<ClassificationEntry> {
    let obj = value.as_object()?;

    let index = obj.get("index").and_then(Value::as_i64)?;
    if index < 0 || index as usize >= expected_count {
        return None;
    }

    let intent_raw = obj.get("intent").and_then(Value::as_str)?;
    let intent = ClassificationIntent::parse(&intent_raw.trim().to_lowercase())?;

    let confidence = obj
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let confidence = if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };

    Some(ClassificationEntry {
        index: index as usize,
        intent,
        confidence,
    })
}

/// Strips an optional Markdown code-fence wrapper (``` or ```json). Content
/// that only looks like a fence is returned as-is and left to the JSON
/// parser to reject.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the opening fence line, language tag included.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => return trimmed,
    };

    let body = body.trim_end();
    match body.strip_suffix("```") {
        Some(inner) => inner.trim_end(),
        None => body,
    }
}
