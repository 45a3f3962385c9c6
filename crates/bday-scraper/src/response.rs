//! Locating the payload object inside a streamed upstream response.
//!
//! The upstream writes several JSON objects per response, one per line
//! (payload, deferred fragments, perf markers). Only one of them carries the
//! birthday-month connection, and it is not always the last line.

use serde_json::Value;

/// JSON pointer to the birthday-month connection inside the payload object.
pub const BIRTHDAY_MONTHS_POINTER: &str = "/data/viewer/all_friends_by_birthday_month";

/// JSON pointer to the edges of the birthday-month connection.
pub const BIRTHDAY_EDGES_POINTER: &str = "/data/viewer/all_friends_by_birthday_month/edges";

/// Returns the object carrying the birthday-month connection, scanning lines
/// from last to first.
///
/// If no line has that shape, falls back to the last line that parses as JSON
/// at all. Returns `None` when no line parses; callers treat that as "no data
/// this cycle".
#[must_use]
pub fn extract_target_object(raw: &str) -> Option<Value> {
    let mut fallback: Option<Value> = None;

    for line in raw.lines().rev().map(str::trim) {
        if !(line.starts_with('{') && line.ends_with('}')) {
            continue;
        }
        let Ok(parsed) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if has_birthday_months(&parsed) {
            return Some(parsed);
        }
        if fallback.is_none() {
            fallback = Some(parsed);
        }
    }

    fallback
}

fn has_birthday_months(value: &Value) -> bool {
    value
        .pointer(BIRTHDAY_MONTHS_POINTER)
        .is_some_and(|v| !v.is_null())
}
