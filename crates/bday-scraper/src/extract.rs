//! Person and birthdate extraction from one birthday-month node.
//!
//! The upstream entity graph has no stable schema: people show up as friend
//! edges, actors, nested relationship entries, and their birthdates come as
//! `{day, month, year}` objects, nested `{date: {...}}` objects, or `M/D/Y`
//! strings. Extraction walks the whole [`Value`] tree and sniffs fields from
//! fixed, ordered candidate lists.

use std::collections::HashMap;
use std::sync::LazyLock;

use bday_core::{Birthday, BirthdayRecord};
use regex::Regex;
use serde_json::Value;

/// Structural fields used by the upstream for type dispatch. They are read for
/// person detection but never traversed as data.
const MARKER_FIELDS: [&str; 3] = ["__typename", "__isActor", "__isEntity"];

const NAME_FIELDS: [&str; 2] = ["short_name", "name"];
const PROFILE_URL_FIELDS: [&str; 2] = ["profile_url", "url"];

/// Candidate birthdate fields, in priority order. The first one that
/// normalizes wins; later fields are not consulted.
const BIRTHDATE_FIELDS: [&str; 5] = ["birthdate", "birthday", "birth_date", "birthDate", "date"];

static DATE_STRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})[/\-](\d{1,2})(?:[/\-](\d{2,4}))?").expect("valid regex")
});

/// What one birthday-month node yields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthExtraction {
    /// Human-readable month label, e.g. `"November"`.
    pub month_label: Option<String>,
    /// Upstream summary sentence for the month, if any.
    pub context_text: Option<String>,
    /// Deduplicated people with a resolved day and month.
    pub friends: Vec<BirthdayRecord>,
}

/// Extracts every person with a recognizable birthdate from `node`.
#[must_use]
pub fn extract_from_node(node: &Value) -> MonthExtraction {
    let month_label = node
        .get("month_name_in_iso8601")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    let context_text = node
        .pointer("/friends_by_birthday_month_context_sentence/text")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    let mut collector = FriendCollector::default();
    collector.visit(node);

    let friends = collector
        .friends
        .into_iter()
        .filter(|f| f.birthday.is_some())
        .collect();

    MonthExtraction {
        month_label,
        context_text,
        friends,
    }
}

/// Normalizes one raw birthdate value.
///
/// - Objects: reads `day`/`day_of_month`, `month`/`month_number` and `year`
///   from the object itself or from its nested `date` object. Each accepts an
///   integer or an all-digit string.
/// - Strings: first `M/D[/Y]` or `M-D[-Y]` match, month first.
///
/// Day must fall in `1..=31` and month in `1..=12`; the year is optional.
#[must_use]
pub fn normalize_birthdate(raw: &Value) -> Option<Birthday> {
    match raw {
        Value::Object(map) => {
            let source = match map.get("date") {
                Some(nested @ Value::Object(_)) => nested,
                _ => raw,
            };
            let day = first_present(source, &["day", "day_of_month"]).and_then(to_number)?;
            let month = first_present(source, &["month", "month_number"]).and_then(to_number)?;
            let year = source
                .get("year")
                .and_then(to_number)
                .and_then(|y| i32::try_from(y).ok());
            birthday_in_range(day, month, year)
        }
        Value::String(s) => {
            let caps = DATE_STRING_RE.captures(s)?;
            let month = caps.get(1)?.as_str().parse::<u64>().ok()?;
            let day = caps.get(2)?.as_str().parse::<u64>().ok()?;
            let year = caps.get(3).and_then(|m| m.as_str().parse::<i32>().ok());
            birthday_in_range(day, month, year)
        }
        _ => None,
    }
}

fn birthday_in_range(day: u64, month: u64, year: Option<i32>) -> Option<Birthday> {
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return None;
    }
    Some(Birthday {
        day: u32::try_from(day).ok()?,
        month: u32::try_from(month).ok()?,
        year,
    })
}

/// First candidate field that is present and not `null`. A present field that
/// fails to convert does not fall through to the next candidate.
fn first_present<'a>(source: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .find_map(|f| source.get(*f).filter(|v| !v.is_null()))
}

fn to_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse().ok()
        }
        _ => None,
    }
}

/// Mirrors loose truthiness of the upstream's own client: `null`, `false`,
/// `0` and `""` count as absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn first_truthy<'a>(node: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .find_map(|f| node.get(*f).filter(|v| is_truthy(v)))
}

fn first_string(node: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|f| {
        node.get(*f)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    })
}

fn looks_like_person(node: &Value) -> bool {
    let user_tagged = first_truthy(node, &MARKER_FIELDS).is_some_and(|tag| {
        let rendered = match tag {
            Value::String(s) => s.to_lowercase(),
            other => other.to_string().to_lowercase(),
        };
        rendered.contains("user")
    });
    user_tagged || first_truthy(node, &PROFILE_URL_FIELDS).is_some()
}

#[derive(Default)]
struct FriendCollector {
    friends: Vec<BirthdayRecord>,
    index: HashMap<String, usize>,
}

impl FriendCollector {
    fn visit(&mut self, value: &Value) {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.visit(item);
                }
            }
            Value::Object(map) => {
                if looks_like_person(value) {
                    self.record_person(value);
                }
                for (key, child) in map {
                    if MARKER_FIELDS.contains(&key.as_str()) {
                        continue;
                    }
                    self.visit(child);
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
        }
    }

    fn record_person(&mut self, node: &Value) {
        let record = BirthdayRecord {
            name: first_string(node, &NAME_FIELDS),
            profile_url: first_string(node, &PROFILE_URL_FIELDS),
            birthday: BIRTHDATE_FIELDS
                .iter()
                .filter_map(|f| node.get(*f))
                .find_map(normalize_birthdate),
        };
        if record.has_identity() {
            self.upsert(record);
        }
    }

    /// Keeps the first record per key; a later birthday only fills a gap.
    fn upsert(&mut self, record: BirthdayRecord) {
        let key = record.dedup_key();
        match self.index.get(&key) {
            Some(&i) => {
                let existing = &mut self.friends[i];
                if existing.birthday.is_none() && record.birthday.is_some() {
                    existing.birthday = record.birthday;
                }
            }
            None => {
                self.index.insert(key, self.friends.len());
                self.friends.push(record);
            }
        }
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
