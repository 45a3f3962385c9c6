//! Month-label resolution for birthday-month buckets.

use chrono::{Datelike, NaiveDate};

/// Reference year used when resolving a bare month name to a date. Any
/// non-leap-sensitive year works since only the month is read back.
const REFERENCE_YEAR: i32 = 2024;

/// Resolves an upstream month label (`"November"`, `"nov"`, `"2024-11"`) to a
/// month number in `1..=12`.
///
/// Returns `None` for labels that do not parse as a date.
#[must_use]
pub fn resolve_month_label(label: &str) -> Option<u32> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    let as_name = format!("{label} 1, {REFERENCE_YEAR}");
    if let Ok(date) = NaiveDate::parse_from_str(&as_name, "%B %d, %Y") {
        return Some(date.month());
    }

    let as_iso = format!("{label}-01");
    NaiveDate::parse_from_str(&as_iso, "%Y-%m-%d")
        .ok()
        .map(|date| date.month())
}
