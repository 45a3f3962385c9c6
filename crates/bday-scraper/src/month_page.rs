//! Month selection and bucket filtering for one birthday page fetch.

use bday_core::{resolve_month_label, BirthdayRecord};
use serde_json::Value;

use crate::error::ScraperError;
use crate::extract::{extract_from_node, MonthExtraction};
use crate::response::{extract_target_object, BIRTHDAY_EDGES_POINTER};

/// How many months to request for a given calendar month.
///
/// Up to October one request with `count` equal to the month number is made.
/// The upstream groups November and December into a single combined page, so
/// both of those months issue exactly one request with `count = 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    pub count: u32,
    pub combined_year_end: bool,
}

impl FetchPlan {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidMonth`] if `month` is not in `1..=12`.
    pub fn for_month(month: u32) -> Result<Self, ScraperError> {
        match month {
            1..=10 => Ok(Self {
                count: month,
                combined_year_end: false,
            }),
            11 | 12 => Ok(Self {
                count: 2,
                combined_year_end: true,
            }),
            other => Err(ScraperError::InvalidMonth(other)),
        }
    }
}

/// Runs the response extractor and then the node extractor over every edge of
/// the birthday-month connection.
#[must_use]
pub fn extract_month_buckets(raw: &str) -> Vec<MonthExtraction> {
    let Some(payload) = extract_target_object(raw) else {
        tracing::warn!("no JSON object found in birthday response");
        return Vec::new();
    };

    let Some(edges) = payload.pointer(BIRTHDAY_EDGES_POINTER).and_then(Value::as_array) else {
        tracing::warn!("birthday response has no month edges");
        return Vec::new();
    };

    edges
        .iter()
        .filter_map(|edge| edge.get("node").filter(|n| n.is_object()))
        .map(extract_from_node)
        .collect()
}

/// Friends from the buckets whose label resolves to `current_month`.
///
/// Buckets without a label, or with a label that does not resolve to a month,
/// are skipped. This also drops the neighbouring month of a combined
/// November/December page.
#[must_use]
pub fn friends_for_month(raw: &str, current_month: u32) -> Vec<BirthdayRecord> {
    let mut friends = Vec::new();
    for bucket in extract_month_buckets(raw) {
        let Some(label) = bucket.month_label.as_deref() else {
            continue;
        };
        let Some(month) = resolve_month_label(label) else {
            tracing::debug!(label, "skipping bucket with unrecognized month label");
            continue;
        };
        tracing::debug!(
            label,
            month,
            friends = bucket.friends.len(),
            context = bucket.context_text.as_deref().unwrap_or(""),
            "extracted birthday bucket"
        );
        if month == current_month {
            friends.extend(bucket.friends);
        }
    }
    friends
}
