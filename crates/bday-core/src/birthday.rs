//! Birthday records as extracted from the upstream graph and as persisted in
//! the `birthdays` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized birthdate. `day` and `month` are always present; the year is
/// often hidden by the upstream and stays `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Birthday {
    pub day: u32,
    pub month: u32,
    #[serde(default)]
    pub year: Option<i32>,
}

impl Birthday {
    /// Calendar-day equality; the year is ignored.
    #[must_use]
    pub fn same_day_as(&self, other: &Birthday) -> bool {
        self.day == other.day && self.month == other.month
    }
}

/// One person extracted from a birthday-month node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthdayRecord {
    pub name: Option<String>,
    pub profile_url: Option<String>,
    pub birthday: Option<Birthday>,
}

impl BirthdayRecord {
    /// A record is usable only when it carries a name or a profile URL.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        self.name.is_some() || self.profile_url.is_some()
    }

    /// In-memory dedup key: `"{profile_url}|{name}"` with empty halves for
    /// missing fields.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}",
            self.profile_url.as_deref().unwrap_or(""),
            self.name.as_deref().unwrap_or("")
        )
    }
}

/// The `profile_data` JSON column of a stored row.
///
/// Fields default when absent so that rows written by older tooling still
/// deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub birthday: Option<Birthday>,
    #[serde(default, rename = "extracted_at")]
    pub extracted_at: Option<DateTime<Utc>>,
}

impl ProfileData {
    #[must_use]
    pub fn from_record(record: &BirthdayRecord, extracted_at: DateTime<Utc>) -> Self {
        Self {
            name: record.name.clone(),
            profile_url: record.profile_url.clone(),
            birthday: record.birthday,
            extracted_at: Some(extracted_at),
        }
    }
}

/// A row of the `birthdays` table.
///
/// `card_url` belongs to the greeting-posting side; the fetch pipeline never
/// writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedProfile {
    pub id: i64,
    pub profile_data: ProfileData,
    #[serde(default)]
    pub card_url: Option<String>,
}

impl PersistedProfile {
    /// Marker written to `card_url` once a greeting has been posted.
    pub const POSTED_MARKER: &'static str = "true";

    /// Whether this profile still awaits a greeting.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.card_url.as_deref() != Some(Self::POSTED_MARKER)
    }
}

/// Insert payload for the `birthdays` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub profile_data: ProfileData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_substitutes_empty_halves() {
        let record = BirthdayRecord {
            name: Some("Ada".to_string()),
            profile_url: None,
            birthday: None,
        };
        assert_eq!(record.dedup_key(), "|Ada");
    }

    #[test]
    fn record_without_name_or_url_has_no_identity() {
        assert!(!BirthdayRecord::default().has_identity());
    }

    #[test]
    fn same_day_ignores_year() {
        let a = Birthday {
            day: 14,
            month: 3,
            year: Some(1990),
        };
        let b = Birthday {
            day: 14,
            month: 3,
            year: None,
        };
        assert!(a.same_day_as(&b));
    }

    #[test]
    fn profile_data_serializes_with_store_field_names() {
        let data = ProfileData {
            name: Some("Ada".to_string()),
            profile_url: Some("https://example.com/ada".to_string()),
            birthday: Some(Birthday {
                day: 10,
                month: 12,
                year: None,
            }),
            extracted_at: None,
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["profileUrl"], "https://example.com/ada");
        assert_eq!(json["birthday"]["month"], 12);
        assert!(json["birthday"]["year"].is_null());
        assert!(json.get("extracted_at").is_some());
    }

    #[test]
    fn persisted_profile_tolerates_sparse_profile_data() {
        let row: PersistedProfile = serde_json::from_value(serde_json::json!({
            "id": 7,
            "profile_data": { "name": "Ada" },
            "card_url": null
        }))
        .unwrap();
        assert_eq!(row.profile_data.name.as_deref(), Some("Ada"));
        assert!(row.profile_data.birthday.is_none());
        assert!(row.is_pending());
    }

    #[test]
    fn posted_marker_clears_pending() {
        let row = PersistedProfile {
            id: 1,
            profile_data: ProfileData::default(),
            card_url: Some("true".to_string()),
        };
        assert!(!row.is_pending());
    }
}
