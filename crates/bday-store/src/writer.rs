//! Duplicate-aware insertion of extracted birthdays.

use bday_core::{BirthdayRecord, NewProfile, PersistedProfile, ProfileData};
use chrono::{DateTime, Utc};

use crate::ProfileStore;

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Inserted,
    /// Already stored, or no name and no profile URL.
    Skipped,
    Failed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistSummary {
    pub inserted: usize,
    pub failed: usize,
    pub skipped: usize,
    /// The run stopped before every record was looked at.
    pub interrupted: bool,
}

impl PersistSummary {
    pub fn record(&mut self, outcome: PersistOutcome) {
        match outcome {
            PersistOutcome::Inserted => self.inserted += 1,
            PersistOutcome::Skipped => self.skipped += 1,
            PersistOutcome::Failed => self.failed += 1,
        }
    }

    #[must_use]
    pub fn processed(&self) -> usize {
        self.inserted + self.skipped + self.failed
    }
}

/// Same person (URL or name) with the same birthday (day and month, or both
/// unknown).
#[must_use]
pub fn is_duplicate(record: &BirthdayRecord, existing: &ProfileData) -> bool {
    let same_url = record.profile_url.is_some() && record.profile_url == existing.profile_url;
    let same_name = record.name.is_some() && record.name == existing.name;
    let same_birthday = match (&record.birthday, &existing.birthday) {
        (Some(a), Some(b)) => a.same_day_as(b),
        (None, None) => true,
        _ => false,
    };
    (same_url || same_name) && same_birthday
}

/// Writes each record that is not already stored. Every per-record failure is
/// counted and the loop continues.
///
/// `should_stop` is checked before each record; once it returns `true` the
/// partial summary comes back with `interrupted` set.
pub async fn persist_new_birthdays<S, F>(
    store: &S,
    records: &[BirthdayRecord],
    now: DateTime<Utc>,
    should_stop: F,
) -> PersistSummary
where
    S: ProfileStore + ?Sized,
    F: Fn() -> bool,
{
    let mut summary = PersistSummary::default();
    for record in records {
        if should_stop() {
            summary.interrupted = true;
            tracing::warn!(
                inserted = summary.inserted,
                skipped = summary.skipped,
                failed = summary.failed,
                remaining = records.len() - summary.processed(),
                "stopping before all records were written"
            );
            return summary;
        }
        summary.record(persist_record(store, record, now).await);
    }
    tracing::info!(
        inserted = summary.inserted,
        skipped = summary.skipped,
        failed = summary.failed,
        "birthday persistence complete"
    );
    summary
}

/// Checks one record against the store and inserts it if new.
pub async fn persist_record<S>(
    store: &S,
    record: &BirthdayRecord,
    now: DateTime<Utc>,
) -> PersistOutcome
where
    S: ProfileStore + ?Sized,
{
    if !record.has_identity() {
        tracing::debug!("skipping record without name or profile URL");
        return PersistOutcome::Skipped;
    }

    let candidates = existing_candidates(store, record).await;
    if candidates
        .iter()
        .any(|row| is_duplicate(record, &row.profile_data))
    {
        tracing::debug!(name = ?record.name, "already stored");
        return PersistOutcome::Skipped;
    }

    let profile = NewProfile {
        profile_data: ProfileData::from_record(record, now),
    };
    match store.insert(&profile).await {
        Ok(()) => {
            tracing::info!(name = ?record.name, profile_url = ?record.profile_url, "inserted birthday");
            PersistOutcome::Inserted
        }
        Err(e) => {
            tracing::warn!(name = ?record.name, error = %e, "failed to insert birthday");
            PersistOutcome::Failed
        }
    }
}

/// Rows matching by profile URL, or by name when the URL lookup finds
/// nothing or fails.
async fn existing_candidates<S>(store: &S, record: &BirthdayRecord) -> Vec<PersistedProfile>
where
    S: ProfileStore + ?Sized,
{
    if let Some(url) = record.profile_url.as_deref() {
        match store.select_by_profile_url(url).await {
            Ok(rows) if !rows.is_empty() => return rows,
            Ok(_) => {}
            Err(e) => tracing::warn!(profile_url = url, error = %e, "lookup by profile URL failed"),
        }
    }
    if let Some(name) = record.name.as_deref() {
        match store.select_by_name(name).await {
            Ok(rows) => return rows,
            Err(e) => tracing::warn!(name, error = %e, "lookup by name failed"),
        }
    }
    Vec::new()
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod tests;
