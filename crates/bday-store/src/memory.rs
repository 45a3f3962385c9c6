//! In-process store for tests and offline runs.
//!
//! Failure injection is only compiled for this crate's tests or with the
//! `test-util` feature.

use std::sync::Mutex;

use async_trait::async_trait;
use bday_core::{NewProfile, PersistedProfile, ProfileData};

use crate::{ProfileStore, StoreError};

#[derive(Default)]
struct Inner {
    rows: Vec<PersistedProfile>,
    next_id: i64,
    #[cfg(any(test, feature = "test-util"))]
    fail_inserts_named: Vec<String>,
    #[cfg(any(test, feature = "test-util"))]
    fail_profile_url_lookups: bool,
}

/// A `Vec`-backed [`ProfileStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store; ids continue after the highest seeded id.
    #[must_use]
    pub fn with_rows(rows: Vec<PersistedProfile>) -> Self {
        let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0);
        Self {
            inner: Mutex::new(Inner {
                rows,
                next_id,
                ..Inner::default()
            }),
        }
    }

    /// Makes every insert of a profile with this name fail.
    #[cfg(any(test, feature = "test-util"))]
    #[must_use]
    pub fn failing_inserts_for(self, name: &str) -> Self {
        self.lock().fail_inserts_named.push(name.to_string());
        self
    }

    /// Makes every `select_by_profile_url` call fail.
    #[cfg(any(test, feature = "test-util"))]
    #[must_use]
    pub fn failing_profile_url_lookups(self) -> Self {
        self.lock().fail_profile_url_lookups = true;
        self
    }

    /// Snapshot of all rows.
    #[must_use]
    pub fn rows(&self) -> Vec<PersistedProfile> {
        self.lock().rows.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-call; the data is
        // still usable.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn select(&self, pred: impl Fn(&ProfileData) -> bool) -> Vec<PersistedProfile> {
        self.lock()
            .rows
            .iter()
            .filter(|row| pred(&row.profile_data))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn select_all(&self) -> Result<Vec<PersistedProfile>, StoreError> {
        Ok(self.lock().rows.clone())
    }

    async fn select_by_profile_url(
        &self,
        profile_url: &str,
    ) -> Result<Vec<PersistedProfile>, StoreError> {
        #[cfg(any(test, feature = "test-util"))]
        if self.lock().fail_profile_url_lookups {
            return Err(StoreError::Injected("profile URL lookup failed".to_string()));
        }
        Ok(self.select(|data| data.profile_url.as_deref() == Some(profile_url)))
    }

    async fn select_by_name(&self, name: &str) -> Result<Vec<PersistedProfile>, StoreError> {
        Ok(self.select(|data| data.name.as_deref() == Some(name)))
    }

    async fn insert(&self, profile: &NewProfile) -> Result<(), StoreError> {
        let mut inner = self.lock();
        #[cfg(any(test, feature = "test-util"))]
        if let Some(name) = profile.profile_data.name.as_deref() {
            if inner.fail_inserts_named.iter().any(|n| n == name) {
                return Err(StoreError::Injected(format!("insert of {name} failed")));
            }
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.push(PersistedProfile {
            id,
            profile_data: profile.profile_data.clone(),
            card_url: None,
        });
        Ok(())
    }

    async fn update_card_url(&self, id: i64, card_url: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let row = inner
            .rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(StoreError::NotFound(id))?;
        row.card_url = Some(card_url.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str) -> NewProfile {
        NewProfile {
            profile_data: ProfileData {
                name: Some(name.to_string()),
                profile_url: Some(format!("https://fb.test/{name}")),
                birthday: None,
                extracted_at: None,
            },
        }
    }

    #[tokio::test]
    async fn behaves_as_a_plain_backend_without_injected_failures() {
        let store = MemoryStore::new();
        store.insert(&profile("ada")).await.unwrap();
        store.insert(&profile("grace")).await.unwrap();

        let by_url = store.select_by_profile_url("https://fb.test/ada").await.unwrap();
        assert_eq!(by_url.len(), 1);
        assert_eq!(by_url[0].id, 1);

        store.update_card_url(2, "true").await.unwrap();
        assert!(!store.rows()[1].is_pending());
        assert!(matches!(
            store.update_card_url(9, "true").await,
            Err(StoreError::NotFound(9))
        ));
    }

    #[tokio::test]
    async fn injected_insert_failure_only_hits_the_named_profile() {
        let store = MemoryStore::new().failing_inserts_for("ada");

        assert!(matches!(
            store.insert(&profile("ada")).await,
            Err(StoreError::Injected(_))
        ));
        store.insert(&profile("grace")).await.unwrap();
        assert_eq!(store.rows().len(), 1);
    }
}
