//! Persistence for extracted birthdays.
//!
//! All backends store rows shaped `{id, profile_data, card_url}` in one table
//! (`birthdays` by default) and expose the same four primitives through
//! [`ProfileStore`]. The duplicate-aware insert logic lives in [`writer`] and
//! only talks to the trait.

pub mod error;
pub mod memory;
pub mod pg;
pub mod rest;
pub mod writer;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use pg::PgStore;
pub use rest::RestStore;
pub use writer::{is_duplicate, persist_new_birthdays, persist_record, PersistOutcome, PersistSummary};

use async_trait::async_trait;
use bday_core::{NewProfile, PersistedProfile};

/// The record API every backend provides.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Every row, in id order.
    async fn select_all(&self) -> Result<Vec<PersistedProfile>, StoreError>;

    /// Rows whose `profile_data.profileUrl` equals `profile_url`.
    async fn select_by_profile_url(
        &self,
        profile_url: &str,
    ) -> Result<Vec<PersistedProfile>, StoreError>;

    /// Rows whose `profile_data.name` equals `name`.
    async fn select_by_name(&self, name: &str) -> Result<Vec<PersistedProfile>, StoreError>;

    async fn insert(&self, profile: &NewProfile) -> Result<(), StoreError>;

    /// Sets `card_url` on one row.
    ///
    /// Returns [`StoreError::NotFound`] when no row has that id.
    async fn update_card_url(&self, id: i64, card_url: &str) -> Result<(), StoreError>;
}

pub(crate) fn validate_table_name(table: &str) -> Result<(), StoreError> {
    if bday_core::is_valid_table_name(table) {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(table.to_string()))
    }
}
