//! The `pending` and `mark-posted` commands, the store side of greeting
//! posting.

use bday_core::PersistedProfile;
use bday_store::ProfileStore;

use crate::fetch::birthday_label;

/// Rows still awaiting a greeting, in id order.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub(crate) async fn pending_profiles<S>(store: &S) -> anyhow::Result<Vec<PersistedProfile>>
where
    S: ProfileStore + ?Sized,
{
    let rows = store.select_all().await?;
    let total = rows.len();
    let pending: Vec<PersistedProfile> = rows.into_iter().filter(PersistedProfile::is_pending).collect();
    tracing::debug!(total, pending = pending.len(), "loaded pending greetings");
    Ok(pending)
}

pub(crate) fn print_pending(rows: &[PersistedProfile]) {
    if rows.is_empty() {
        println!("no pending greetings");
        return;
    }
    for row in rows {
        let data = &row.profile_data;
        println!(
            "{}\t{}\t{}\t{}",
            row.id,
            birthday_label(data.birthday),
            data.name.as_deref().unwrap_or("-"),
            data.profile_url.as_deref().unwrap_or("-"),
        );
    }
}

/// Records that a greeting went out for row `id`.
///
/// # Errors
///
/// Returns an error if no row has that id or the update fails.
pub(crate) async fn mark_posted<S>(store: &S, id: i64, card_url: &str) -> anyhow::Result<()>
where
    S: ProfileStore + ?Sized,
{
    store.update_card_url(id, card_url).await?;
    tracing::info!(id, card_url, "marked greeting as posted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use bday_core::{PersistedProfile, ProfileData};
    use bday_store::{MemoryStore, StoreError};

    use super::*;

    fn row(id: i64, name: &str, card_url: Option<&str>) -> PersistedProfile {
        PersistedProfile {
            id,
            profile_data: ProfileData {
                name: Some(name.to_string()),
                ..ProfileData::default()
            },
            card_url: card_url.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn pending_excludes_posted_rows_only() {
        let store = MemoryStore::with_rows(vec![
            row(1, "Ada", Some("true")),
            row(2, "Grace", None),
            row(3, "Linus", Some("https://cdn.test/card.png")),
        ]);

        let pending = pending_profiles(&store).await.unwrap();

        let ids: Vec<i64> = pending.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn mark_posted_removes_row_from_pending() {
        let store = MemoryStore::with_rows(vec![row(1, "Ada", None)]);

        mark_posted(&store, 1, PersistedProfile::POSTED_MARKER)
            .await
            .unwrap();

        assert!(pending_profiles(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_posted_unknown_id_fails() {
        let store = MemoryStore::new();

        let err = mark_posted(&store, 99, "true").await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound(99))
        ));
    }
}
