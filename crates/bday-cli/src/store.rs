use anyhow::Context;
use bday_core::{AppConfig, StoreBackend};
use bday_store::{PgStore, ProfileStore, RestStore};

/// Opens the configured backend. The Postgres backend is migrated first.
///
/// # Errors
///
/// Returns an error if a required connection setting is missing or the
/// backend cannot be reached.
pub(crate) async fn open_store(config: &AppConfig) -> anyhow::Result<Box<dyn ProfileStore>> {
    match config.store_backend {
        StoreBackend::Rest => {
            let (url, api_key) = config.rest_credentials()?;
            let store = RestStore::new(url, api_key, &config.store_table, config.request_timeout_secs)?;
            tracing::debug!(url, table = %config.store_table, "using REST store");
            Ok(Box::new(store))
        }
        StoreBackend::Postgres => {
            let database_url = config.database_url()?;
            let store = PgStore::connect(database_url, &config.store_table)
                .await
                .context("connecting to Postgres")?;
            store.run_migrations().await.context("running migrations")?;
            tracing::debug!(table = %config.store_table, "using Postgres store");
            Ok(Box::new(store))
        }
    }
}
