//! Direct Postgres backend over the same table shape.

use std::time::Duration;

use async_trait::async_trait;
use bday_core::{NewProfile, PersistedProfile, ProfileData};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::{validate_table_name, ProfileStore, StoreError};

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/bday-store/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: i64,
    profile_data: Json<ProfileData>,
    card_url: Option<String>,
}

impl From<ProfileRow> for PersistedProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            profile_data: row.profile_data.0,
            card_url: row.card_url,
        }
    }
}

pub struct PgStore {
    pool: PgPool,
    table: String,
}

impl PgStore {
    /// Wraps an existing pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTableName`] if `table` is not a plain
    /// identifier.
    pub fn new(pool: PgPool, table: &str) -> Result<Self, StoreError> {
        validate_table_name(table)?;
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    /// Connects a small pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTableName`] or [`StoreError::Sqlx`].
    pub async fn connect(database_url: &str, table: &str) -> Result<Self, StoreError> {
        validate_table_name(table)?;
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect(database_url)
            .await?;
        Self::new(pool, table)
    }

    /// Applies pending migrations from the workspace `migrations/` directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Migration`] if any migration fails.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    async fn select_where(
        &self,
        field: Option<(&str, &str)>,
    ) -> Result<Vec<PersistedProfile>, StoreError> {
        let rows = match field {
            None => {
                let sql = format!(
                    "SELECT id, profile_data, card_url FROM {} ORDER BY id",
                    self.table
                );
                sqlx::query_as::<_, ProfileRow>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
            Some((key, value)) => {
                let sql = format!(
                    "SELECT id, profile_data, card_url FROM {} \
                     WHERE profile_data->>($1::text) = $2 \
                     ORDER BY id",
                    self.table
                );
                sqlx::query_as::<_, ProfileRow>(&sql)
                    .bind(key)
                    .bind(value)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.into_iter().map(PersistedProfile::from).collect())
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn select_all(&self) -> Result<Vec<PersistedProfile>, StoreError> {
        self.select_where(None).await
    }

    async fn select_by_profile_url(
        &self,
        profile_url: &str,
    ) -> Result<Vec<PersistedProfile>, StoreError> {
        self.select_where(Some(("profileUrl", profile_url))).await
    }

    async fn select_by_name(&self, name: &str) -> Result<Vec<PersistedProfile>, StoreError> {
        self.select_where(Some(("name", name))).await
    }

    async fn insert(&self, profile: &NewProfile) -> Result<(), StoreError> {
        let sql = format!("INSERT INTO {} (profile_data) VALUES ($1)", self.table);
        sqlx::query(&sql)
            .bind(Json(&profile.profile_data))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_card_url(&self, id: i64, card_url: &str) -> Result<(), StoreError> {
        let sql = format!("UPDATE {} SET card_url = $1 WHERE id = $2", self.table);
        let result = sqlx::query(&sql)
            .bind(card_url)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
