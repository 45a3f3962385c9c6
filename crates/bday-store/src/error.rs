use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned HTTP {status} for {url}: {body}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("invalid store URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("no row with id {0}")]
    NotFound(i64),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Failure injected by [`crate::MemoryStore`].
    #[cfg(any(test, feature = "test-util"))]
    #[error("{0}")]
    Injected(String),
}
