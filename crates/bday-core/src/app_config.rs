use std::path::PathBuf;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgREST-style record API (e.g. Supabase).
    Rest,
    /// Direct Postgres connection via `DATABASE_URL`.
    Postgres,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Rest => write!(f, "rest"),
            StoreBackend::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub store_url: Option<String>,
    pub store_api_key: Option<String>,
    pub store_table: String,
    pub database_url: Option<String>,
    pub log_level: String,
    pub debugger_url: String,
    pub capture_page_url: String,
    pub capture_timeout_secs: u64,
    pub capture_settle_ms: u64,
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub stop_file: PathBuf,
}

impl AppConfig {
    /// `(base_url, api_key)` for the REST backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] naming the first unset variable.
    pub fn rest_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let url = required(self.store_url.as_deref(), "BDAY_STORE_URL")?;
        let api_key = required(self.store_api_key.as_deref(), "BDAY_STORE_API_KEY")?;
        Ok((url, api_key))
    }

    /// Connection string for the Postgres backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] if `DATABASE_URL` is unset.
    pub fn database_url(&self) -> Result<&str, ConfigError> {
        required(self.database_url.as_deref(), "DATABASE_URL")
    }
}

fn required<'a>(value: Option<&'a str>, var: &str) -> Result<&'a str, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("store_backend", &self.store_backend)
            .field("store_url", &self.store_url)
            .field(
                "store_api_key",
                &self.store_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("store_table", &self.store_table)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("log_level", &self.log_level)
            .field("debugger_url", &self.debugger_url)
            .field("capture_page_url", &self.capture_page_url)
            .field("capture_timeout_secs", &self.capture_timeout_secs)
            .field("capture_settle_ms", &self.capture_settle_ms)
            .field("api_url", &self.api_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .field("stop_file", &self.stop_file)
            .finish()
    }
}
