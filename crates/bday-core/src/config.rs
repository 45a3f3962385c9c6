use crate::app_config::{AppConfig, StoreBackend};
use crate::ConfigError;

pub const DEFAULT_DEBUGGER_URL: &str = "http://localhost:9222";
pub const DEFAULT_CAPTURE_PAGE_URL: &str =
    r#"https://www.facebook.com/events/birthdays/?acontext={"source":"birthdays"}"#;
pub const DEFAULT_API_URL: &str = "https://www.facebook.com/api/graphql/";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let store_backend = parse_store_backend(&or_default("BDAY_STORE_BACKEND", "rest"))?;

    // Checked when a store is opened, so `capture` runs without them.
    let store_url = optional("BDAY_STORE_URL");
    let store_api_key = optional("BDAY_STORE_API_KEY");
    let database_url = optional("DATABASE_URL");

    let store_table = or_default("BDAY_STORE_TABLE", "birthdays");
    if !is_valid_table_name(&store_table) {
        return Err(ConfigError::InvalidEnvVar {
            var: "BDAY_STORE_TABLE".to_string(),
            reason: format!("\"{store_table}\" is not a plain identifier"),
        });
    }

    let log_level = or_default("BDAY_LOG_LEVEL", "info");
    let debugger_url = or_default("BDAY_DEBUGGER_URL", DEFAULT_DEBUGGER_URL);
    let capture_page_url = or_default("BDAY_CAPTURE_PAGE_URL", DEFAULT_CAPTURE_PAGE_URL);
    let capture_timeout_secs = parse_u64("BDAY_CAPTURE_TIMEOUT_SECS", "30")?;
    let capture_settle_ms = parse_u64("BDAY_CAPTURE_SETTLE_MS", "2000")?;

    let api_url = or_default("BDAY_API_URL", DEFAULT_API_URL);
    let request_timeout_secs = parse_u64("BDAY_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("BDAY_USER_AGENT", DEFAULT_USER_AGENT);
    let max_retries = parse_u32("BDAY_MAX_RETRIES", "2")?;
    let retry_backoff_base_secs = parse_u64("BDAY_RETRY_BACKOFF_BASE_SECS", "2")?;

    let stop_file = PathBuf::from(or_default("BDAY_STOP_FILE", "./EMERGENCY_STOP.txt"));

    Ok(AppConfig {
        store_backend,
        store_url,
        store_api_key,
        store_table,
        database_url,
        log_level,
        debugger_url,
        capture_page_url,
        capture_timeout_secs,
        capture_settle_ms,
        api_url,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_secs,
        stop_file,
    })
}

fn parse_store_backend(s: &str) -> Result<StoreBackend, ConfigError> {
    match s {
        "rest" => Ok(StoreBackend::Rest),
        "postgres" => Ok(StoreBackend::Postgres),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BDAY_STORE_BACKEND".to_string(),
            reason: format!("expected \"rest\" or \"postgres\", got \"{other}\""),
        }),
    }
}

/// Table names are interpolated into SQL and REST paths, so only plain
/// lowercase identifiers are accepted. Postgres folds unquoted names to
/// lowercase, which keeps both backends addressing the same table.
#[must_use]
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
