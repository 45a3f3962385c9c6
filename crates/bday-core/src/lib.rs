pub mod app_config;
pub mod birthday;
pub mod config;
pub mod month;
pub mod session;

pub use app_config::{AppConfig, StoreBackend};
pub use birthday::{Birthday, BirthdayRecord, NewProfile, PersistedProfile, ProfileData};
pub use config::{is_valid_table_name, load_app_config, load_app_config_from_env};
pub use month::resolve_month_label;
pub use session::{RawCapturedSession, SessionContext, SessionIncomplete};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
