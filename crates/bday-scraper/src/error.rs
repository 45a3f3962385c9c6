use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429. `retry_after_secs` is the server's `Retry-After`, when sent
    /// as a number of seconds.
    #[error("rate limited by upstream")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid API URL \"{url}\": {reason}")]
    InvalidApiUrl { url: String, reason: String },

    #[error("month {0} is outside 1..=12")]
    InvalidMonth(u32),
}
