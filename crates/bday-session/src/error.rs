use std::time::Duration;

use thiserror::Error;

/// Errors raised while talking to the debugging bridge.
///
/// A capture that simply sees no matching request is not an error; see
/// [`crate::capture_session`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The bridge's HTTP discovery endpoint could not be reached or decoded.
    #[error("debugger discovery failed: {0}")]
    Discovery(#[from] reqwest::Error),

    /// The WebSocket handshake with a page target failed.
    #[error("failed to connect to DevTools at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// A CDP command returned an error response.
    #[error("CDP error {code}: {message}")]
    CdpError { code: i64, message: String },

    /// A CDP command got no response in time.
    #[error("CDP command '{method}' timed out after {duration:?}")]
    Timeout { method: String, duration: Duration },

    /// Serialization failure or a dropped connection.
    #[error("CDP protocol error: {detail}")]
    Protocol { detail: String },
}
