//! Authenticated session material harvested from the browser.
//!
//! A [`RawCapturedSession`] is whatever the capture step managed to observe;
//! any field may be missing after a degraded capture. [`SessionContext`] is
//! the validated form that request builders accept.

use thiserror::Error;

/// Session fields exactly as observed on the intercepted request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RawCapturedSession {
    pub user_id: Option<String>,
    /// `fb_dtsg` form token.
    pub app_token: Option<String>,
    /// `jazoest` form token.
    pub secondary_token: Option<String>,
    /// `lsd` token, sent as a request header.
    pub security_token: Option<String>,
    pub cookie_header: Option<String>,
}

impl RawCapturedSession {
    /// Names of the required fields that are absent or empty.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("user_id", &self.user_id),
            ("fb_dtsg", &self.app_token),
            ("lsd", &self.security_token),
            ("cookie", &self.cookie_header),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(str::is_empty))
        .map(|(name, _)| name)
        .collect()
    }
}

impl std::fmt::Debug for RawCapturedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("RawCapturedSession")
            .field("user_id", &self.user_id)
            .field("app_token", &redact(&self.app_token))
            .field("secondary_token", &redact(&self.secondary_token))
            .field("security_token", &redact(&self.security_token))
            .field("cookie_header", &redact(&self.cookie_header))
            .finish()
    }
}

/// Returned when a captured session lacks a field required to replay the
/// upstream request.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("captured session is incomplete, missing: {}", missing.join(", "))]
pub struct SessionIncomplete {
    pub missing: Vec<&'static str>,
}

/// A complete set of credentials for one process run.
///
/// Built once from a capture and passed by reference to every request builder.
/// Tokens rotate upstream, so a context is never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: String,
    pub app_token: String,
    pub secondary_token: String,
    pub security_token: String,
    pub cookie_header: String,
}

impl TryFrom<RawCapturedSession> for SessionContext {
    type Error = SessionIncomplete;

    fn try_from(raw: RawCapturedSession) -> Result<Self, Self::Error> {
        let missing = raw.missing_fields();
        if !missing.is_empty() {
            return Err(SessionIncomplete { missing });
        }
        // missing_fields() has checked the four required fields above.
        Ok(Self {
            user_id: raw.user_id.unwrap_or_default(),
            app_token: raw.app_token.unwrap_or_default(),
            secondary_token: raw.secondary_token.unwrap_or_default(),
            security_token: raw.security_token.unwrap_or_default(),
            cookie_header: raw.cookie_header.unwrap_or_default(),
        })
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("user_id", &self.user_id)
            .field("app_token", &"[redacted]")
            .field("secondary_token", &"[redacted]")
            .field("security_token", &"[redacted]")
            .field("cookie_header", &"[redacted]")
            .finish()
    }
}
