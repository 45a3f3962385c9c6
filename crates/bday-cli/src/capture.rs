//! The `capture` command: run session capture alone and report what the
//! browser handed over, without printing token values.

use bday_core::{AppConfig, RawCapturedSession};
use bday_session::capture_session;

use crate::fetch::capture_config;

/// # Errors
///
/// Returns an error if the debugging bridge or the page cannot be reached.
pub(crate) async fn run_capture(config: &AppConfig) -> anyhow::Result<bool> {
    let Some(raw) = capture_session(&capture_config(config)).await? else {
        println!("no matching request observed at {}", config.debugger_url);
        return Ok(false);
    };
    for line in capture_report(&raw) {
        println!("{line}");
    }
    Ok(raw.missing_fields().is_empty())
}

fn capture_report(raw: &RawCapturedSession) -> Vec<String> {
    let status = |value: &Option<String>| match value.as_deref() {
        Some(v) if !v.is_empty() => "captured",
        _ => "missing",
    };
    vec![
        format!("user_id  {}", raw.user_id.as_deref().unwrap_or("missing")),
        format!("fb_dtsg  {}", status(&raw.app_token)),
        format!("jazoest  {}", status(&raw.secondary_token)),
        format!("lsd      {}", status(&raw.security_token)),
        format!("cookie   {}", status(&raw.cookie_header)),
    ]
}
