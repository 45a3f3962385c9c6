//! Page discovery through the debugging bridge's HTTP endpoint.

use serde::Deserialize;

use crate::error::SessionError;

/// One entry of `GET /json/list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugTarget {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Absent when another client is already attached to the target.
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

/// Lists the bridge's debuggable targets.
///
/// # Errors
///
/// Returns [`SessionError::Discovery`] if the bridge is unreachable, answers
/// with a non-2xx status, or returns something other than a target list.
pub async fn list_targets(
    http: &reqwest::Client,
    bridge_endpoint: &str,
) -> Result<Vec<DebugTarget>, SessionError> {
    let url = format!("{}/json/list", bridge_endpoint.trim_end_matches('/'));
    let targets = http
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .json::<Vec<DebugTarget>>()
        .await?;
    tracing::debug!(count = targets.len(), "listed DevTools targets");
    Ok(targets)
}

/// The first open page, skipping service workers, extensions and iframes.
#[must_use]
pub fn first_page(targets: &[DebugTarget]) -> Option<&DebugTarget> {
    targets.iter().find(|t| t.kind == "page")
}
