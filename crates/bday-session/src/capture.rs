//! Session capture: observe one authenticated API request and harvest its
//! tokens and cookies.

use std::time::Duration;

use bday_core::RawCapturedSession;
use serde_json::{json, Value};

use crate::cdp::{CdpClient, EventStream};
use crate::error::SessionError;
use crate::form::extract_form_value;
use crate::targets::{first_page, list_targets};

/// Substring identifying the upstream API request among page traffic.
pub const DEFAULT_API_PATH_MARKER: &str = "facebook.com/api/graphql";

const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Parameters of one capture run.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Debugging bridge HTTP endpoint, e.g. `http://localhost:9222`.
    pub bridge_endpoint: String,
    /// Page whose load triggers the API request.
    pub target_page_url: String,
    pub api_path_marker: String,
    /// Bound on navigation plus the wait for a matching request.
    pub timeout: Duration,
    /// Grace period after the match before the connection is closed.
    pub settle_delay: Duration,
}

impl CaptureConfig {
    #[must_use]
    pub fn new(bridge_endpoint: impl Into<String>, target_page_url: impl Into<String>) -> Self {
        Self {
            bridge_endpoint: bridge_endpoint.into(),
            target_page_url: target_page_url.into(),
            api_path_marker: DEFAULT_API_PATH_MARKER.to_string(),
            timeout: DEFAULT_CAPTURE_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Attaches to the first open page, navigates it, and harvests session
/// material from the first matching API request.
///
/// Returns `Ok(None)` when the bridge lists no page or no matching request
/// is seen within `config.timeout`. Fields the browser would not give up
/// are `None` in the returned session; validating completeness is left to
/// `SessionContext::try_from`.
///
/// # Errors
///
/// - [`SessionError::Discovery`] if the bridge's `/json/list` is unreachable.
/// - [`SessionError::ConnectionFailed`] if the WebSocket handshake fails.
/// - Any command error from enabling the `Network` domain.
pub async fn capture_session(
    config: &CaptureConfig,
) -> Result<Option<RawCapturedSession>, SessionError> {
    let http = reqwest::Client::builder()
        .timeout(DISCOVERY_TIMEOUT)
        .build()?;
    let targets = list_targets(&http, &config.bridge_endpoint).await?;

    let Some(page) = first_page(&targets) else {
        tracing::warn!(
            bridge = %config.bridge_endpoint,
            targets = targets.len(),
            "no open page to attach to"
        );
        return Ok(None);
    };
    let Some(ws_url) = page.web_socket_debugger_url.as_deref() else {
        tracing::warn!(page_id = %page.id, "page exposes no WebSocket debugger URL");
        return Ok(None);
    };

    let (client, mut events) = CdpClient::connect(ws_url).await?;
    let outcome = capture_on_page(&client, &mut events, config).await;
    client.close().await;
    outcome
}

async fn capture_on_page(
    client: &CdpClient,
    events: &mut EventStream,
    config: &CaptureConfig,
) -> Result<Option<RawCapturedSession>, SessionError> {
    let waited = tokio::time::timeout(config.timeout, async {
        client.enable_domain("Network").await?;
        Ok::<_, SessionError>(navigate_and_wait(client, events, config).await)
    })
    .await;

    let target = match waited {
        Ok(Ok(Some(target))) => target,
        Ok(Ok(None)) => {
            tracing::warn!("DevTools connection closed before a matching request was seen");
            return Ok(None);
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            tracing::warn!(
                timeout_secs = config.timeout.as_secs_f64(),
                marker = %config.api_path_marker,
                "no matching API request observed before timeout"
            );
            return Ok(None);
        }
    };

    let session = harvest(client, &target).await;
    tracing::info!(
        request_id = %target.request_id,
        missing = ?session.missing_fields(),
        "session captured"
    );

    tokio::time::sleep(config.settle_delay).await;
    Ok(Some(session))
}

/// Runs `Page.navigate` alongside the event watch. Resolves with the first
/// matching request, or `None` if the event stream ends.
async fn navigate_and_wait(
    client: &CdpClient,
    events: &mut EventStream,
    config: &CaptureConfig,
) -> Option<TargetRequest> {
    let navigate = async {
        match client
            .send_command("Page.navigate", json!({ "url": config.target_page_url }))
            .await
        {
            Ok(_) => tracing::debug!(url = %config.target_page_url, "navigation committed"),
            Err(e) => tracing::warn!(error = %e, "navigation failed, still watching traffic"),
        }
        std::future::pending::<()>().await;
    };

    tokio::select! {
        () = navigate => None,
        found = wait_for_target_request(events, &config.api_path_marker) => found,
    }
}

async fn wait_for_target_request(events: &mut EventStream, marker: &str) -> Option<TargetRequest> {
    while let Some(event) = events.recv().await {
        if event.method != "Network.requestWillBeSent" {
            continue;
        }
        if let Some(target) = TargetRequest::from_event(&event.params, marker) {
            tracing::info!(request_id = %target.request_id, url = %target.url, "matched API request");
            return Some(target);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Harvesting
// ---------------------------------------------------------------------------

/// The intercepted request, as far as `requestWillBeSent` describes it.
#[derive(Debug, Clone, PartialEq)]
struct TargetRequest {
    request_id: String,
    url: String,
    headers: Value,
    inline_post_data: Option<String>,
}

impl TargetRequest {
    /// `Some` for a `POST` whose URL contains `marker`.
    fn from_event(params: &Value, marker: &str) -> Option<Self> {
        let request = params.get("request")?;
        let url = request.get("url")?.as_str()?;
        let is_post = request
            .get("method")
            .and_then(Value::as_str)
            .is_some_and(|m| m.eq_ignore_ascii_case("POST"));
        if !is_post || !url.contains(marker) {
            return None;
        }
        Some(Self {
            request_id: params.get("requestId")?.as_str()?.to_string(),
            url: url.to_string(),
            headers: request.get("headers").cloned().unwrap_or(Value::Null),
            inline_post_data: request
                .get("postData")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    fn header(&self, name: &str) -> Option<String> {
        header_value(&self.headers, name)
    }
}

async fn harvest(client: &CdpClient, target: &TargetRequest) -> RawCapturedSession {
    let body = request_body(client, target).await;
    let form = |key: &str| body.as_deref().and_then(|b| extract_form_value(b, key));

    RawCapturedSession {
        user_id: form("__user"),
        app_token: form("fb_dtsg"),
        secondary_token: form("jazoest"),
        security_token: target.header("x-fb-lsd"),
        cookie_header: cookies_for(client, &target.url).await,
    }
}

/// `Network.getRequestPostData`, falling back to the body inlined in the
/// event. Large bodies are often only available through the command.
async fn request_body(client: &CdpClient, target: &TargetRequest) -> Option<String> {
    let fetched = client
        .send_command(
            "Network.getRequestPostData",
            json!({ "requestId": target.request_id }),
        )
        .await;
    match fetched {
        Ok(result) => {
            if let Some(body) = result.get("postData").and_then(Value::as_str) {
                return Some(body.to_string());
            }
        }
        Err(e) => {
            tracing::debug!(
                request_id = %target.request_id,
                error = %e,
                "post data unavailable, using inline body"
            );
        }
    }
    target.inline_post_data.clone()
}

async fn cookies_for(client: &CdpClient, url: &str) -> Option<String> {
    match client
        .send_command("Network.getCookies", json!({ "urls": [url] }))
        .await
    {
        Ok(result) => cookie_header_from(&result),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read cookies");
            None
        }
    }
}

/// Renders a `Network.getCookies` result as a `Cookie` header value.
fn cookie_header_from(result: &Value) -> Option<String> {
    let pairs: Vec<String> = result
        .get("cookies")?
        .as_array()?
        .iter()
        .filter_map(|c| {
            let name = c.get("name")?.as_str()?;
            let value = c.get("value")?.as_str()?;
            Some(format!("{name}={value}"))
        })
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// Case-insensitive header lookup on a CDP `Headers` object.
fn header_value(headers: &Value, name: &str) -> Option<String> {
    headers
        .as_object()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, value)| value.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(method: &str, url: &str) -> Value {
        json!({
            "requestId": "1000.42",
            "request": {
                "url": url,
                "method": method,
                "headers": {"X-FB-LSD": "lsd-token", "Content-Type": "application/x-www-form-urlencoded"},
                "postData": "fb_dtsg=inline"
            }
        })
    }

    #[test]
    fn matching_post_is_recognised() {
        let target = TargetRequest::from_event(
            &event("POST", "https://www.facebook.com/api/graphql/"),
            DEFAULT_API_PATH_MARKER,
        )
        .unwrap();
        assert_eq!(target.request_id, "1000.42");
        assert_eq!(target.inline_post_data.as_deref(), Some("fb_dtsg=inline"));
    }

    #[test]
    fn get_requests_and_other_urls_are_ignored() {
        assert!(TargetRequest::from_event(
            &event("GET", "https://www.facebook.com/api/graphql/"),
            DEFAULT_API_PATH_MARKER,
        )
        .is_none());
        assert!(TargetRequest::from_event(
            &event("POST", "https://www.facebook.com/ajax/bz"),
            DEFAULT_API_PATH_MARKER,
        )
        .is_none());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let target = TargetRequest::from_event(
            &event("POST", "https://www.facebook.com/api/graphql/"),
            DEFAULT_API_PATH_MARKER,
        )
        .unwrap();
        assert_eq!(target.header("x-fb-lsd").as_deref(), Some("lsd-token"));
        assert_eq!(target.header("x-missing"), None);
    }

    #[test]
    fn cookies_render_as_header() {
        let result = json!({"cookies": [
            {"name": "c_user", "value": "100001", "domain": ".facebook.com"},
            {"name": "xs", "value": "abc"}
        ]});
        assert_eq!(
            cookie_header_from(&result).as_deref(),
            Some("c_user=100001; xs=abc")
        );
    }

    #[test]
    fn empty_cookie_jar_is_none() {
        assert_eq!(cookie_header_from(&json!({"cookies": []})), None);
        assert_eq!(cookie_header_from(&json!({})), None);
    }

    #[test]
    fn config_defaults() {
        let config = CaptureConfig::new("http://localhost:9222", "https://example.test/");
        assert_eq!(config.api_path_marker, DEFAULT_API_PATH_MARKER);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.settle_delay, Duration::from_secs(2));
    }
}
