//! Token extraction from raw `application/x-www-form-urlencoded` bodies.
//!
//! Each key is looked up on its own with a `key=value` pattern instead of
//! decoding the whole form, so unknown or malformed neighbouring fields never
//! affect the result. Values are returned still percent-encoded, ready to be
//! placed back into a form body.

use regex::Regex;

/// Returns the raw value of the first `key=value` pair in `body`.
///
/// The key must start the body or follow a `&`. An empty value yields
/// `Some("")`.
#[must_use]
pub fn extract_form_value(body: &str, key: &str) -> Option<String> {
    let pattern = format!(r"(?:^|&){}=([^&]*)", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    re.captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}
