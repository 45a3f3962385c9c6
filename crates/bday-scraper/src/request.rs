//! Form body for the monthly-birthdays refetch query.

use bday_core::SessionContext;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

pub const FRIENDLY_NAME: &str = "BirthdayCometMonthlyBirthdaysRefetchQuery";
pub const DOC_ID: &str = "9949483375155057";
pub const REFERER: &str = "https://www.facebook.com/events/birthdays/";

// Same values the birthdays page sends for its own refetch.
const OFFSET_MONTH: i32 = -1;
const SCALE: u32 = 1;

/// Characters left unescaped by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// JSON `variables` blob for a page of `count` months.
#[must_use]
pub fn build_variables(count: u32) -> serde_json::Value {
    serde_json::json!({
        "count": count,
        "cursor": null,
        "offset_month": OFFSET_MONTH,
        "scale": SCALE,
        "stream_birthday_months": true,
    })
}

/// Builds the `application/x-www-form-urlencoded` request body.
///
/// Session tokens are inserted verbatim: they were captured from an already
/// form-encoded body and must not be encoded twice.
#[must_use]
pub fn build_form_body(session: &SessionContext, count: u32) -> String {
    let variables = build_variables(count).to_string();
    let encoded_variables = utf8_percent_encode(&variables, URI_COMPONENT);
    let user = &session.user_id;
    format!(
        "av={user}&__user={user}&fb_dtsg={dtsg}&jazoest={jazoest}&lsd={lsd}\
         &fb_api_caller_class=RelayModern&fb_api_req_friendly_name={FRIENDLY_NAME}\
         &server_timestamps=true&doc_id={DOC_ID}&variables={encoded_variables}",
        dtsg = session.app_token,
        jazoest = session.secondary_token,
        lsd = session.security_token,
    )
}
