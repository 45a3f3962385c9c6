//! HTTP client for the upstream monthly-birthdays query.

use std::time::Duration;

use bday_core::{BirthdayRecord, SessionContext};
use reqwest::Client;

use crate::error::ScraperError;
use crate::month_page::{friends_for_month, FetchPlan};
use crate::rate_limit::retry_with_backoff;
use crate::request::{build_form_body, FRIENDLY_NAME, REFERER};

/// Replays the birthday query with a captured session.
///
/// The response body stays in memory and goes straight to the extractors.
pub struct BirthdayClient {
    client: Client,
    api_url: reqwest::Url,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl BirthdayClient {
    /// Creates a client for `api_url` with the configured timeout, `User-Agent`
    /// and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidApiUrl`] if `api_url` does not parse, or
    /// [`ScraperError::Http`] if the underlying `reqwest::Client` cannot be
    /// constructed.
    pub fn new(
        api_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let parsed = reqwest::Url::parse(api_url).map_err(|e| ScraperError::InvalidApiUrl {
            url: api_url.to_owned(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            api_url: parsed,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Fetches the birthday page for `current_month` and returns the friends
    /// whose bucket resolves to that month.
    ///
    /// November and December share one combined request.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidMonth`] if `current_month` is not in `1..=12`.
    /// - [`ScraperError::RateLimited`] / [`ScraperError::UnexpectedStatus`] on a
    ///   non-2xx response after retries.
    /// - [`ScraperError::Http`] on network failure after retries.
    pub async fn fetch_month_birthdays(
        &self,
        session: &SessionContext,
        current_month: u32,
    ) -> Result<Vec<BirthdayRecord>, ScraperError> {
        let plan = FetchPlan::for_month(current_month)?;
        tracing::info!(
            current_month,
            count = plan.count,
            combined = plan.combined_year_end,
            "fetching birthday page"
        );

        let raw = self.fetch_birthday_page(session, plan.count).await?;
        let friends = friends_for_month(&raw, current_month);

        tracing::info!(
            current_month,
            friends = friends.len(),
            "birthdays found for current month"
        );
        Ok(friends)
    }

    /// Posts the refetch query for `count` months and returns the raw
    /// (multi-line) response text.
    ///
    /// # Errors
    ///
    /// See [`BirthdayClient::fetch_month_birthdays`].
    pub async fn fetch_birthday_page(
        &self,
        session: &SessionContext,
        count: u32,
    ) -> Result<String, ScraperError> {
        let body = build_form_body(session, count);

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let body = body.clone();
            async move {
                let response = self
                    .client
                    .post(self.api_url.clone())
                    .header(
                        reqwest::header::CONTENT_TYPE,
                        "application/x-www-form-urlencoded",
                    )
                    .header("x-fb-lsd", &session.security_token)
                    .header(reqwest::header::COOKIE, &session.cookie_header)
                    .header("x-fb-friendly-name", FRIENDLY_NAME)
                    .header(reqwest::header::REFERER, REFERER)
                    .body(body)
                    .send()
                    .await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.trim().parse::<u64>().ok());
                    return Err(ScraperError::RateLimited { retry_after_secs });
                }

                if !status.is_success() {
                    return Err(ScraperError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: self.api_url.to_string(),
                    });
                }

                Ok(response.text().await?)
            }
        })
        .await
    }
}
