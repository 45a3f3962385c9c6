//! The `fetch` command: capture a session, pull this month's birthdays and
//! store the new ones.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use bday_core::{AppConfig, Birthday, BirthdayRecord, RawCapturedSession, SessionContext};
use bday_scraper::BirthdayClient;
use bday_session::{capture_session, CaptureConfig, SessionError};
use bday_store::{persist_new_birthdays, PersistSummary, ProfileStore};
use chrono::{Datelike, Utc};

use crate::shutdown::ShutdownSignal;
use crate::store::open_store;

/// How a fetch run ended.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FetchOutcome {
    Persisted(PersistSummary),
    DryRun { friends: usize },
    /// Capture produced no usable credentials; nothing was fetched.
    NoSession,
    FetchFailed,
    Interrupted,
}

impl FetchOutcome {
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::Persisted(_) | Self::DryRun { .. } => ExitCode::SUCCESS,
            Self::NoSession | Self::FetchFailed | Self::Interrupted => ExitCode::FAILURE,
        }
    }
}

pub(crate) fn capture_config(config: &AppConfig) -> CaptureConfig {
    let mut capture = CaptureConfig::new(&config.debugger_url, &config.capture_page_url);
    capture.timeout = Duration::from_secs(config.capture_timeout_secs);
    capture.settle_delay = Duration::from_millis(config.capture_settle_ms);
    capture
}

/// Runs one fetch cycle for the current local month.
///
/// The store is opened before the browser capture.
///
/// # Errors
///
/// Returns an error if the upstream client or the store cannot be set up.
/// Capture and fetch failures are logged and reported through the outcome.
pub(crate) async fn run_fetch(
    config: &AppConfig,
    shutdown: &ShutdownSignal,
    dry_run: bool,
) -> anyhow::Result<FetchOutcome> {
    let client = BirthdayClient::new(
        &config.api_url,
        config.request_timeout_secs,
        &config.user_agent,
        config.max_retries,
        config.retry_backoff_base_secs,
    )
    .context("building upstream client")?;
    let current_month = chrono::Local::now().month();

    if dry_run {
        let captured = capture_session(&capture_config(config)).await;
        let outcome = fetch_captured(
            captured,
            &client,
            current_month,
            None::<&dyn ProfileStore>,
            shutdown,
        )
        .await;
        return Ok(outcome);
    }

    let store = open_store(config).await?;
    let captured = capture_session(&capture_config(config)).await;
    let outcome =
        fetch_captured(captured, &client, current_month, Some(store.as_ref()), shutdown).await;
    Ok(outcome)
}

/// Continues a cycle from a capture result. Nothing is sent upstream unless
/// the capture holds every required credential.
pub(crate) async fn fetch_captured<S>(
    captured: Result<Option<RawCapturedSession>, SessionError>,
    client: &BirthdayClient,
    current_month: u32,
    store: Option<&S>,
    shutdown: &ShutdownSignal,
) -> FetchOutcome
where
    S: ProfileStore + ?Sized,
{
    let Some(session) = usable_session(captured) else {
        return FetchOutcome::NoSession;
    };
    if shutdown.is_triggered() {
        return FetchOutcome::Interrupted;
    }
    fetch_and_persist(client, &session, current_month, store, shutdown).await
}

fn usable_session(
    captured: Result<Option<RawCapturedSession>, SessionError>,
) -> Option<SessionContext> {
    let raw = match captured {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            tracing::warn!("no session captured, skipping fetch");
            return None;
        }
        Err(e) => {
            tracing::error!(error = %e, "session capture failed, skipping fetch");
            return None;
        }
    };
    match SessionContext::try_from(raw) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(error = %e, "skipping fetch");
            None
        }
    }
}

/// Fetch and, unless `store` is `None` (dry run), persist. Stops between
/// records once `shutdown` trips.
pub(crate) async fn fetch_and_persist<S>(
    client: &BirthdayClient,
    session: &SessionContext,
    current_month: u32,
    store: Option<&S>,
    shutdown: &ShutdownSignal,
) -> FetchOutcome
where
    S: ProfileStore + ?Sized,
{
    let friends = match client.fetch_month_birthdays(session, current_month).await {
        Ok(friends) => friends,
        Err(e) => {
            tracing::error!(current_month, error = %e, "birthday fetch failed");
            return FetchOutcome::FetchFailed;
        }
    };
    if shutdown.is_triggered() {
        return FetchOutcome::Interrupted;
    }

    let Some(store) = store else {
        print_records(&friends);
        return FetchOutcome::DryRun {
            friends: friends.len(),
        };
    };

    if friends.is_empty() {
        tracing::info!(current_month, "no birthdays to insert");
    }

    let summary =
        persist_new_birthdays(store, &friends, Utc::now(), || shutdown.is_triggered()).await;
    if summary.interrupted {
        return FetchOutcome::Interrupted;
    }
    FetchOutcome::Persisted(summary)
}

/// `MM/DD[/YYYY]`, or `-` when unknown.
pub(crate) fn birthday_label(birthday: Option<Birthday>) -> String {
    birthday.map_or_else(
        || "-".to_string(),
        |b| match b.year {
            Some(year) => format!("{:02}/{:02}/{year}", b.month, b.day),
            None => format!("{:02}/{:02}", b.month, b.day),
        },
    )
}

fn print_records(records: &[BirthdayRecord]) {
    for record in records {
        println!(
            "{}\t{}\t{}",
            birthday_label(record.birthday),
            record.name.as_deref().unwrap_or("-"),
            record.profile_url.as_deref().unwrap_or("-"),
        );
    }
}

#[cfg(test)]
#[path = "fetch_test.rs"]
mod tests;
