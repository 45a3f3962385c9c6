use bday_core::{Birthday, PersistedProfile, ProfileData, RawCapturedSession, SessionContext};
use bday_scraper::BirthdayClient;
use bday_session::SessionError;
use bday_store::{MemoryStore, PersistSummary, ProfileStore};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::shutdown::ShutdownSignal;

fn session() -> SessionContext {
    SessionContext {
        user_id: "100001".to_string(),
        app_token: "dtsg".to_string(),
        secondary_token: "25391".to_string(),
        security_token: "lsd".to_string(),
        cookie_header: "c_user=100001".to_string(),
    }
}

fn client(server: &MockServer) -> BirthdayClient {
    BirthdayClient::new(&format!("{}/api/graphql/", server.uri()), 5, "bday-test", 0, 0).unwrap()
}

fn shutdown_in(dir: &tempfile::TempDir) -> ShutdownSignal {
    ShutdownSignal::install(dir.path().join("EMERGENCY_STOP.txt"))
}

/// March bucket with Ada (birthday) and an unnamed entry, plus an April bucket.
fn march_page() -> String {
    let payload = json!({"data": {"viewer": {"all_friends_by_birthday_month": {"edges": [
        {"node": {
            "month_name_in_iso8601": "March",
            "friends": {"edges": [
                {"node": {"__typename": "User", "name": "Ada", "profile_url": "https://fb.test/ada", "birthdate": "3/14"}},
                {"node": {"__typename": "User", "name": "Grace", "profile_url": "https://fb.test/grace", "birthdate": {"day": 9, "month": 3}}}
            ]}
        }},
        {"node": {
            "month_name_in_iso8601": "April",
            "friends": {"edges": [
                {"node": {"__typename": "User", "name": "Linus", "profile_url": "https://fb.test/linus", "birthdate": "4/2"}}
            ]}
        }}
    ]}}}});
    format!("{payload}\n")
}

async fn upstream() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("%22count%22%3A3%2C"))
        .respond_with(ResponseTemplate::new(200).set_body_string(march_page()))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn persists_only_current_month_and_skips_known_rows() {
    let server = upstream().await;
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::with_rows(vec![PersistedProfile {
        id: 1,
        profile_data: ProfileData {
            name: Some("Ada".to_string()),
            profile_url: Some("https://fb.test/ada".to_string()),
            birthday: Some(Birthday {
                day: 14,
                month: 3,
                year: None,
            }),
            extracted_at: None,
        },
        card_url: Some("true".to_string()),
    }]);

    let outcome =
        fetch_and_persist(&client(&server), &session(), 3, Some(&store), &shutdown_in(&dir)).await;

    assert_eq!(
        outcome,
        FetchOutcome::Persisted(PersistSummary {
            inserted: 1,
            failed: 0,
            skipped: 1,
            interrupted: false
        })
    );
    let rows = store.select_all().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].profile_data.name.as_deref(), Some("Grace"));
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let server = upstream().await;
    let dir = tempfile::tempdir().unwrap();

    let outcome = fetch_and_persist(
        &client(&server),
        &session(),
        3,
        None::<&MemoryStore>,
        &shutdown_in(&dir),
    )
    .await;

    assert_eq!(outcome, FetchOutcome::DryRun { friends: 2 });
}

#[tokio::test]
async fn upstream_failure_is_reported_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();

    let outcome =
        fetch_and_persist(&client(&server), &session(), 3, Some(&store), &shutdown_in(&dir)).await;

    assert_eq!(outcome, FetchOutcome::FetchFailed);
    assert!(store.rows().is_empty());
    assert_eq!(outcome.exit_code(), ExitCode::FAILURE);
}

#[tokio::test]
async fn tripped_signal_stops_before_writing() {
    let server = upstream().await;
    let dir = tempfile::tempdir().unwrap();
    let shutdown = shutdown_in(&dir);
    std::fs::write(dir.path().join("EMERGENCY_STOP.txt"), "stop").unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !shutdown.is_triggered() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let store = MemoryStore::new();

    let outcome = fetch_and_persist(&client(&server), &session(), 3, Some(&store), &shutdown).await;

    assert_eq!(outcome, FetchOutcome::Interrupted);
    assert!(store.rows().is_empty());
}

/// Upstream that must never be called.
async fn silent_upstream() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(march_page()))
        .expect(0)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn capture_without_body_tokens_skips_the_cycle() {
    let server = silent_upstream().await;
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let captured = RawCapturedSession {
        security_token: Some("lsd".to_string()),
        cookie_header: Some("c_user=100001".to_string()),
        ..RawCapturedSession::default()
    };

    let outcome = fetch_captured(
        Ok(Some(captured)),
        &client(&server),
        3,
        Some(&store),
        &shutdown_in(&dir),
    )
    .await;

    assert_eq!(outcome, FetchOutcome::NoSession);
    assert_eq!(outcome.exit_code(), ExitCode::FAILURE);
    assert!(store.rows().is_empty());
    server.verify().await;
}

#[tokio::test]
async fn empty_or_failed_capture_skips_the_cycle() {
    let server = silent_upstream().await;
    let dir = tempfile::tempdir().unwrap();
    let shutdown = shutdown_in(&dir);

    let none = fetch_captured(Ok(None), &client(&server), 3, None::<&MemoryStore>, &shutdown).await;
    let failed = fetch_captured(
        Err(SessionError::Protocol {
            detail: "connection closed".to_string(),
        }),
        &client(&server),
        3,
        None::<&MemoryStore>,
        &shutdown,
    )
    .await;

    assert_eq!(none, FetchOutcome::NoSession);
    assert_eq!(failed, FetchOutcome::NoSession);
    server.verify().await;
}

#[tokio::test]
async fn complete_capture_runs_the_cycle() {
    let server = upstream().await;
    let dir = tempfile::tempdir().unwrap();
    let captured = RawCapturedSession {
        user_id: Some("100001".to_string()),
        app_token: Some("dtsg".to_string()),
        secondary_token: Some("25391".to_string()),
        security_token: Some("lsd".to_string()),
        cookie_header: Some("c_user=100001".to_string()),
    };

    let outcome = fetch_captured(
        Ok(Some(captured)),
        &client(&server),
        3,
        None::<&MemoryStore>,
        &shutdown_in(&dir),
    )
    .await;

    assert_eq!(outcome, FetchOutcome::DryRun { friends: 2 });
}

#[test]
fn birthday_label_pads_and_includes_year() {
    assert_eq!(
        birthday_label(Some(Birthday {
            day: 4,
            month: 7,
            year: Some(1990)
        })),
        "07/04/1990"
    );
    assert_eq!(
        birthday_label(Some(Birthday {
            day: 14,
            month: 3,
            year: None
        })),
        "03/14"
    );
    assert_eq!(birthday_label(None), "-");
}
