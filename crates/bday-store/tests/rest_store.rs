//! `RestStore` against a `wiremock` PostgREST endpoint.

use bday_core::{Birthday, NewProfile, ProfileData};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bday_store::{ProfileStore, RestStore, StoreError};

const TABLE_PATH: &str = "/rest/v1/birthdays";

fn store(server: &MockServer) -> RestStore {
    RestStore::new(&server.uri(), "anon-key", "birthdays", 5).expect("valid store config")
}

fn row(id: i64, name: &str, url: &str, card_url: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "profile_data": {
            "name": name,
            "profileUrl": url,
            "birthday": {"day": 14, "month": 3, "year": null},
            "extracted_at": "2026-03-01T08:00:00Z"
        },
        "card_url": card_url
    })
}

#[tokio::test]
async fn select_by_profile_url_filters_on_json_field() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("profile_data->>profileUrl", "eq.https://fb.test/ada"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([row(3, "Ada", "https://fb.test/ada", None)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let rows = store(&server)
        .select_by_profile_url("https://fb.test/ada")
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, 3);
    assert_eq!(rows[0].profile_data.name.as_deref(), Some("Ada"));
    assert_eq!(
        rows[0].profile_data.birthday,
        Some(Birthday {
            day: 14,
            month: 3,
            year: None
        })
    );
    assert!(rows[0].is_pending());
}

#[tokio::test]
async fn select_by_name_filters_on_json_field() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("profile_data->>name", "eq.Grace Hopper"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = store(&server).select_by_name("Grace Hopper").await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn select_all_reads_card_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("select", "id,profile_data,card_url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            row(1, "Ada", "u1", Some("true")),
            row(2, "Grace", "u2", None),
        ])))
        .mount(&server)
        .await;

    let rows = store(&server).select_all().await.unwrap();

    assert_eq!(rows.len(), 2);
    assert!(!rows[0].is_pending());
    assert!(rows[1].is_pending());
}

#[tokio::test]
async fn insert_posts_profile_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("prefer", "return=minimal"))
        .and(body_json(json!({
            "profile_data": {
                "name": "Ada",
                "profileUrl": "u1",
                "birthday": {"day": 14, "month": 3, "year": null},
                "extracted_at": null
            }
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let profile = NewProfile {
        profile_data: ProfileData {
            name: Some("Ada".to_string()),
            profile_url: Some("u1".to_string()),
            birthday: Some(Birthday {
                day: 14,
                month: 3,
                year: None,
            }),
            extracted_at: None,
        },
    };
    store(&server).insert(&profile).await.unwrap();
}

#[tokio::test]
async fn update_card_url_patches_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.9"))
        .and(body_json(json!({"card_url": "true"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(9, "Ada", "u1", Some("true"))])))
        .expect(1)
        .mount(&server)
        .await;

    store(&server).update_card_url(9, "true").await.unwrap();
}

#[tokio::test]
async fn update_of_unknown_id_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = store(&server).update_card_url(404, "true").await;
    assert!(matches!(result, Err(StoreError::NotFound(404))));
}

#[tokio::test]
async fn error_status_carries_response_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401).set_body_string(r#"{"message":"Invalid API key"}"#),
        )
        .mount(&server)
        .await;

    let result = store(&server).select_all().await;
    match result {
        Err(StoreError::UnexpectedStatus { status, body, .. }) => {
            assert_eq!(status, 401);
            assert!(body.contains("Invalid API key"));
        }
        other => panic!("expected UnexpectedStatus, got: {other:?}"),
    }
}

#[test]
fn table_name_must_be_lowercase_identifier() {
    for table in ["Birthdays", "birthdays?select=*"] {
        let result = RestStore::new("https://project.supabase.co", "anon-key", table, 5);
        assert!(
            matches!(result, Err(StoreError::InvalidTableName(_))),
            "{table:?} should be rejected"
        );
    }
}
