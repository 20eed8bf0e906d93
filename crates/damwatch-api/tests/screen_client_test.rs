#![allow(clippy::unwrap_used)]
// Integration tests for `ScreenClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use damwatch_api::{Error, ManualEntry, ScreenClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ScreenClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ScreenClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {
                "username": "operator",
                "role": "editor",
                "sectionAccess": {
                    "screen-data": { "view": true, "edit": true }
                }
            }
        })))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "test-password".to_string().into();
    let user = client.login("operator", &secret).await.unwrap();

    assert_eq!(user.username, "operator");
    assert!(user.can_edit("screen-data"));
    assert!(!user.can_edit("reports"));
}

#[tokio::test]
async fn test_login_bad_credentials_surfaces_server_message() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid credentials" })),
        )
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "wrong".to_string().into();
    let result = client.login("operator", &secret).await;

    match result {
        Err(Error::Authentication { ref message }) => {
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_me_with_session() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": { "username": "viewer" }
        })))
        .mount(&server)
        .await;

    let user = client.me().await.unwrap().unwrap();

    assert_eq!(user.username, "viewer");
    // No capability map means the deployment doesn't gate edits.
    assert!(user.can_edit("screen-data"));
}

#[tokio::test]
async fn test_me_without_session_is_none_not_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "No session" })))
        .mount(&server)
        .await;

    let user = client.me().await.unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn test_edit_gated_off_by_capability_map() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {
                "username": "viewer",
                "sectionAccess": {
                    "screen-data": { "view": true, "edit": false }
                }
            }
        })))
        .mount(&server)
        .await;

    let user = client.me().await.unwrap().unwrap();
    assert!(!user.can_edit("screen-data"));
}

// ── Live snapshot tests ─────────────────────────────────────────────

#[tokio::test]
async fn test_live_snapshot() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/screen-data/live"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "turbidity": 0.52,
            "turbidity_1_hour_prior": 0.48,
            "current_dam_level": 12.35,
            "tank_a_level": 86.0,
            "old_res_status": "FILLING",
            "last_active_dosing": "Mar-07 02 PM",
            "current_operator": "john smith",
            "reserved_metric": "2024-03-01",
            "target_hour": "2:00 PM",
            "fetched_at": "2024-03-07 14:05:11"
        })))
        .mount(&server)
        .await;

    let snap = client.live().await.unwrap();

    assert_eq!(snap.turbidity, Some(0.52));
    assert_eq!(snap.current_dam_level, Some(12.35));
    assert_eq!(snap.tank_b_level, None);
    assert_eq!(snap.target_hour.as_deref(), Some("2:00 PM"));
    assert_eq!(snap.reserved_metric.as_deref(), Some("2024-03-01"));
}

#[tokio::test]
async fn test_live_snapshot_tolerates_unknown_fields() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/screen-data/live"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "turbidity": 1.0,
            "some_future_field": { "nested": true }
        })))
        .mount(&server)
        .await;

    let snap = client.live().await.unwrap();
    assert_eq!(snap.turbidity, Some(1.0));
}

// ── Editor tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_put_chlorine_date_echoes_canonical_value() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/screen-data/last-chlorine-tank-change"))
        .and(body_json(json!({ "date": "2024-03-01" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Updated",
            "date": "2024-03-01"
        })))
        .mount(&server)
        .await;

    let echoed = client.put_chlorine_date(Some("2024-03-01")).await.unwrap();
    assert_eq!(echoed.as_deref(), Some("2024-03-01"));
}

#[tokio::test]
async fn test_put_chlorine_date_clear() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/screen-data/last-chlorine-tank-change"))
        .and(body_json(json!({ "date": null })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Cleared",
            "date": null
        })))
        .mount(&server)
        .await;

    let echoed = client.put_chlorine_date(None).await.unwrap();
    assert!(echoed.is_none());
}

#[tokio::test]
async fn test_put_chlorine_date_invalid_format() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/screen-data/last-chlorine-tank-change"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "error": "Date must be YYYY-MM-DD" })),
        )
        .mount(&server)
        .await;

    let result = client.put_chlorine_date(Some("01/03/2024")).await;

    match result {
        Err(Error::Api {
            ref message,
            status,
        }) => {
            assert_eq!(message, "Date must be YYYY-MM-DD");
            assert_eq!(status, 400);
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_put_last_active_dosing() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/screen-data/last-active-dosing"))
        .and(body_json(json!({ "value": "Mar-07 02 PM" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Updated",
            "value": "Mar-07 02 PM"
        })))
        .mount(&server)
        .await;

    let echoed = client.put_last_active_dosing("Mar-07 02 PM").await.unwrap();
    assert_eq!(echoed, "Mar-07 02 PM");
}

// ── History tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_history_grouped_by_day() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/screen-data/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "date": "2024-03-07",
                "entries": [
                    {
                        "slotDatetime": "2024-03-07 14:00",
                        "date": "2024-03-07",
                        "time": "2:00 PM",
                        "damLevel": 12.35,
                        "turbidity": 0.52
                    },
                    {
                        "slotDatetime": "2024-03-07 13:00",
                        "date": "2024-03-07",
                        "time": "1:00 PM",
                        "damLevel": null,
                        "turbidity": 0.5
                    }
                ]
            }
        ])))
        .mount(&server)
        .await;

    let days = client.history(None, None).await.unwrap();

    assert_eq!(days.len(), 1);
    assert_eq!(days[0].date, "2024-03-07");
    assert_eq!(days[0].entries.len(), 2);
    assert_eq!(days[0].entries[0].time, "2:00 PM");
    assert_eq!(days[0].entries[1].dam_level, None);
}

#[tokio::test]
async fn test_history_single_day_filter() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/screen-data/history"))
        .and(query_param("start_date", "2024-03-07"))
        .and(query_param("end_date", "2024-03-07"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let days = client
        .history(Some("2024-03-07"), Some("2024-03-07"))
        .await
        .unwrap();

    assert!(days.is_empty());
}

#[tokio::test]
async fn test_missing_hours_report() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/screen-data/history/missing-hours"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalMissingHours": 2,
            "groups": [
                {
                    "date": "2024-03-06",
                    "entries": [
                        {
                            "slotDatetime": "2024-03-06 03:00",
                            "date": "2024-03-06",
                            "time": "3:00 AM"
                        },
                        {
                            "slotDatetime": "2024-03-06 04:00",
                            "date": "2024-03-06",
                            "time": "4:00 AM"
                        }
                    ]
                }
            ]
        })))
        .mount(&server)
        .await;

    let report = client.missing_hours(None, None).await.unwrap();

    assert_eq!(report.total_missing_hours, 2);
    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].entries[0].slot_datetime, "2024-03-06 03:00");
}

#[tokio::test]
async fn test_post_manual_entries() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/screen-data/history/manual-entries"))
        .and(body_json(json!({
            "entries": [
                { "slotDatetime": "2024-03-06 03:00", "damLevel": 12.1 },
                { "slotDatetime": "2024-03-06 04:00", "damLevel": 12.2, "turbidity": 0.6 }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Saved 2 entries",
            "savedCount": 2
        })))
        .mount(&server)
        .await;

    let entries = vec![
        ManualEntry {
            slot_datetime: "2024-03-06 03:00".into(),
            dam_level: Some(12.1),
            turbidity: None,
        },
        ManualEntry {
            slot_datetime: "2024-03-06 04:00".into(),
            dam_level: Some(12.2),
            turbidity: Some(0.6),
        },
    ];
    let result = client.post_manual_entries(&entries).await.unwrap();

    assert_eq!(result.saved_count, 2);
    assert_eq!(result.message, "Saved 2 entries");
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_session_expired_on_data_endpoint() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/screen-data/live"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.live().await;

    assert!(
        matches!(result, Err(Error::SessionExpired)),
        "expected SessionExpired, got: {result:?}"
    );
    assert!(result.unwrap_err().is_auth_expired());
}

#[tokio::test]
async fn test_api_error_body_surfaced() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/screen-data/history/manual-entries"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "error": "Invalid slotDatetime: bogus" })),
        )
        .mount(&server)
        .await;

    let entries = vec![ManualEntry {
        slot_datetime: "bogus".into(),
        dam_level: Some(1.0),
        turbidity: None,
    }];
    let result = client.post_manual_entries(&entries).await;

    match result {
        Err(Error::Api { ref message, .. }) => {
            assert!(message.contains("Invalid slotDatetime"));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}
