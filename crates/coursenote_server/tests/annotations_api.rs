//! REST API integration tests.
//!
//! Each test builds the router over an in-memory database with a fixed
//! clock and a recording notifier, then drives it with `tower::ServiceExt`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{TimeZone, Utc};
use coursenote_core::db::open_db_in_memory;
use coursenote_core::{FixedClock, NotifyError, RecordedCall, RecordingNotifier, SubjectMatch};
use coursenote_server::{create_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup_with(notifier: Arc<RecordingNotifier>, subject_match: SubjectMatch) -> axum::Router {
    let conn = open_db_in_memory().unwrap();
    let clock = FixedClock(Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap());
    let state = AppState::new(conn, notifier)
        .with_clock(Arc::new(clock))
        .with_subject_match(subject_match);
    create_router(state)
}

fn setup() -> (axum::Router, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    (setup_with(notifier.clone(), SubjectMatch::Exact), notifier)
}

fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    match body {
        Some(val) => builder.body(Body::from(val.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()));
    (status, body)
}

fn note_body(owner_id: i64, subject: &str, date: &str, time: &str) -> Value {
    json!({
        "ownerId": owner_id,
        "subjectName": subject,
        "body": format!("{subject} at {time}"),
        "localDate": date,
        "localTime": time,
    })
}

#[tokio::test]
async fn health_reports_version() {
    let (router, _) = setup();
    let (status, body) = send(&router, json_request(Method::GET, "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pong");
    assert!(!body["version"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn create_reminder_returns_201_with_utc_timestamp() {
    let (router, notifier) = setup();
    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/annotations",
            Some(json!({
                "ownerId": 2,
                "subjectName": "Cálculo I",
                "body": "prova",
                "localDate": "2025-03-10",
                "localTime": "09:00",
                "kind": "reminder",
                "recurrence": "none",
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["canonicalTimestamp"], "2025-03-10T09:00:00Z");
    assert_eq!(body["kind"], "reminder");
    assert_eq!(body["recurrence"], "none");
    assert!(body.get("schedulingWarning").is_none());
    assert!(matches!(
        notifier.calls().as_slice(),
        [RecordedCall::Once {
            delay_seconds: 3600,
            ..
        }]
    ));
}

#[tokio::test]
async fn create_past_reminder_saves_with_warning() {
    let (router, notifier) = setup();
    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/annotations",
            Some(json!({
                "ownerId": 2,
                "subjectName": "Cálculo I",
                "body": "prova",
                "localDate": "2025-03-09",
                "localTime": "09:00",
                "kind": "reminder",
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let warning = body["schedulingWarning"].as_str().unwrap();
    assert!(warning.contains(body["id"].as_str().unwrap()));
    assert!(notifier.calls().is_empty());
}

#[tokio::test]
async fn create_with_failing_notifier_still_saves() {
    let notifier = Arc::new(RecordingNotifier::failing(NotifyError::Unavailable(
        "device offline".into(),
    )));
    let router = setup_with(notifier.clone(), SubjectMatch::Exact);
    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/annotations",
            Some(json!({
                "ownerId": 2,
                "subjectName": "Física",
                "body": "lab",
                "localDate": "2025-03-10",
                "localTime": "07:30",
                "kind": "reminder",
                "recurrence": {"dailyAt": {"hour": 7, "minute": 30}},
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["schedulingWarning"]
        .as_str()
        .unwrap()
        .contains("device offline"));
    assert_eq!(body["recurrence"]["dailyAt"]["hour"], 7);

    let id = body["id"].as_str().unwrap();
    let (status, _) = send(
        &router,
        json_request(Method::GET, &format!("/annotations/{id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn create_rejects_invalid_input_naming_the_field() {
    let (router, notifier) = setup();

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/annotations",
            Some(note_body(2, "   ", "2025-03-10", "09:00")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert!(body["error"].as_str().unwrap().contains("subjectName"));

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/annotations",
            Some(note_body(2, "Física", "2025-13-01", "09:00")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("localDate"));

    let (status, body) = send(
        &router,
        json_request(
            Method::POST,
            "/annotations",
            Some(json!({"subjectName": "Física", "body": "x"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("ownerId"));

    assert!(notifier.calls().is_empty());
}

#[tokio::test]
async fn list_requires_owner_and_filters_by_day_ascending() {
    let (router, _) = setup();
    for body in [
        note_body(2, "Física", "2025-03-10", "15:00"),
        note_body(2, "Cálculo I", "2025-03-10", "08:30"),
        note_body(3, "Física", "2025-03-10", "10:00"),
        note_body(2, "Física", "2025-03-11", "10:00"),
    ] {
        let (status, _) = send(
            &router,
            json_request(Method::POST, "/annotations", Some(body)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&router, json_request(Method::GET, "/annotations", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("ownerId"));

    let (status, body) = send(
        &router,
        json_request(
            Method::GET,
            "/annotations?ownerId=2&calendarDay=2025-03-10",
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let timestamps = body
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["canonicalTimestamp"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        timestamps,
        vec!["2025-03-10T08:30:00Z", "2025-03-10T15:00:00Z"]
    );
}

#[tokio::test]
async fn list_filters_by_subject_and_kind() {
    let notifier = Arc::new(RecordingNotifier::new());
    let router = setup_with(notifier, SubjectMatch::Substring);
    for body in [
        note_body(2, "Cálculo I", "2025-03-10", "09:00"),
        note_body(2, "Cálculo II", "2025-03-10", "10:00"),
        note_body(2, "Física", "2025-03-10", "11:00"),
    ] {
        send(
            &router,
            json_request(Method::POST, "/annotations", Some(body)),
        )
        .await;
    }

    let (status, body) = send(
        &router,
        json_request(
            Method::GET,
            "/annotations?ownerId=2&subjectName=c%C3%A1lculo&kind=note",
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(
        &router,
        json_request(Method::GET, "/annotations?ownerId=2&kind=alarm", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("kind"));
}

#[tokio::test]
async fn update_replaces_record_or_returns_404() {
    let (router, _) = setup();
    let (_, created) = send(
        &router,
        json_request(
            Method::POST,
            "/annotations",
            Some(note_body(2, "Física", "2025-03-10", "09:00")),
        ),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(
        &router,
        json_request(
            Method::PUT,
            &format!("/annotations/{id}"),
            Some(note_body(2, "Química", "2025-03-12", "14:00")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["subjectName"], "Química");
    assert_eq!(body["canonicalTimestamp"], "2025-03-12T14:00:00Z");

    let missing = uuid::Uuid::new_v4();
    let (status, body) = send(
        &router,
        json_request(
            Method::PUT,
            &format!("/annotations/{missing}"),
            Some(note_body(2, "Química", "2025-03-12", "14:00")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains(&missing.to_string()));
}

#[tokio::test]
async fn delete_returns_200_then_404() {
    let (router, _) = setup();
    let (_, created) = send(
        &router,
        json_request(
            Method::POST,
            "/annotations",
            Some(note_body(2, "Física", "2025-03-10", "09:00")),
        ),
    )
    .await;
    let uri = format!("/annotations/{}", created["id"].as_str().unwrap());

    let (status, body) = send(&router, json_request(Method::DELETE, &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("deleted"));

    for _ in 0..2 {
        let (status, body) = send(&router, json_request(Method::DELETE, &uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    let (status, _) = send(
        &router,
        json_request(Method::DELETE, "/annotations/not-a-uuid", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
