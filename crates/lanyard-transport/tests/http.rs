//! End-to-end tests for `HttpProvider` against a fake companion.
//!
//! The fake is a tiny axum router bound to `127.0.0.1:0`; it records the
//! headers and bodies it receives so tests can assert on the wire traffic.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use lanyard_protocol::{
    CompanionEndpoint, StatRecord, ValidateRequest,
};
use lanyard_transport::{
    HttpConfig, HttpProvider, RemoteSessionProvider, TransportError,
};
use serde_json::{json, Value};

// =========================================================================
// Fake companion
// =========================================================================

#[derive(Default)]
struct Seen {
    auth: Vec<String>,
    users: Vec<String>,
    unlocked: Vec<String>,
    stored: Vec<Value>,
}

#[derive(Clone)]
struct Fake {
    seen: Arc<Mutex<Seen>>,
    alive: bool,
}

fn remember(fake: &Fake, headers: &HeaderMap) {
    let mut seen = fake.seen.lock().unwrap();
    if let Some(auth) = headers.get("authorization") {
        seen.auth.push(auth.to_str().unwrap().to_string());
    }
    if let Some(user) = headers.get("x-lanyard-user") {
        seen.users.push(user.to_str().unwrap().to_string());
    }
}

async fn validate(
    State(fake): State<Fake>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    remember(&fake, &headers);
    if body["token"] == "good" {
        Ok(Json(json!({"gameId": "g1", "userId": "u1"})))
    } else {
        Err((StatusCode::UNAUTHORIZED, "token revoked".to_string()))
    }
}

async fn health(State(fake): State<Fake>, headers: HeaderMap) -> Json<Value> {
    remember(&fake, &headers);
    Json(json!({"alive": fake.alive}))
}

async fn stats(State(fake): State<Fake>, headers: HeaderMap) -> Json<Value> {
    remember(&fake, &headers);
    Json(json!([
        {"kind": "int", "id": "kills", "value": 5},
        {"kind": "float", "id": "accuracy", "value": 0.5}
    ]))
}

async fn store(
    State(fake): State<Fake>,
    Json(body): Json<Value>,
) -> StatusCode {
    fake.seen.lock().unwrap().stored.push(body);
    StatusCode::NO_CONTENT
}

async fn unlock(
    State(fake): State<Fake>,
    Path(id): Path<String>,
) -> StatusCode {
    fake.seen.lock().unwrap().unlocked.push(id);
    StatusCode::OK
}

async fn achievements() -> Json<Value> {
    Json(json!([
        {"id": "first_blood", "name": "First Blood", "unlocked": true, "unlockedAt": 1700000000},
        {"id": "marathon"}
    ]))
}

async fn user() -> Json<Value> {
    Json(json!({"id": "u1", "name": "Player One", "email": "one@example.com"}))
}

/// Starts the fake companion and returns its endpoint plus its log.
async fn start(alive: bool) -> (CompanionEndpoint, Arc<Mutex<Seen>>) {
    let fake = Fake {
        seen: Arc::new(Mutex::new(Seen::default())),
        alive,
    };
    let seen = Arc::clone(&fake.seen);
    let app = Router::new()
        .route("/session/validate", post(validate))
        .route("/session/health", get(health))
        .route("/stats", get(stats).put(store))
        .route("/achievements", get(achievements))
        .route("/achievements/{id}/unlock", post(unlock))
        .route("/user", get(user))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (CompanionEndpoint::loopback(port), seen)
}

fn provider() -> HttpProvider {
    HttpProvider::new(HttpConfig {
        request_timeout: Duration::from_secs(5),
        ..HttpConfig::default()
    })
    .unwrap()
}

fn request(token: &str) -> ValidateRequest {
    ValidateRequest {
        token: token.to_string(),
        user_id: Some("u1".into()),
        app_id: Some("app".into()),
        game_id: None,
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_validate_success_binds_and_authorizes_later_calls() {
    let (endpoint, seen) = start(true).await;
    let provider = provider();

    let reply = provider
        .validate(Some(&endpoint), &request("good"))
        .await
        .expect("validation should succeed");
    assert_eq!(reply.game_id, "g1");
    assert_eq!(reply.user_id, "u1");
    assert!(provider.bound_url().is_some());

    let stats = provider.request_stats().await.unwrap();
    assert_eq!(
        stats,
        vec![StatRecord::int("kills", 5), StatRecord::float("accuracy", 0.5)]
    );

    let seen = seen.lock().unwrap();
    assert_eq!(seen.auth, vec!["Bearer good", "Bearer good"]);
    assert_eq!(seen.users, vec!["u1", "u1"]);
}

#[tokio::test]
async fn test_validate_rejected_reports_status_and_message() {
    let (endpoint, _) = start(true).await;
    let provider = provider();

    let result = provider.validate(Some(&endpoint), &request("bad")).await;

    match result {
        Err(TransportError::Rejected { status, message }) => {
            assert_eq!(status, 401);
            assert!(message.contains("token revoked"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(provider.bound_url(), None, "rejection must not bind");
}

#[tokio::test]
async fn test_validate_without_endpoint_is_missing_endpoint() {
    let provider = provider();

    let result = provider.validate(None, &request("good")).await;

    assert!(matches!(result, Err(TransportError::MissingEndpoint)));
}

#[tokio::test]
async fn test_session_call_before_validate_is_not_bound() {
    let provider = provider();

    assert!(matches!(
        provider.check_liveness().await,
        Err(TransportError::NotBound)
    ));
    assert!(matches!(
        provider.request_stats().await,
        Err(TransportError::NotBound)
    ));
}

#[tokio::test]
async fn test_liveness_not_alive_is_error() {
    let (endpoint, _) = start(false).await;
    let provider = provider();
    provider.validate(Some(&endpoint), &request("good")).await.unwrap();

    assert!(matches!(
        provider.check_liveness().await,
        Err(TransportError::NotAlive)
    ));
}

#[tokio::test]
async fn test_liveness_alive_is_ok() {
    let (endpoint, _) = start(true).await;
    let provider = provider();
    provider.validate(Some(&endpoint), &request("good")).await.unwrap();

    provider.check_liveness().await.expect("companion is alive");
}

#[tokio::test]
async fn test_store_and_unlock_reach_companion() {
    let (endpoint, seen) = start(true).await;
    let provider = provider();
    provider.validate(Some(&endpoint), &request("good")).await.unwrap();

    provider
        .store_stats(&[StatRecord::int("kills", 6)])
        .await
        .unwrap();
    provider.unlock_achievement("first_blood").await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen.stored,
        vec![json!([{"kind": "int", "id": "kills", "value": 6}])]
    );
    assert_eq!(seen.unlocked, vec!["first_blood"]);
}

#[tokio::test]
async fn test_list_achievements_and_user_info_decode() {
    let (endpoint, _) = start(true).await;
    let provider = provider();
    provider.validate(Some(&endpoint), &request("good")).await.unwrap();

    let list = provider.list_achievements().await.unwrap();
    assert_eq!(list.len(), 2);
    assert!(list[0].unlocked);
    assert_eq!(list[0].unlocked_at, Some(1_700_000_000));
    assert!(!list[1].unlocked);

    let user = provider.user_info().await.unwrap();
    assert_eq!(user.name, "Player One");
}

#[tokio::test]
async fn test_unreachable_companion_is_request_error() {
    // Bind and immediately drop a listener to get a port nobody serves.
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap();
        listener.local_addr().unwrap().port()
    };
    let provider = provider();

    let result = provider
        .validate(Some(&CompanionEndpoint::loopback(port)), &request("good"))
        .await;

    assert!(
        matches!(result, Err(TransportError::Request(_))),
        "got {result:?}"
    );
}
