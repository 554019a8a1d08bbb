//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderName, Request, StatusCode};
use http_body_util::BodyExt;
use roomly_core::clock::Clock;
use roomly_core::repository::EventRepository;
use roomly_test_support::{FixedClock, InMemoryEventRepository, fixed_now};
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use roomly_api::build_router;
use roomly_api::state::AppState;

/// Header the test app reads the caller from.
pub const IDENTITY_HEADER: &str = "x-user-id";

/// Build the full app router over an in-memory event store and a fixed
/// clock. Clones of the router share the store.
pub fn build_test_app() -> Router {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(fixed_now()));
    let event_repository: Arc<dyn EventRepository> = Arc::new(InMemoryEventRepository::new());
    let app_state = AppState::new(
        clock,
        event_repository,
        HeaderName::from_static(IDENTITY_HEADER),
    );
    build_router(app_state, CorsLayer::permissive())
}

/// Send a request, optionally as `user`, and return status and JSON body.
/// An empty body comes back as `Value::Null`.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<Uuid>,
    body: Option<&Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user {
        builder = builder.header(IDENTITY_HEADER, user_id.to_string());
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body.
pub async fn post_json(
    app: &Router,
    uri: &str,
    user: Option<Uuid>,
    body: &Value,
) -> (StatusCode, Value) {
    send(app, "POST", uri, user, Some(body)).await
}

/// Send a PUT request with a JSON body.
pub async fn put_json(
    app: &Router,
    uri: &str,
    user: Option<Uuid>,
    body: &Value,
) -> (StatusCode, Value) {
    send(app, "PUT", uri, user, Some(body)).await
}

/// Send a GET request.
pub async fn get_json(app: &Router, uri: &str, user: Option<Uuid>) -> (StatusCode, Value) {
    send(app, "GET", uri, user, None).await
}

/// Send a DELETE request.
pub async fn delete_json(app: &Router, uri: &str, user: Option<Uuid>) -> (StatusCode, Value) {
    send(app, "DELETE", uri, user, None).await
}

/// Register a user and return its id.
pub async fn register(app: &Router, name: &str, role: &str) -> Uuid {
    let (status, json) = post_json(
        app,
        "/api/v1/users",
        None,
        &json!({
            "name": name,
            "email": format!("{}@example.com", name.to_ascii_lowercase()),
            "role": role,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register {name}: {json}");
    id_of(&json)
}

/// List a place as `host` and return its id.
pub async fn create_place(app: &Router, host: Uuid, title: &str) -> Uuid {
    let (status, json) = post_json(
        app,
        "/api/v1/places",
        Some(host),
        &json!({
            "title": title,
            "address": "12 Harbour Road",
            "maxGuests": 3,
            "price": 120.0,
            "perks": ["wifi", "parking"],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create place: {json}");
    id_of(&json)
}

/// Book `place_id` as `client` for 2026-03-10 to 2026-03-12.
pub async fn book(app: &Router, client: Uuid, place_id: Uuid) -> (StatusCode, Value) {
    post_json(
        app,
        "/api/v1/bookings",
        Some(client),
        &json!({
            "placeId": place_id,
            "checkInDate": "2026-03-10",
            "checkOutDate": "2026-03-12",
            "numOfGuests": 2,
            "guestName": "Cy Client",
            "guestPhone": "555-0100",
            "totalPrice": 240.0,
        }),
    )
    .await
}

/// Parse the `id` field of a JSON object.
pub fn id_of(json: &Value) -> Uuid {
    json["id"].as_str().unwrap().parse().unwrap()
}
