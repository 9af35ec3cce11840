use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use homelib_server::{
    api,
    config::AppConfig,
    ledger::Ledger,
    models::enums::LendingStatus,
    repository::MemoryStore,
    services::{metadata::NoMetadata, Services},
    AppState,
};

async fn app() -> Router {
    let config = AppConfig::default();
    let ledger = Ledger::open(Arc::new(MemoryStore::new()), false)
        .await
        .unwrap();
    let services = Services::new(Arc::new(ledger), config.library.clone(), Arc::new(NoMetadata));
    api::create_router(AppState {
        services: Arc::new(services),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn status_json(status: LendingStatus) -> Value {
    serde_json::to_value(status).unwrap()
}

async fn add_dune(app: &Router) {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/items",
        Some(json!({
            "isbn": "9780441172719",
            "title": "Dune",
            "authors": "Frank Herbert",
            "home_shelf": "Study",
            "username": "owner"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["message"], "book_added");
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, "GET", "/api/v1/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], 0);
}

#[tokio::test]
async fn test_add_and_list_items() {
    let app = app().await;
    add_dune(&app).await;

    let (status, body) = send(&app, "GET", "/api/v1/items", None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["item"]["title"], "Dune");
    assert_eq!(items[0]["state"]["status"], status_json(LendingStatus::CheckedIn));
    assert_eq!(items[0]["transaction_count"], 1);

    let (status, body) = send(&app, "GET", "/api/v1/items/9780441172719", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["authors"], "Frank Herbert");
    assert_eq!(body["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_add_is_a_conflict() {
    let app = app().await;
    add_dune(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/items",
        Some(json!({ "isbn": "9780441172719", "title": "Other" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 4);
    assert_eq!(body["retryable"], false);

    let (_, body) = send(&app, "GET", "/api/v1/items/9780441172719", None).await;
    assert_eq!(body["item"]["title"], "Dune");
}

#[tokio::test]
async fn test_loans_toggle_between_states() {
    let app = app().await;
    add_dune(&app).await;
    let request = json!({ "isbn": "9780441172719", "username": "alice" });

    let (status, body) = send(&app, "POST", "/api/v1/loans", Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "book_checked_out");
    assert_eq!(body["status"], status_json(LendingStatus::CheckedOut));
    assert_eq!(body["outcome"]["record"]["actor"], "alice");

    let (status, body) = send(&app, "POST", "/api/v1/loans", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "book_checked_in");
    assert_eq!(body["status"], status_json(LendingStatus::CheckedIn));
}

#[tokio::test]
async fn test_loans_key_errors() {
    let app = app().await;

    let (status, body) = send(&app, "POST", "/api/v1/loans", Some(json!({ "isbn": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 2);

    let (status, body) = send(&app, "POST", "/api/v1/loans", Some(json!({ "isbn": "404" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 3);
}

#[tokio::test]
async fn test_explicit_checkin_of_shelved_item_is_rejected() {
    let app = app().await;
    add_dune(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/items/9780441172719/checkin",
        Some(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 5);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/items/9780441172719/checkout",
        Some(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_metadata() {
    let app = app().await;
    add_dune(&app).await;

    let (status, body) = send(
        &app,
        "PATCH",
        "/api/v1/items/9780441172719/metadata",
        Some(json!({ "publisher": "Chilton", "title": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "metadata_updated");
    assert_eq!(body["item"]["publisher"], "Chilton");
    assert_eq!(body["item"]["title"], "Dune");
}

#[tokio::test]
async fn test_stats() {
    let app = app().await;
    add_dune(&app).await;
    send(
        &app,
        "POST",
        "/api/v1/loans",
        Some(json!({ "isbn": "9780441172719", "username": "alice" })),
    )
    .await;

    let (status, body) = send(&app, "GET", "/api/v1/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], 1);
    assert_eq!(body["checked_out"], 1);
    assert_eq!(body["busiest"]["count"], 2);
    assert_eq!(body["busiest"]["items"][0]["title"], "Dune");
    assert!(body["longest_session"].is_null());
}
