use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use base64::Engine as _;
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use migration::MigratorTrait;
use server::{ServerOptions, ServerState, router};

const PASSWORD: &str = "correct horse";

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db)
        .password_iterations(1_000)
        .build()
        .await
        .unwrap();
    router(ServerState {
        engine: Arc::new(engine),
        options: ServerOptions::default(),
    })
}

fn basic(email: &str, password: &str) -> String {
    let token = base64::engine::general_purpose::STANDARD.encode(format!("{email}:{password}"));
    format!("Basic {token}")
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(app, method, uri, auth, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(email) = auth {
        request = request.header(header::AUTHORIZATION, basic(email, PASSWORD));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn register(app: &Router, email: &str) -> Value {
    let (status, user) = send(
        app,
        Method::POST,
        "/users",
        None,
        Some(json!({ "email": email, "password": PASSWORD, "currency": "EUR" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    user
}

async fn new_account(app: &Router, email: &str, name: &str, balance_minor: i64) -> String {
    let (status, account) = send(
        app,
        Method::POST,
        "/accounts",
        Some(email),
        Some(json!({
            "name": name,
            "kind": "checking",
            "currency": "EUR",
            "balance_minor": balance_minor,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    account["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public_and_the_rest_needs_credentials() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let user = register(&app, "Alice@Example.com").await;
    assert_eq!(user["email"], "alice@example.com");

    let (status, body) = send(
        &app,
        Method::POST,
        "/users",
        None,
        Some(json!({ "email": "alice@example.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, Method::GET, "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/me")
        .header(header::AUTHORIZATION, basic("alice@example.com", "wrong password"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, me) = send(&app, Method::GET, "/me", Some("alice@example.com"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user["id"]);

    let (status, me) = send(
        &app,
        Method::PATCH,
        "/me",
        Some("alice@example.com"),
        Some(json!({ "name": "Alice", "currency": "CHF" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Alice");
    assert_eq!(me["currency"], "CHF");
}

#[tokio::test]
async fn transactions_move_balances_and_stay_private() {
    let app = app().await;
    register(&app, "alice@example.com").await;
    register(&app, "bob@example.com").await;
    let main = new_account(&app, "alice@example.com", "Main", 10_000).await;

    let (status, tx) = send(
        &app,
        Method::POST,
        "/transactions",
        Some("alice@example.com"),
        Some(json!({
            "kind": "expense",
            "amount_minor": 2_500,
            "occurred_at": "2026-03-01T09:30:00+01:00",
            "account_id": main,
            "description": "Groceries",
            "tags": ["Food"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tx["currency"], "EUR");
    assert_eq!(tx["occurred_at"], "2026-03-01T08:30:00Z");
    assert_eq!(tx["tags"], json!(["food"]));
    let tx_id = tx["id"].as_str().unwrap().to_string();

    let account_uri = format!("/accounts/{main}");
    let (_, account) = send(&app, Method::GET, &account_uri, Some("alice@example.com"), None).await;
    assert_eq!(account["balance_minor"], 7_500);

    let (status, _) = send(&app, Method::GET, &account_uri, Some("bob@example.com"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let tx_uri = format!("/transactions/{tx_id}");
    let (status, _) = send(&app, Method::GET, &tx_uri, Some("bob@example.com"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, page) = send(
        &app,
        Method::GET,
        "/transactions?tag=food&limit=10",
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["transactions"].as_array().unwrap().len(), 1);
    assert!(page["next_cursor"].is_null());

    let (status, tx) = send(
        &app,
        Method::PATCH,
        &tx_uri,
        Some("alice@example.com"),
        Some(json!({ "amount_minor": 4_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tx["amount_minor"], 4_000);
    let (_, account) = send(&app, Method::GET, &account_uri, Some("alice@example.com"), None).await;
    assert_eq!(account["balance_minor"], 6_000);

    let (status, _) = send(&app, Method::DELETE, &tx_uri, Some("alice@example.com"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, account) = send(&app, Method::GET, &account_uri, Some("alice@example.com"), None).await;
    assert_eq!(account["balance_minor"], 10_000);
    let (status, _) = send(&app, Method::GET, &tx_uri, Some("alice@example.com"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn validation_errors_are_bad_requests() {
    let app = app().await;
    register(&app, "alice@example.com").await;
    let main = new_account(&app, "alice@example.com", "Main", 0).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/transactions",
        Some("alice@example.com"),
        Some(json!({
            "kind": "income",
            "amount_minor": 0,
            "occurred_at": "2026-03-01T00:00:00Z",
            "account_id": main,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("amount"));

    let (status, _) = send(
        &app,
        Method::GET,
        "/transactions?limit=1000",
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::GET,
        "/reports/monthly",
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/accounts",
        Some("alice@example.com"),
        Some(json!({ "name": "main", "kind": "savings", "currency": "EUR" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn malformed_requests_get_json_bad_requests() {
    let app = app().await;
    register(&app, "alice@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/accounts",
        Some("alice@example.com"),
        Some(json!({ "name": "Jar", "kind": "piggy_bank", "currency": "EUR" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("piggy_bank"));

    let (status, body) = send(
        &app,
        Method::GET,
        "/accounts/not-a-uuid",
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        Method::GET,
        "/transactions?limit=many",
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, bytes) = send_raw(
        &app,
        Method::POST,
        "/users",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn reports_and_export() {
    let app = app().await;
    register(&app, "alice@example.com").await;
    let main = new_account(&app, "alice@example.com", "Main", 0).await;

    for (kind, amount, day) in [("income", 300_000, "05"), ("expense", 45_000, "20")] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/transactions",
            Some("alice@example.com"),
            Some(json!({
                "kind": kind,
                "amount_minor": amount,
                "occurred_at": format!("2026-01-{day}T12:00:00Z"),
                "account_id": main,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, summary) = send(
        &app,
        Method::GET,
        "/reports/summary",
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["net_minor"], 255_000);
    assert_eq!(summary["count"], 2);

    let (status, monthly) = send(
        &app,
        Method::GET,
        "/reports/monthly?from=2026-01-01T00:00:00Z&to=2026-03-01T00:00:00Z",
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(monthly["months"].as_array().unwrap().len(), 2);

    let (status, worth) = send(
        &app,
        Method::GET,
        "/reports/net-worth",
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(worth["net_worth"][0]["net_minor"], 255_000);

    let request = Request::builder()
        .uri("/reports/export")
        .header(header::AUTHORIZATION, basic("alice@example.com", PASSWORD))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(csv.lines().count(), 3);
}

#[tokio::test]
async fn subscriptions_are_paid_through_the_api() {
    let app = app().await;
    register(&app, "alice@example.com").await;
    let main = new_account(&app, "alice@example.com", "Main", 10_000).await;

    let (status, sub) = send(
        &app,
        Method::POST,
        "/subscriptions",
        Some("alice@example.com"),
        Some(json!({
            "name": "Streaming",
            "amount_minor": 1_299,
            "frequency": "monthly",
            "starts_at": "2026-01-31T12:00:00Z",
            "account_id": main,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sub["monthly_cost_minor"], 1_299);
    let id = sub["id"].as_str().unwrap().to_string();

    let (status, payment) = send(
        &app,
        Method::POST,
        &format!("/subscriptions/{id}/pay"),
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["transaction"]["kind"], "expense");
    assert_eq!(payment["subscription"]["payments_made"], 1);
    assert_eq!(
        payment["subscription"]["next_payment_date"],
        "2026-02-28T12:00:00Z"
    );

    let (status, summary) = send(
        &app,
        Method::GET,
        "/subscriptions/summary",
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["summaries"][0]["yearly_minor"], 12 * 1_299);

    let (status, _) = send(
        &app,
        Method::GET,
        "/subscriptions/upcoming?days=400",
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/subscriptions/{id}"),
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn manual_recurring_run_materializes_due_occurrences() {
    let app = app().await;
    register(&app, "alice@example.com").await;
    let main = new_account(&app, "alice@example.com", "Main", 0).await;

    let (status, template) = send(
        &app,
        Method::POST,
        "/transactions",
        Some("alice@example.com"),
        Some(json!({
            "kind": "expense",
            "amount_minor": 1_000,
            "occurred_at": "2025-01-15T12:00:00Z",
            "account_id": main,
            "recurrence": { "frequency": "monthly" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(template["recurring_rule_id"].is_string());

    let (status, report) = send(
        &app,
        Method::POST,
        "/recurring/run",
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["enqueued"], 1);
    assert_eq!(report["completed"], 1);
    assert!(report["materialized"].as_u64().unwrap() >= 12);

    let (_, stats) = send(
        &app,
        Method::GET,
        "/recurring/stats",
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(stats["completed"], 1);

    let (_, rules) = send(&app, Method::GET, "/recurring", Some("alice@example.com"), None).await;
    let rule_id = rules["rules"][0]["id"].as_str().unwrap().to_string();
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/recurring/{rule_id}"),
        Some("alice@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, rules) = send(&app, Method::GET, "/recurring", Some("alice@example.com"), None).await;
    assert_eq!(rules["rules"][0]["is_active"], false);
}
