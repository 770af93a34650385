//! Server API tests

use super::*;
use failing_auth::FailingAuth;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use quire_core::{models::LedgerStatus, MockGateway, NewMagazine};
use tower::ServiceExt;

/// Auth provider whose backend is down
mod failing_auth {
    use quire_core::{AuthProvider, Error, Principal, Result};

    pub struct FailingAuth;

    #[axum::async_trait]
    impl AuthProvider for FailingAuth {
        async fn resolve_token(&self, _token: &str) -> Result<Option<Principal>> {
            Err(Error::InvalidData("auth backend unreachable".into()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }
}

const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";

fn test_auth() -> Arc<dyn AuthProvider> {
    Arc::new(
        StaticTokenAuth::new()
            .with_token(
                ALICE,
                Principal {
                    metadata: serde_json::json!({ "full_name": "Alice Kim" }),
                    ..Principal::new("alice").with_email("alice@example.com")
                },
            )
            .with_token(BOB, Principal::new("bob")),
    )
}

struct TestApp {
    app: Router,
    db: Database,
    gateway: Arc<MockGateway>,
}

fn setup_with_gateway(gateway: MockGateway) -> TestApp {
    let db = Database::in_memory().unwrap();
    let gateway = Arc::new(gateway);
    let app = create_router(
        db.clone(),
        None,
        ServerConfig::default(),
        test_auth(),
        Some(gateway.clone() as Arc<dyn PaymentGateway>),
    );
    TestApp { app, db, gateway }
}

fn setup_test_app() -> TestApp {
    setup_with_gateway(MockGateway::new())
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn charge_body(user: &str) -> serde_json::Value {
    serde_json::json!({
        "billingKey": "billing-key-1",
        "orderName": "Quire monthly",
        "amount": 9900,
        "customer": { "id": user },
        "customData": user
    })
}

/// Charge through the API and return the `paymentId` it answered with
async fn subscribe(test: &TestApp, user: &str, token: &str) -> String {
    let response = test
        .app
        .clone()
        .oneshot(json_request("POST", "/api/payments", Some(token), charge_body(user)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    json["paymentId"].as_str().unwrap().to_string()
}

// ========== Charge API Tests ==========

#[tokio::test]
async fn test_create_payment() {
    let test = setup_test_app();

    let response = test
        .app
        .clone()
        .oneshot(json_request("POST", "/api/payments", Some(ALICE), charge_body("alice")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["status"], "PAID");
    assert_eq!(json["replayed"], false);
    let payment_id = json["paymentId"].as_str().unwrap();
    assert!(payment_id.starts_with("tx-payment_"));
    assert_eq!(json["transactionKey"], payment_id);

    let entries = test.db.list_ledger_entries("alice").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount, 9900);
    assert_eq!(entries[0].transaction_key, payment_id);

    let audit = test.db.list_audit_log(10).unwrap();
    assert!(audit.iter().any(|a| a.action == "charge" && a.user_id == "alice"));
}

#[tokio::test]
async fn test_create_payment_with_session_cookie() {
    let test = setup_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/payments")
        .header("content-type", "application/json")
        .header("cookie", format!("theme=dark; {}={}", DEFAULT_SESSION_COOKIE, ALICE))
        .body(Body::from(charge_body("alice").to_string()))
        .unwrap();

    let response = test.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(test.gateway.charge_count(), 1);
}

#[tokio::test]
async fn test_create_payment_requires_auth() {
    let test = setup_test_app();

    let response = test
        .app
        .clone()
        .oneshot(json_request("POST", "/api/payments", None, charge_body("alice")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].is_string());

    // Unknown token is the same as none
    let response = test
        .app
        .clone()
        .oneshot(json_request("POST", "/api/payments", Some("nope"), charge_body("alice")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(test.gateway.charge_count(), 0);
}

#[tokio::test]
async fn test_create_payment_for_another_user_is_forbidden() {
    let test = setup_test_app();

    let response = test
        .app
        .clone()
        .oneshot(json_request("POST", "/api/payments", Some(BOB), charge_body("alice")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(test.gateway.charge_count(), 0);
    assert!(test.db.list_ledger_entries("alice").unwrap().is_empty());
}

#[tokio::test]
async fn test_create_payment_validation() {
    let test = setup_test_app();

    let mut body = charge_body("alice");
    body.as_object_mut().unwrap().remove("billingKey");
    let response = test
        .app
        .clone()
        .oneshot(json_request("POST", "/api/payments", Some(ALICE), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], false);

    let mut body = charge_body("alice");
    body["amount"] = serde_json::json!(0);
    let response = test
        .app
        .clone()
        .oneshot(json_request("POST", "/api/payments", Some(ALICE), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Validation is checked before authentication
    let response = test
        .app
        .clone()
        .oneshot(json_request("POST", "/api/payments", None, serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(test.gateway.charge_count(), 0);
}

#[tokio::test]
async fn test_create_payment_malformed_json() {
    let test = setup_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/payments")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", ALICE))
        .body(Body::from("{not json"))
        .unwrap();

    let response = test.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_create_payment_gateway_rejection_passthrough() {
    let test = setup_with_gateway(MockGateway::new().rejecting_charges(
        402,
        serde_json::json!({ "type": "PG_PROVIDER", "message": "Card declined" }),
    ));

    let response = test
        .app
        .clone()
        .oneshot(json_request("POST", "/api/payments", Some(ALICE), charge_body("alice")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Card declined");
    assert_eq!(json["details"]["type"], "PG_PROVIDER");
    assert!(test.db.list_ledger_entries("alice").unwrap().is_empty());
}

#[tokio::test]
async fn test_create_payment_without_gateway_is_500() {
    let db = Database::in_memory().unwrap();
    let app = create_router(db.clone(), None, ServerConfig::default(), test_auth(), None);

    let response = app
        .oneshot(json_request("POST", "/api/payments", Some(ALICE), charge_body("alice")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Server configuration error");
    assert!(db.list_ledger_entries("alice").unwrap().is_empty());
}

#[tokio::test]
async fn test_create_payment_pending_is_success() {
    let test = setup_with_gateway(MockGateway::new().with_charge_status("PENDING"));

    let response = test
        .app
        .clone()
        .oneshot(json_request("POST", "/api/payments", Some(ALICE), charge_body("alice")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["status"], "PENDING");
}

#[tokio::test]
async fn test_create_payment_idempotency_key() {
    let test = setup_test_app();
    let mut body = charge_body("alice");
    body["idempotencyKey"] = serde_json::json!("checkout-42");

    let mut payment_ids = Vec::new();
    for expected_replay in [false, true] {
        let response = test
            .app
            .clone()
            .oneshot(json_request("POST", "/api/payments", Some(ALICE), body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = get_body_json(response).await;
        assert_eq!(json["replayed"], expected_replay);
        assert_eq!(json["status"], "PAID");
        payment_ids.push(json["paymentId"].clone());
    }

    // Replay and original answer with the same id
    assert_eq!(payment_ids[0], payment_ids[1]);

    assert_eq!(test.gateway.charge_count(), 1);
    assert_eq!(test.db.list_ledger_entries("alice").unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_payment_succeeds_when_ledger_write_fails() {
    let test = setup_test_app();
    test.db
        .conn()
        .unwrap()
        .execute_batch("DROP TABLE payment")
        .unwrap();

    let response = test
        .app
        .clone()
        .oneshot(json_request("POST", "/api/payments", Some(ALICE), charge_body("alice")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(test.gateway.charge_count(), 1);
}

// ========== Cancel API Tests ==========

#[tokio::test]
async fn test_cancel_payment() {
    let test = setup_test_app();
    let key = subscribe(&test, "alice", ALICE).await;

    let response = test
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/payments/cancel",
            Some(ALICE),
            serde_json::json!({ "transactionKey": key }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json, serde_json::json!({ "success": true }));

    assert_eq!(test.gateway.cancel_count(), 1);
    let entries = test.db.list_ledger_entries("alice").unwrap();
    assert_eq!(entries[0].status, LedgerStatus::Cancel);
    assert_eq!(entries[0].amount, -9900);
}

#[tokio::test]
async fn test_cancel_with_payment_id_from_charge_response() {
    let test = setup_test_app();

    let response = test
        .app
        .clone()
        .oneshot(json_request("POST", "/api/payments", Some(ALICE), charge_body("alice")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let charged = get_body_json(response).await;

    let response = test
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/payments/cancel",
            Some(ALICE),
            serde_json::json!({ "transactionKey": charged["paymentId"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(test.gateway.cancel_count(), 1);
    assert!(!test
        .db
        .subscription_state("alice", chrono::Utc::now())
        .unwrap()
        .active);
}

#[tokio::test]
async fn test_cancel_unknown_key_is_404() {
    let test = setup_test_app();

    let response = test
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/payments/cancel",
            Some(ALICE),
            serde_json::json!({ "transactionKey": "tx-unknown" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(test.gateway.cancel_count(), 0);
    assert!(test.db.list_ledger_entries("alice").unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_other_users_subscription_is_404() {
    let test = setup_test_app();
    let key = subscribe(&test, "alice", ALICE).await;

    let response = test
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/payments/cancel",
            Some(BOB),
            serde_json::json!({ "transactionKey": key }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(test.gateway.cancel_count(), 0);
}

#[tokio::test]
async fn test_cancel_requires_bearer_token() {
    let test = setup_test_app();
    let key = subscribe(&test, "alice", ALICE).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/payments/cancel")
        .header("content-type", "application/json")
        .header("cookie", format!("{}={}", DEFAULT_SESSION_COOKIE, ALICE))
        .body(Body::from(serde_json::json!({ "transactionKey": key }).to_string()))
        .unwrap();

    let response = test.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(test.gateway.cancel_count(), 0);
}

#[tokio::test]
async fn test_cancel_missing_key_is_400() {
    let test = setup_test_app();

    let response = test
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/payments/cancel",
            Some(ALICE),
            serde_json::json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_gateway_rejection_passthrough() {
    let test = setup_with_gateway(MockGateway::new().rejecting_cancels(
        409,
        serde_json::json!({ "message": "Payment already cancelled" }),
    ));
    let key = subscribe(&test, "alice", ALICE).await;

    let response = test
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/payments/cancel",
            Some(ALICE),
            serde_json::json!({ "transactionKey": key }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Payment already cancelled");
    assert_eq!(test.db.list_ledger_entries("alice").unwrap().len(), 1);
}

// ========== Subscription / History API Tests ==========

#[tokio::test]
async fn test_subscription_status_flow() {
    let test = setup_test_app();

    let response = test
        .app
        .clone()
        .oneshot(get_request("/api/subscription", Some(ALICE)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["isSubscribed"], false);
    assert_eq!(json["statusMessage"], "Free");
    assert!(json.get("transactionKey").is_none());

    let key = subscribe(&test, "alice", ALICE).await;

    let response = test
        .app
        .clone()
        .oneshot(get_request("/api/subscription", Some(ALICE)))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["isSubscribed"], true);
    assert_eq!(json["statusMessage"], "Subscribed");
    assert_eq!(json["transactionKey"], key.as_str());

    // Bob's status is independent
    let response = test
        .app
        .clone()
        .oneshot(get_request("/api/subscription", Some(BOB)))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["isSubscribed"], false);
}

#[tokio::test]
async fn test_subscription_requires_auth() {
    let test = setup_test_app();
    let response = test
        .app
        .clone()
        .oneshot(get_request("/api/subscription", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_payment_history() {
    let test = setup_test_app();
    subscribe(&test, "alice", ALICE).await;
    subscribe(&test, "bob", BOB).await;

    let response = test
        .app
        .clone()
        .oneshot(get_request("/api/payments/history", Some(ALICE)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["userId"], "alice");
    assert_eq!(entries[0]["status"], "Paid");
    assert!(entries[0]["endGraceAt"].is_string());
}

#[tokio::test]
async fn test_get_me() {
    let test = setup_test_app();

    let response = test
        .app
        .clone()
        .oneshot(get_request("/api/me", Some(ALICE)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["id"], "alice");
    assert_eq!(json["nickname"], "Alice Kim");
    assert_eq!(json["email"], "alice@example.com");

    let response = test
        .app
        .clone()
        .oneshot(get_request("/api/me", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_provider_outage_fails_closed() {
    let db = Database::in_memory().unwrap();
    let gateway = Arc::new(MockGateway::new());
    let app = create_router(
        db.clone(),
        None,
        ServerConfig::default(),
        Arc::new(FailingAuth),
        Some(gateway.clone() as Arc<dyn PaymentGateway>),
    );

    let response = app
        .oneshot(json_request("POST", "/api/payments", Some(ALICE), charge_body("alice")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(gateway.charge_count(), 0);
    assert!(db.list_ledger_entries("alice").unwrap().is_empty());
}

// ========== Magazine API Tests ==========

fn sample_magazine() -> NewMagazine {
    NewMagazine {
        category: "culture".to_string(),
        title: "Night markets".to_string(),
        description: "Where the city eats after ten".to_string(),
        content: "The first stall opens at 22:00.".to_string(),
        tags: vec!["food".to_string()],
        image_url: None,
    }
}

#[tokio::test]
async fn test_list_magazines_is_public() {
    let test = setup_test_app();
    test.db.create_magazine("editor", &sample_magazine()).unwrap();
    test.db
        .create_magazine(
            "editor",
            &NewMagazine {
                category: "travel".to_string(),
                ..sample_magazine()
            },
        )
        .unwrap();

    let response = test
        .app
        .clone()
        .oneshot(get_request("/api/magazines", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert!(json[0].get("content").is_none());

    let response = test
        .app
        .clone()
        .oneshot(get_request("/api/magazines?category=travel", None))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["category"], "travel");
}

#[tokio::test]
async fn test_get_magazine_requires_active_subscription() {
    let test = setup_test_app();
    let magazine = test.db.create_magazine("editor", &sample_magazine()).unwrap();
    let uri = format!("/api/magazines/{}", magazine.id);

    let response = test.app.clone().oneshot(get_request(&uri, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = test
        .app
        .clone()
        .oneshot(get_request(&uri, Some(ALICE)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    subscribe(&test, "alice", ALICE).await;

    let response = test
        .app
        .clone()
        .oneshot(get_request(&uri, Some(ALICE)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["title"], "Night markets");
    assert_eq!(json["content"], "The first stall opens at 22:00.");

    let response = test
        .app
        .clone()
        .oneshot(get_request("/api/magazines/9999", Some(ALICE)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_magazine() {
    let test = setup_test_app();
    let body = serde_json::json!({
        "category": "design",
        "title": "Grids",
        "content": "Everything is a grid.",
        "tags": ["layout", " layout "]
    });

    let response = test
        .app
        .clone()
        .oneshot(json_request("POST", "/api/magazines", None, body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = test
        .app
        .clone()
        .oneshot(json_request("POST", "/api/magazines", Some(BOB), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["authorId"], "bob");
    assert_eq!(json["tags"], serde_json::json!(["layout"]));

    let response = test
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/magazines",
            Some(BOB),
            serde_json::json!({ "category": "design", "content": "No title" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Ambient Layer Tests ==========

#[tokio::test]
async fn test_security_headers() {
    let test = setup_test_app();
    let response = test
        .app
        .clone()
        .oneshot(get_request("/api/magazines", None))
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("content-security-policy").is_some());
}

#[tokio::test]
async fn test_static_dir_fallback() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>Quire</h1>").unwrap();

    let app = create_router(
        Database::in_memory().unwrap(),
        dir.path().to_str(),
        ServerConfig::default(),
        test_auth(),
        None,
    );

    let response = app.oneshot(get_request("/index.html", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"<h1>Quire</h1>");
}

#[test]
fn test_session_cookie_parsing() {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_static("a=1; sb-access-token=tok-123 ; b=2"),
    );
    assert_eq!(session_token(&headers, "sb-access-token"), Some("tok-123"));
    assert_eq!(session_token(&headers, "missing"), None);

    headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token="));
    assert_eq!(session_token(&headers, "sb-access-token"), None);
}

#[test]
fn test_core_error_status_mapping() {
    use quire_core::Error;

    let cases = [
        (Error::Validation("x".into()), StatusCode::BAD_REQUEST),
        (Error::Unauthenticated("x".into()), StatusCode::UNAUTHORIZED),
        (Error::Forbidden("x".into()), StatusCode::FORBIDDEN),
        (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
        (Error::Configuration("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (
            Error::Gateway {
                status: 200,
                message: "odd".into(),
                details: serde_json::Value::Null,
            },
            StatusCode::BAD_GATEWAY,
        ),
        (
            Error::Gateway {
                status: 503,
                message: "down".into(),
                details: serde_json::Value::Null,
            },
            StatusCode::SERVICE_UNAVAILABLE,
        ),
        (Error::InvalidData("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (err, expected) in cases {
        assert_eq!(AppError::from(err).status(), expected);
    }
}
