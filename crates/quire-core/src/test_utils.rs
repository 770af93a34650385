//! Test utilities for quire-core
//!
//! Mock PortOne and Supabase servers bound to an ephemeral local port, for unit
//! tests here and for integration tests in dependent crates (`test-utils` feature).

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// A request received by [`MockPortOneServer`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

type Recorder = Arc<Mutex<Vec<RecordedRequest>>>;

/// Start `app` on 127.0.0.1 and return its address plus a shutdown handle
async fn spawn(app: Router) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .unwrap();
    });

    (addr, shutdown_tx)
}

/// Mock PortOne v2 API
///
/// Charges succeed with `PAID` except for the billing keys `billing-key-pending`
/// (200, `PENDING`) and `billing-key-declined` (400). Cancels succeed except for
/// the transaction key `tx-already-cancelled` (409).
///
/// [`MockPortOneServer::start_truncating`] instead answers every request with
/// `200 OK` and a body that ends before its declared length.
pub struct MockPortOneServer {
    addr: SocketAddr,
    requests: Recorder,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockPortOneServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let requests: Recorder = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route("/payments/:payment_id/billing-key", post(handle_charge))
            .route("/payments/:transaction_key/cancel", post(handle_cancel))
            .with_state(requests.clone());

        let (addr, shutdown_tx) = spawn(app).await;

        Self {
            addr,
            requests,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Start a server whose 2xx responses break off mid-body
    pub async fn start_truncating() -> Self {
        let requests: Recorder = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let recorder = requests.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, _)) => {
                            tokio::spawn(answer_truncated(stream, recorder.clone()));
                        }
                        Err(_) => break,
                    },
                }
            }
        });

        Self {
            addr,
            requests,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockPortOneServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn record(requests: &Recorder, path: String, headers: &HeaderMap, body: &Bytes) -> RecordedRequest {
    let request = RecordedRequest {
        path,
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(body).unwrap_or(serde_json::Value::Null),
    };
    requests.lock().unwrap().push(request.clone());
    request
}

/// Read one HTTP/1.1 request, record it, then send `200 OK` with a short body
async fn answer_truncated(mut stream: TcpStream, requests: Recorder) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let (head_len, body_len) = loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]);
            let body_len = header_value(&head, "content-length")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0);
            break (pos + 4, body_len);
        }
    };
    while buf.len() < head_len + body_len {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&buf[..head_len]).into_owned();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string();
    requests.lock().unwrap().push(RecordedRequest {
        path,
        authorization: header_value(&head, "authorization"),
        body: serde_json::from_slice(&buf[head_len..head_len + body_len])
            .unwrap_or(serde_json::Value::Null),
    });

    let partial: &[u8] = b"{\"payment\":{\"id\":\"tx-";
    let head = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        partial.len() + 64
    );
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(partial).await;
    let _ = stream.shutdown().await;
}

fn header_value(head: &str, name: &str) -> Option<String> {
    head.lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim().to_string())
}

async fn handle_charge(
    State(requests): State<Recorder>,
    Path(payment_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let request = record(
        &requests,
        format!("/payments/{}/billing-key", payment_id),
        &headers,
        &body,
    );

    match request.body["billingKey"].as_str() {
        Some("billing-key-declined") => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "type": "PG_PROVIDER", "message": "Card declined" })),
        ),
        Some("billing-key-pending") => (
            StatusCode::OK,
            Json(json!({ "id": format!("tx-{}", payment_id), "status": "PENDING" })),
        ),
        _ => (
            StatusCode::OK,
            Json(json!({ "payment": { "id": format!("tx-{}", payment_id), "status": "PAID" } })),
        ),
    }
}

async fn handle_cancel(
    State(requests): State<Recorder>,
    Path(transaction_key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    record(
        &requests,
        format!("/payments/{}/cancel", transaction_key),
        &headers,
        &body,
    );

    if transaction_key == "tx-already-cancelled" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "type": "PAYMENT_ALREADY_CANCELLED", "message": "Payment already cancelled" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({ "cancellation": { "status": "SUCCEEDED" } })),
    )
}

/// Mock Supabase auth API
///
/// Accepts the project key `anon-key`. A bearer token `token-<user>` resolves to
/// `<user>`; `token-outage` answers 503; anything else is rejected with 401.
pub struct MockSupabaseServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockSupabaseServer {
    pub const API_KEY: &'static str = "anon-key";

    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new().route("/auth/v1/user", get(handle_user));
        let (addr, shutdown_tx) = spawn(app).await;

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockSupabaseServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_user(headers: HeaderMap) -> impl IntoResponse {
    let unauthorized = (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "msg": "Invalid JWT" })),
    );

    let api_key = headers.get("apikey").and_then(|v| v.to_str().ok());
    if api_key != Some(MockSupabaseServer::API_KEY) {
        return unauthorized;
    }

    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some("token-outage") => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "msg": "upstream unavailable" })),
        ),
        Some(token) => match token.strip_prefix("token-").filter(|u| !u.is_empty()) {
            Some(user) => (
                StatusCode::OK,
                Json(json!({
                    "id": user,
                    "email": format!("{}@example.com", user),
                    "created_at": "2024-07-03T09:30:00Z",
                    "user_metadata": { "full_name": "Test Reader" }
                })),
            ),
            None => unauthorized,
        },
        None => unauthorized,
    }
}
