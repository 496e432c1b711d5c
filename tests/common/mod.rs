//! Stub answering service shared by the integration tests.
//!
//! Serves `POST /api/query` with a canned status and body, records every
//! request it receives, and answers `GET /health`.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const REFUND_ANSWER: &str = r#"{
    "answer": "Refunds are available within 30 days.",
    "sources": [
        {"document_name": "policy.pdf", "chunk_id": "c1", "text_content": "...",
         "document_type": "pdf", "page_number": 2}
    ]
}"#;

/// A request as the stub saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub content_type: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Clone)]
pub struct Stub {
    status: StatusCode,
    body: String,
    delay: Duration,
    health: &'static str,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Stub {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
            delay: Duration::ZERO,
            health: "healthy",
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn answering(body: &str) -> Self {
        Self::new(200, body)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_health(mut self, status: &'static str) -> Self {
        self.health = status;
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/api/query", post(handle_query))
            .route("/health", get(handle_health))
            .with_state(self.clone())
    }

    /// Serve on an ephemeral port inside the current tokio runtime.
    pub async fn spawn(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = self.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Serve from a background thread with its own runtime, for tests that
    /// run the `ragq` binary as a subprocess.
    pub fn spawn_in_thread(&self) -> String {
        let app = self.router();
        let (tx, rx) = std::sync::mpsc::channel::<SocketAddr>();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });
        format!("http://{}", rx.recv().unwrap())
    }
}

async fn handle_query(
    State(stub): State<Stub>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let recorded = Recorded {
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(&body).unwrap_or(serde_json::Value::Null),
    };
    stub.requests.lock().unwrap().push(recorded);

    if !stub.delay.is_zero() {
        tokio::time::sleep(stub.delay).await;
    }

    (
        stub.status,
        [(header::CONTENT_TYPE, "application/json")],
        stub.body.clone(),
    )
}

async fn handle_health(State(stub): State<Stub>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": stub.health }))
}
