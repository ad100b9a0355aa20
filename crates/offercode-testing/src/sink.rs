//! HTTP sink that accepts any `POST` and records it.
//!
//! Stands in for the mail API and the operator webhook in tests.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use serde_json::Value;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

struct Inner {
    status: StatusCode,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct RecordingSink {
    base_url: String,
    inner: Arc<Inner>,
    handle: JoinHandle<()>,
}

impl RecordingSink {
    /// Start a sink answering every request with 200.
    pub async fn start() -> Self {
        Self::start_with_status(200).await
    }

    pub async fn start_with_status(status: u16) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind recording sink");
        let addr = listener.local_addr().expect("recording sink addr");
        let inner = Arc::new(Inner {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::OK),
            requests: Mutex::new(Vec::new()),
        });
        let router = Router::new()
            .fallback(record)
            .with_state(Arc::clone(&inner));
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("recording sink");
        });
        Self {
            base_url: format!("http://{addr}"),
            inner,
            handle,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests.lock().unwrap().clone()
    }
}

impl Drop for RecordingSink {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn record(
    State(inner): State<Arc<Inner>>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    inner.requests.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_owned(),
        authorization,
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });
    inner.status
}
