//! Fake one-time-code issuer.
//!
//! Serves the two calls the redeem service makes: a mint `POST` answering with
//! a deferred export link, and a `GET` on that link answering with CSV.
//! Binds to an ephemeral localhost port; the server task is aborted on drop.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

pub const MINT_PATH: &str = "/v1/subscriptionOfferCodeOneTimeUseCodes";

/// How the fake issuer answers.
#[derive(Debug, Clone)]
pub struct IssuerBehaviour {
    pub mint_status: u16,
    pub export_status: u16,
    pub export_body: String,
    /// Replace the export link in the mint response (e.g. a foreign origin).
    pub export_link: Option<String>,
    /// Return this raw body from mint instead of the JSON:API document.
    pub mint_body: Option<String>,
}

impl Default for IssuerBehaviour {
    fn default() -> Self {
        Self {
            mint_status: 200,
            export_status: 200,
            export_body: String::new(),
            export_link: None,
            mint_body: None,
        }
    }
}

impl IssuerBehaviour {
    /// Export one CSV line per code, in the `code,expiration` shape.
    pub fn with_codes(codes: &[&str]) -> Self {
        let export_body = codes
            .iter()
            .map(|c| format!("{c},2030-01-01\n"))
            .collect::<String>();
        Self {
            export_body,
            ..Self::default()
        }
    }
}

struct Inner {
    base_url: String,
    behaviour: IssuerBehaviour,
    mints: AtomicUsize,
    exports: AtomicUsize,
    last_mint_body: Mutex<Option<Value>>,
    authorizations: Mutex<Vec<String>>,
    accepts: Mutex<Vec<String>>,
}

pub struct FakeIssuer {
    inner: Arc<Inner>,
    handle: JoinHandle<()>,
}

impl FakeIssuer {
    pub async fn start(behaviour: IssuerBehaviour) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake issuer");
        let addr = listener.local_addr().expect("fake issuer addr");
        let inner = Arc::new(Inner {
            base_url: format!("http://{addr}"),
            behaviour,
            mints: AtomicUsize::new(0),
            exports: AtomicUsize::new(0),
            last_mint_body: Mutex::new(None),
            authorizations: Mutex::new(Vec::new()),
            accepts: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route(MINT_PATH, post(mint))
            .route(&format!("{MINT_PATH}/{{batch_id}}/values"), get(export))
            .with_state(Arc::clone(&inner));
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("fake issuer");
        });

        Self { inner, handle }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn mint_count(&self) -> usize {
        self.inner.mints.load(Ordering::SeqCst)
    }

    pub fn export_count(&self) -> usize {
        self.inner.exports.load(Ordering::SeqCst)
    }

    pub fn last_mint_body(&self) -> Option<Value> {
        self.inner.last_mint_body.lock().unwrap().clone()
    }

    /// `Authorization` header values seen across both calls, in arrival order.
    pub fn authorizations(&self) -> Vec<String> {
        self.inner.authorizations.lock().unwrap().clone()
    }

    /// `Accept` header values seen on export calls.
    pub fn export_accepts(&self) -> Vec<String> {
        self.inner.accepts.lock().unwrap().clone()
    }
}

impl Drop for FakeIssuer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn mint(State(inner): State<Arc<Inner>>, headers: HeaderMap, body: String) -> Response {
    inner.mints.fetch_add(1, Ordering::SeqCst);
    if let Some(auth) = header_str(&headers, header::AUTHORIZATION) {
        inner.authorizations.lock().unwrap().push(auth);
    }
    *inner.last_mint_body.lock().unwrap() = serde_json::from_str(&body).ok();

    let behaviour = &inner.behaviour;
    if behaviour.mint_status != 200 {
        return (status(behaviour.mint_status), "mint rejected").into_response();
    }
    if let Some(raw) = &behaviour.mint_body {
        return (StatusCode::OK, raw.clone()).into_response();
    }

    let link = behaviour
        .export_link
        .clone()
        .unwrap_or_else(|| format!("{}{MINT_PATH}/batch-1/values", inner.base_url));
    Json(json!({
        "data": {
            "type": "subscriptionOfferCodeOneTimeUseCodes",
            "id": "batch-1",
            "relationships": {
                "values": { "links": { "related": link } }
            }
        }
    }))
    .into_response()
}

async fn export(
    State(inner): State<Arc<Inner>>,
    Path(_batch_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    inner.exports.fetch_add(1, Ordering::SeqCst);
    if let Some(auth) = header_str(&headers, header::AUTHORIZATION) {
        inner.authorizations.lock().unwrap().push(auth);
    }
    if let Some(accept) = header_str(&headers, header::ACCEPT) {
        inner.accepts.lock().unwrap().push(accept);
    }

    let behaviour = &inner.behaviour;
    (
        status(behaviour.export_status),
        [(header::CONTENT_TYPE, "text/csv")],
        behaviour.export_body.clone(),
    )
        .into_response()
}
