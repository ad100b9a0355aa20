use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failures talking to the external code issuer.
#[derive(Debug, thiserror::Error)]
pub enum IssuerError {
    #[error("failed to sign issuer token")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("issuer request failed")]
    Transport(#[from] reqwest::Error),
    #[error("issuer returned HTTP {0} when minting codes")]
    MintRejected(u16),
    #[error("issuer returned HTTP {0} when exporting codes")]
    ExportRejected(u16),
    #[error("malformed mint response")]
    MalformedMintResponse(#[source] serde_json::Error),
    #[error("export link {0} is outside the issuer origin")]
    UnexpectedExportLink(String),
    #[error("issuer export contained no codes")]
    EmptyExport,
}

/// Redeem service error variants.
#[derive(Debug, thiserror::Error)]
pub enum RedeemServiceError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("no redeem code available")]
    PoolExhausted,
    #[error(transparent)]
    Issuer(#[from] IssuerError),
    #[error("code store failure")]
    Store(#[from] anyhow::Error),
    #[error("notification delivery failed")]
    Notification(#[source] anyhow::Error),
}

impl RedeemServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::PoolExhausted => "POOL_EXHAUSTED",
            Self::Issuer(_) => "ISSUER_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::Notification(_) => "NOTIFICATION_ERROR",
        }
    }

    /// Full cause chain on one line, for logs and operator alerts.
    pub fn detail(&self) -> String {
        let mut detail = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        detail
    }
}

impl IntoResponse for RedeemServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::PoolExhausted => StatusCode::SERVICE_UNAVAILABLE,
            Self::Issuer(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) | Self::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // tower-http TraceLayer already records method/uri/status; only server-side
        // failures get their cause chain logged here.
        if status.is_server_error() {
            tracing::error!(error = %self.detail(), kind = self.kind(), "request failed");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
