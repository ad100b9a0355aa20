#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};

use crate::domain::types::{Code, Email, MintRequest, NewCode, OperatorAlert, PendingExport};
use crate::error::{IssuerError, RedeemServiceError};

/// Durable code store; the only place allocation state lives.
pub trait CodeRepository: Send + Sync {
    /// Most recent `claimed_at` of a redeemed code held by `requester`,
    /// restricted to `since < claimed_at <= until`.
    async fn latest_claim(
        &self,
        requester: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, RedeemServiceError>;

    /// Persist a batch all-or-nothing. Returns the number of rows inserted.
    async fn insert_batch(&self, codes: &[NewCode]) -> Result<u64, RedeemServiceError>;

    /// Atomically claim one unredeemed code with `expires_at > expires_after`
    /// for `requester` at `now`. `None` when no such code exists.
    ///
    /// Must be a single compare-and-set against the store: two concurrent
    /// calls never both receive the same code.
    async fn try_claim(
        &self,
        requester: &str,
        now: DateTime<Utc>,
        expires_after: DateTime<Utc>,
    ) -> Result<Option<Code>, RedeemServiceError>;
}

/// External authority that mints one-time codes.
pub trait CodeIssuer: Send + Sync {
    /// Request a batch; the issuer answers with a deferred export.
    async fn mint(&self, request: &MintRequest) -> Result<PendingExport, IssuerError>;

    /// Download the export body (delimited text, one code per line).
    async fn fetch_export(&self, export: &PendingExport) -> Result<String, IssuerError>;
}

/// Outbound mail delivery.
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), RedeemServiceError>;
}

/// Operator notification channel for systemic failures.
pub trait OperatorAlerter: Send + Sync {
    async fn alert(&self, alert: &OperatorAlert) -> Result<(), RedeemServiceError>;
}
