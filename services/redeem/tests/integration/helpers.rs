use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use offercode_redeem::domain::repository::{CodeIssuer, CodeRepository, Mailer, OperatorAlerter};
use offercode_redeem::domain::types::{
    AllocationPolicy, Code, Email, MintRequest, NewCode, OperatorAlert, PendingExport,
};
use offercode_redeem::error::{IssuerError, RedeemServiceError};
use offercode_redeem::usecase::notice::NoticeSettings;

// ── InMemoryCodeRepo ─────────────────────────────────────────────────────────

/// Code store backed by a mutex-guarded vector. `try_claim` yields before
/// taking the lock so concurrent allocations genuinely interleave.
#[derive(Clone, Default)]
pub struct InMemoryCodeRepo {
    pub codes: Arc<Mutex<Vec<Code>>>,
    pub fail_insert: bool,
    pub fail_claim: bool,
    pub fail_read: bool,
    pub claim_calls: Arc<AtomicUsize>,
}

impl InMemoryCodeRepo {
    pub fn new(codes: Vec<Code>) -> Self {
        Self {
            codes: Arc::new(Mutex::new(codes)),
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a shared handle to the internal code list for post-execution inspection.
    pub fn codes_handle(&self) -> Arc<Mutex<Vec<Code>>> {
        Arc::clone(&self.codes)
    }

    pub fn claim_calls(&self) -> usize {
        self.claim_calls.load(Ordering::SeqCst)
    }
}

impl CodeRepository for InMemoryCodeRepo {
    async fn latest_claim(
        &self,
        requester: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, RedeemServiceError> {
        if self.fail_read {
            return Err(anyhow::anyhow!("read failed").into());
        }
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.redeemed && c.claimed_by.as_deref() == Some(requester))
            .filter_map(|c| c.claimed_at)
            .filter(|at| *at > since && *at <= until)
            .max())
    }

    async fn insert_batch(&self, batch: &[NewCode]) -> Result<u64, RedeemServiceError> {
        if self.fail_insert {
            return Err(anyhow::anyhow!("write interrupted").into());
        }
        let mut codes = self.codes.lock().unwrap();
        // unique violation aborts the whole batch
        if batch
            .iter()
            .any(|n| codes.iter().any(|c| c.value == n.value))
        {
            return Err(anyhow::anyhow!("duplicate code value").into());
        }
        codes.extend(batch.iter().map(|n| Code {
            value: n.value.clone(),
            created_at: n.created_at,
            expires_at: n.expires_at,
            claimed_by: None,
            claimed_at: None,
            redeemed: false,
        }));
        Ok(batch.len() as u64)
    }

    async fn try_claim(
        &self,
        requester: &str,
        now: DateTime<Utc>,
        expires_after: DateTime<Utc>,
    ) -> Result<Option<Code>, RedeemServiceError> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_claim {
            return Err(anyhow::anyhow!("claim failed").into());
        }
        let mut codes = self.codes.lock().unwrap();
        let candidate = codes
            .iter_mut()
            .filter(|c| c.is_claimable(expires_after))
            .min_by_key(|c| c.expires_at);
        Ok(candidate.map(|c| {
            c.claimed_by = Some(requester.to_owned());
            c.claimed_at = Some(now);
            c.redeemed = true;
            c.clone()
        }))
    }
}

// ── MockIssuer ───────────────────────────────────────────────────────────────

pub const MOCK_EXPORT_PREFIX: &str = "https://issuer.test/v1/exports/";

/// Issuer returning queued export payloads, one per mint.
#[derive(Clone, Default)]
pub struct MockIssuer {
    pub exports: Arc<Mutex<VecDeque<String>>>,
    pub mint_status: Option<u16>,
    pub mints: Arc<AtomicUsize>,
}

impl MockIssuer {
    pub fn with_batches(batches: Vec<Vec<&str>>) -> Self {
        let exports = batches
            .into_iter()
            .map(|codes| codes.iter().map(|c| format!("{c}\n")).collect::<String>())
            .collect();
        Self {
            exports: Arc::new(Mutex::new(exports)),
            ..Self::default()
        }
    }

    pub fn rejecting(status: u16) -> Self {
        Self {
            mint_status: Some(status),
            ..Self::default()
        }
    }

    pub fn mint_count(&self) -> usize {
        self.mints.load(Ordering::SeqCst)
    }
}

impl CodeIssuer for MockIssuer {
    async fn mint(&self, _request: &MintRequest) -> Result<PendingExport, IssuerError> {
        let n = self.mints.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.mint_status {
            return Err(IssuerError::MintRejected(status));
        }
        PendingExport::new(format!("{MOCK_EXPORT_PREFIX}{n}"), MOCK_EXPORT_PREFIX)
    }

    async fn fetch_export(&self, _export: &PendingExport) -> Result<String, IssuerError> {
        Ok(self.exports.lock().unwrap().pop_front().unwrap_or_default())
    }
}

// ── RecordingMailer / RecordingAlerter ───────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<Email>>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), RedeemServiceError> {
        if self.fail {
            return Err(RedeemServiceError::Notification(anyhow::anyhow!(
                "mail api down"
            )));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingAlerter {
    pub alerts: Arc<Mutex<Vec<OperatorAlert>>>,
}

impl RecordingAlerter {
    pub fn alerts(&self) -> Vec<OperatorAlert> {
        self.alerts.lock().unwrap().clone()
    }
}

impl OperatorAlerter for RecordingAlerter {
    async fn alert(&self, alert: &OperatorAlert) -> Result<(), RedeemServiceError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

// ── Test fixture helpers ─────────────────────────────────────────────────────

pub const STUDENT: &str = "student@uni.edu";
pub const OTHER_STUDENT: &str = "other@college.ac.uk";

pub fn unclaimed_code(value: &str, expires_at: DateTime<Utc>) -> Code {
    Code {
        value: value.to_owned(),
        created_at: expires_at - Duration::days(177),
        expires_at,
        claimed_by: None,
        claimed_at: None,
        redeemed: false,
    }
}

pub fn claimed_code(value: &str, requester: &str, claimed_at: DateTime<Utc>) -> Code {
    Code {
        value: value.to_owned(),
        created_at: claimed_at - Duration::days(1),
        expires_at: claimed_at + Duration::days(176),
        claimed_by: Some(requester.to_owned()),
        claimed_at: Some(claimed_at),
        redeemed: true,
    }
}

pub fn policy() -> AllocationPolicy {
    AllocationPolicy::default()
}

/// Policy whose minted codes expire inside the safety buffer, so a
/// replenishment never yields a claimable code.
pub fn short_validity_policy() -> AllocationPolicy {
    AllocationPolicy {
        validity_days: 3,
        ..AllocationPolicy::default()
    }
}

pub fn notices() -> NoticeSettings {
    NoticeSettings {
        app_name: "Numpkin".to_owned(),
        contact_email: "hi@numpkin.app".to_owned(),
    }
}
