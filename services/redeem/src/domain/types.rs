use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::IssuerError;

/// Single-use promotional code as stored in the code store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub redeemed: bool,
}

impl Code {
    /// Unclaimed and still valid past `expires_after` (now + safety buffer).
    pub fn is_claimable(&self, expires_after: DateTime<Utc>) -> bool {
        !self.redeemed && self.expires_at > expires_after
    }
}

/// Freshly exported code, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCode {
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    /// Already claimed inside the window; carries the most recent claim time.
    Ineligible { last_claimed_at: DateTime<Utc> },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Terminal state of one allocation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    Claimed(Code),
    NotEligible { last_claimed_at: DateTime<Utc> },
    Exhausted,
}

/// Tunables for eligibility, claimability and replenishment.
#[derive(Debug, Clone, Copy)]
pub struct AllocationPolicy {
    pub eligibility_window: Duration,
    pub expiry_buffer: Duration,
    pub batch_size: u32,
    pub validity_days: u32,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            eligibility_window: Duration::days(ELIGIBILITY_WINDOW_DAYS),
            expiry_buffer: Duration::days(EXPIRY_BUFFER_DAYS),
            batch_size: DEFAULT_BATCH_SIZE,
            validity_days: DEFAULT_VALIDITY_DAYS,
        }
    }
}

impl AllocationPolicy {
    /// Build the mint request for a batch issued at `now`.
    pub fn mint_request(&self, now: DateTime<Utc>) -> MintRequest {
        let expiration_date = (now + Duration::days(i64::from(self.validity_days))).date_naive();
        MintRequest {
            number_of_codes: self.batch_size,
            expiration_date,
        }
    }
}

/// Ask the issuer for a batch of one-time codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintRequest {
    pub number_of_codes: u32,
    pub expiration_date: NaiveDate,
}

impl MintRequest {
    /// Codes are treated as expiring at the start of their expiration date (UTC).
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expiration_date.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

/// Deferred bulk export returned by a mint call.
///
/// Only constructible through [`PendingExport::new`], which checks the link
/// against the issuer's expected prefix, so a value of this type is always
/// safe to follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExport {
    link: String,
}

impl PendingExport {
    pub fn new(link: impl Into<String>, expected_prefix: &str) -> Result<Self, IssuerError> {
        let link = link.into();
        if !link.starts_with(expected_prefix) {
            return Err(IssuerError::UnexpectedExportLink(link));
        }
        Ok(Self { link })
    }

    pub fn link(&self) -> &str {
        &self.link
    }
}

/// Outbound mail rendered by the notice builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Operator-facing failure report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorAlert {
    pub message: String,
    pub requester: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Lookback during which a requester may hold only one claimed code.
pub const ELIGIBILITY_WINDOW_DAYS: i64 = 365;

/// A code expiring within this many days of now is never handed out.
pub const EXPIRY_BUFFER_DAYS: i64 = 7;

/// Codes minted per replenishment.
pub const DEFAULT_BATCH_SIZE: u32 = 500;

/// Validity of minted codes in days.
pub const DEFAULT_VALIDITY_DAYS: u32 = 177;

/// Address suffixes accepted as educational.
pub const DEFAULT_ELIGIBLE_SUFFIXES: &[&str] = &[
    "bupt.cn", ".edu", ".edu.cn", ".edu.au", ".ac.uk", ".edu.sg", ".ac.jp", ".edu.hk", ".edu.tw",
    ".edu.in", ".ac.kr", ".edu.za", ".edu.br", ".edu.mx", ".edu.my", ".edu.ph", ".edu.pk",
    ".edu.pl", ".edu.ru", ".ac.th", ".edu.tr", ".edu.eg", ".edu.ng", ".edu.vn", ".edu.pe",
    ".edu.sa", ".edu.uy", ".edu.es", ".edu.fr", ".edu.it", ".edu.de",
];
