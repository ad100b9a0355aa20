use chrono::{DateTime, Duration, Utc};

use crate::domain::repository::CodeRepository;
use crate::domain::types::Eligibility;
use crate::error::RedeemServiceError;

/// Decides whether a requester may receive another code.
///
/// A requester with a claim at `T` is ineligible for `now` in `[T, T + window)`
/// and eligible again from `T + window`. Read-only.
pub struct EligibilityChecker<R: CodeRepository> {
    pub codes: R,
    pub window: Duration,
}

impl<R: CodeRepository> EligibilityChecker<R> {
    pub async fn check(
        &self,
        requester: &str,
        now: DateTime<Utc>,
    ) -> Result<Eligibility, RedeemServiceError> {
        let since = now - self.window;
        let last = self.codes.latest_claim(requester, since, now).await?;
        Ok(match last {
            Some(last_claimed_at) => Eligibility::Ineligible { last_claimed_at },
            None => Eligibility::Eligible,
        })
    }

    pub async fn is_eligible(
        &self,
        requester: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RedeemServiceError> {
        Ok(self.check(requester, now).await?.is_eligible())
    }
}
