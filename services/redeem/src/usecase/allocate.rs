use chrono::{DateTime, Utc};

use crate::domain::repository::{CodeIssuer, CodeRepository};
use crate::domain::types::{Allocation, AllocationPolicy, Eligibility};
use crate::error::RedeemServiceError;
use crate::usecase::eligibility::EligibilityChecker;
use crate::usecase::replenish::ReplenishUseCase;

/// Which claim attempt is running. At most one replenishment sits between
/// the two; a miss on the second attempt is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClaimAttempt {
    First,
    AfterReplenish,
}

/// Eligibility check → claim → (replenish → claim) for one requester.
///
/// Holds no state across calls; all coordination between concurrent
/// allocations goes through the store's atomic claim.
pub struct AllocateUseCase<R, I>
where
    R: CodeRepository + Clone,
    I: CodeIssuer + Clone,
{
    pub codes: R,
    pub issuer: I,
    pub policy: AllocationPolicy,
}

impl<R, I> AllocateUseCase<R, I>
where
    R: CodeRepository + Clone,
    I: CodeIssuer + Clone,
{
    pub async fn execute(
        &self,
        requester: &str,
        now: DateTime<Utc>,
    ) -> Result<Allocation, RedeemServiceError> {
        // 1. Eligibility
        let eligibility = EligibilityChecker {
            codes: self.codes.clone(),
            window: self.policy.eligibility_window,
        }
        .check(requester, now)
        .await?;
        if let Eligibility::Ineligible { last_claimed_at } = eligibility {
            tracing::info!(requester, %last_claimed_at, "requester claimed within window");
            return Ok(Allocation::NotEligible { last_claimed_at });
        }

        // 2. Claim, replenishing at most once
        let expires_after = now + self.policy.expiry_buffer;
        let mut attempt = ClaimAttempt::First;
        loop {
            if let Some(code) = self.codes.try_claim(requester, now, expires_after).await? {
                tracing::info!(requester, ?attempt, "code claimed");
                return Ok(Allocation::Claimed(code));
            }
            match attempt {
                ClaimAttempt::First => {
                    tracing::info!(requester, "pool empty, replenishing");
                    self.replenish(now).await?;
                    attempt = ClaimAttempt::AfterReplenish;
                }
                ClaimAttempt::AfterReplenish => {
                    tracing::warn!(requester, "pool still empty after replenishment");
                    return Ok(Allocation::Exhausted);
                }
            }
        }
    }

    async fn replenish(&self, now: DateTime<Utc>) -> Result<u64, RedeemServiceError> {
        ReplenishUseCase {
            codes: self.codes.clone(),
            issuer: self.issuer.clone(),
            policy: self.policy,
        }
        .execute(now)
        .await
    }
}
