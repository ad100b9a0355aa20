use chrono::{DateTime, Utc};

use crate::domain::repository::{CodeIssuer, CodeRepository, Mailer, OperatorAlerter};
use crate::domain::types::{Allocation, AllocationPolicy, OperatorAlert};
use crate::error::RedeemServiceError;
use crate::usecase::allocate::AllocateUseCase;
use crate::usecase::notice::NoticeSettings;

/// `true` if the address ends with one of the accepted suffixes (case-insensitive).
pub fn has_eligible_suffix(address: &str, suffixes: &[String]) -> bool {
    let address = address.trim().to_ascii_lowercase();
    suffixes
        .iter()
        .any(|suffix| address.ends_with(&suffix.to_ascii_lowercase()))
}

pub struct RedeemInput {
    pub receiver_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    Issued,
    AlreadyRedeemed { last_claimed_at: DateTime<Utc> },
    AddressNotEligible,
}

/// Full request flow: suffix check, allocation, and the matching notice.
/// Failures page the operator and tell the requester something went wrong.
pub struct RedeemUseCase<R, I, M, A>
where
    R: CodeRepository + Clone,
    I: CodeIssuer + Clone,
    M: Mailer,
    A: OperatorAlerter,
{
    pub codes: R,
    pub issuer: I,
    pub mailer: M,
    pub alerter: A,
    pub policy: AllocationPolicy,
    pub notices: NoticeSettings,
    pub eligible_suffixes: Vec<String>,
}

impl<R, I, M, A> RedeemUseCase<R, I, M, A>
where
    R: CodeRepository + Clone,
    I: CodeIssuer + Clone,
    M: Mailer,
    A: OperatorAlerter,
{
    pub async fn execute(
        &self,
        input: RedeemInput,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome, RedeemServiceError> {
        let address = input.receiver_address.trim();
        match self.allocate_and_notify(address, now).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.report_failure(address, &err, now).await;
                Err(err)
            }
        }
    }

    async fn allocate_and_notify(
        &self,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome, RedeemServiceError> {
        if !has_eligible_suffix(address, &self.eligible_suffixes) {
            tracing::info!(requester = address, "address not eligible");
            self.mailer
                .send(&self.notices.address_not_eligible(address))
                .await?;
            return Ok(RedeemOutcome::AddressNotEligible);
        }

        let allocation = AllocateUseCase {
            codes: self.codes.clone(),
            issuer: self.issuer.clone(),
            policy: self.policy,
        }
        .execute(address, now)
        .await?;

        match allocation {
            Allocation::Claimed(code) => {
                self.mailer
                    .send(&self.notices.code_issued(address, &code.value, code.expires_at))
                    .await?;
                Ok(RedeemOutcome::Issued)
            }
            Allocation::NotEligible { last_claimed_at } => {
                self.mailer
                    .send(&self.notices.already_redeemed(address, last_claimed_at))
                    .await?;
                Ok(RedeemOutcome::AlreadyRedeemed { last_claimed_at })
            }
            Allocation::Exhausted => Err(RedeemServiceError::PoolExhausted),
        }
    }

    /// Best effort: delivery failures here are logged, never returned.
    async fn report_failure(&self, address: &str, err: &RedeemServiceError, now: DateTime<Utc>) {
        let detail = err.detail();
        tracing::error!(requester = address, error = %detail, kind = err.kind(), "redeem failed");

        let alert = OperatorAlert {
            message: detail,
            requester: Some(address.to_owned()).filter(|a| !a.is_empty()),
            occurred_at: now,
        };
        if let Err(e) = self.alerter.alert(&alert).await {
            tracing::error!(error = %e.detail(), "operator alert failed");
        }

        if address.is_empty() {
            return;
        }
        if let Err(e) = self.mailer.send(&self.notices.technical_issue(address)).await {
            tracing::error!(requester = address, error = %e.detail(), "technical issue notice failed");
        }
    }
}
