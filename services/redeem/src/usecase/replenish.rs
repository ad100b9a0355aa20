use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::domain::repository::{CodeIssuer, CodeRepository};
use crate::domain::types::{AllocationPolicy, NewCode};
use crate::error::{IssuerError, RedeemServiceError};

/// Extract codes from an issuer export.
///
/// One code per line in the first comma-separated field. Blank lines, fields
/// shorter than two characters, fields with characters outside
/// `[A-Za-z0-9-]`, and repeats are dropped. Order is preserved.
pub fn parse_export(payload: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    payload
        .lines()
        .filter_map(|line| line.split(',').next())
        .map(str::trim)
        .filter(|code| code.len() > 1)
        .filter(|code| code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
        .filter(|code| seen.insert(*code))
        .map(str::to_owned)
        .collect()
}

/// Mint a batch, follow the deferred export, and persist every parsed code
/// in one all-or-nothing write.
pub struct ReplenishUseCase<R, I>
where
    R: CodeRepository,
    I: CodeIssuer,
{
    pub codes: R,
    pub issuer: I,
    pub policy: AllocationPolicy,
}

impl<R, I> ReplenishUseCase<R, I>
where
    R: CodeRepository,
    I: CodeIssuer,
{
    /// Returns the number of codes inserted.
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<u64, RedeemServiceError> {
        let request = self.policy.mint_request(now);
        tracing::info!(
            number_of_codes = request.number_of_codes,
            expiration_date = %request.expiration_date,
            "minting code batch"
        );

        // 1. Mint → pending export (link already checked against the issuer origin)
        let export = self.issuer.mint(&request).await?;

        // 2. Follow the export link
        let payload = self.issuer.fetch_export(&export).await?;

        // 3. Parse; an export without a single usable code is an issuer fault
        let values = parse_export(&payload);
        if values.is_empty() {
            return Err(IssuerError::EmptyExport.into());
        }

        // 4. Persist as one batch
        let expires_at = request.expires_at();
        let batch: Vec<NewCode> = values
            .into_iter()
            .map(|value| NewCode {
                value,
                created_at: now,
                expires_at,
            })
            .collect();
        let inserted = self.codes.insert_batch(&batch).await?;
        tracing::info!(inserted, "code batch persisted");
        Ok(inserted)
    }
}
