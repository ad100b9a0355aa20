use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use offercode_core::serde::to_rfc3339_ms_opt;

use crate::error::RedeemServiceError;
use crate::state::AppState;
use crate::usecase::redeem::{RedeemInput, RedeemOutcome, RedeemUseCase};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub receiver_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResponse {
    pub outcome: &'static str,
    #[serde(
        serialize_with = "to_rfc3339_ms_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_claimed_at: Option<DateTime<Utc>>,
}

impl From<RedeemOutcome> for RedeemResponse {
    fn from(outcome: RedeemOutcome) -> Self {
        match outcome {
            RedeemOutcome::Issued => Self {
                outcome: "ISSUED",
                last_claimed_at: None,
            },
            RedeemOutcome::AlreadyRedeemed { last_claimed_at } => Self {
                outcome: "ALREADY_REDEEMED",
                last_claimed_at: Some(last_claimed_at),
            },
            RedeemOutcome::AddressNotEligible => Self {
                outcome: "ADDRESS_NOT_ELIGIBLE",
                last_claimed_at: None,
            },
        }
    }
}

fn authorized(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected)
}

/// Caller presented the shared request key.
///
/// Runs before the body extractor, so an unauthenticated request is answered
/// 401 whatever its body looks like.
#[derive(Debug, Clone, Copy)]
pub struct RequestKey;

impl FromRequestParts<AppState> for RequestKey {
    type Rejection = RedeemServiceError;

    // Checked synchronously; the returned future borrows nothing.
    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let ok = authorized(&parts.headers, &state.request_auth_key);
        async move {
            if ok {
                Ok(Self)
            } else {
                Err(RedeemServiceError::Unauthorized)
            }
        }
    }
}

pub async fn redeem(
    State(state): State<AppState>,
    _key: RequestKey,
    Json(body): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>, RedeemServiceError> {
    let usecase = RedeemUseCase {
        codes: state.code_repo(),
        issuer: state.code_issuer(),
        mailer: state.mailer(),
        alerter: state.alerter(),
        policy: state.policy,
        notices: state.notices.clone(),
        eligible_suffixes: state.eligible_suffixes.clone(),
    };
    let outcome = usecase
        .execute(
            RedeemInput {
                receiver_address: body.receiver_address,
            },
            Utc::now(),
        )
        .await?;
    Ok(Json(outcome.into()))
}
