use std::sync::Arc;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter,
    QueryOrder, TransactionTrait,
    sea_query::{Expr, LockBehavior, LockType, Query},
};

use offercode_redeem_schema::redeem_codes;

use crate::domain::repository::CodeRepository;
use crate::domain::types::{Code, NewCode};
use crate::error::RedeemServiceError;

/// Rows per INSERT statement; keeps bind parameters well under the Postgres limit.
const INSERT_CHUNK: usize = 1_000;

// ── Code repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbCodeRepository {
    pub db: Arc<DatabaseConnection>,
}

impl CodeRepository for DbCodeRepository {
    async fn latest_claim(
        &self,
        requester: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, RedeemServiceError> {
        let model = redeem_codes::Entity::find()
            .filter(redeem_codes::Column::ClaimedBy.eq(requester))
            .filter(redeem_codes::Column::Redeemed.eq(true))
            .filter(redeem_codes::Column::ClaimedAt.gt(since))
            .filter(redeem_codes::Column::ClaimedAt.lte(until))
            .order_by_desc(redeem_codes::Column::ClaimedAt)
            .one(self.db.as_ref())
            .await
            .context("find latest claim")?;
        Ok(model.and_then(|m| m.claimed_at))
    }

    async fn insert_batch(&self, codes: &[NewCode]) -> Result<u64, RedeemServiceError> {
        if codes.is_empty() {
            return Ok(0);
        }
        let codes = codes.to_vec();
        let inserted = self
            .db
            .as_ref()
            .transaction::<_, u64, sea_orm::DbErr>(|txn| {
                Box::pin(async move {
                    let mut inserted = 0;
                    for chunk in codes.chunks(INSERT_CHUNK) {
                        inserted += redeem_codes::Entity::insert_many(
                            chunk.iter().map(new_code_active_model),
                        )
                        .exec_without_returning(txn)
                        .await?;
                    }
                    Ok(inserted)
                })
            })
            .await
            .context("insert redeem code batch")?;
        Ok(inserted)
    }

    async fn try_claim(
        &self,
        requester: &str,
        now: DateTime<Utc>,
        expires_after: DateTime<Utc>,
    ) -> Result<Option<Code>, RedeemServiceError> {
        // Candidate row is locked by the subquery; rows held by a concurrent
        // claim are skipped instead of waited on.
        let candidate = Query::select()
            .column(redeem_codes::Column::Value)
            .from(redeem_codes::Entity)
            .and_where(Expr::col(redeem_codes::Column::Redeemed).eq(false))
            .and_where(Expr::col(redeem_codes::Column::ExpiresAt).gt(expires_after))
            .order_by(redeem_codes::Column::ExpiresAt, Order::Asc)
            .limit(1)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .to_owned();

        let claimed = redeem_codes::Entity::update_many()
            .col_expr(redeem_codes::Column::ClaimedBy, Expr::value(requester))
            .col_expr(redeem_codes::Column::ClaimedAt, Expr::value(now))
            .col_expr(redeem_codes::Column::Redeemed, Expr::value(true))
            .filter(redeem_codes::Column::Value.in_subquery(candidate))
            .filter(redeem_codes::Column::Redeemed.eq(false))
            .exec_with_returning(self.db.as_ref())
            .await
            .context("claim redeem code")?;
        Ok(claimed.into_iter().next().map(code_from_model))
    }
}

fn new_code_active_model(code: &NewCode) -> redeem_codes::ActiveModel {
    redeem_codes::ActiveModel {
        value: Set(code.value.clone()),
        created_at: Set(code.created_at),
        expires_at: Set(code.expires_at),
        claimed_by: Set(None),
        claimed_at: Set(None),
        redeemed: Set(false),
    }
}

fn code_from_model(model: redeem_codes::Model) -> Code {
    Code {
        value: model.value,
        created_at: model.created_at,
        expires_at: model.expires_at,
        claimed_by: model.claimed_by,
        claimed_at: model.claimed_at,
        redeemed: model.redeemed,
    }
}
