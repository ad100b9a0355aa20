use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RedeemCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RedeemCodes::Value)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RedeemCodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RedeemCodes::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RedeemCodes::ClaimedBy).string())
                    .col(ColumnDef::new(RedeemCodes::ClaimedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(RedeemCodes::Redeemed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    // claim fields move together: all set or all unset
                    .check(Expr::cust(
                        "redeemed = (claimed_by IS NOT NULL) AND redeemed = (claimed_at IS NOT NULL)",
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(RedeemCodes::Table)
                    .col(RedeemCodes::ClaimedBy)
                    .col(RedeemCodes::ClaimedAt)
                    .name("idx_redeem_codes_claimed_by_claimed_at")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(RedeemCodes::Table)
                    .col(RedeemCodes::Redeemed)
                    .col(RedeemCodes::ExpiresAt)
                    .name("idx_redeem_codes_redeemed_expires_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RedeemCodes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RedeemCodes {
    Table,
    Value,
    CreatedAt,
    ExpiresAt,
    ClaimedBy,
    ClaimedAt,
    Redeemed,
}
