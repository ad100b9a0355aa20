use sea_orm_migration::prelude::*;

use offercode_redeem_migration::Migrator;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
