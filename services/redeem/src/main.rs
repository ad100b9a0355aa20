use std::sync::Arc;
use std::time::Duration;

use sea_orm::Database;
use tracing::info;

use offercode_core::config::Config;
use offercode_core::tracing::init_tracing;
use offercode_redeem::config::RedeemConfig;
use offercode_redeem::infra::jwt::IssuerTokenSigner;
use offercode_redeem::router::build_router;
use offercode_redeem::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing("info");

    let config = RedeemConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let signer = IssuerTokenSigner::from_pem(
        config.issuer_key_id.clone(),
        config.issuer_id.clone(),
        &config.issuer_private_key,
    )
    .expect("invalid ISSUER_PRIVATE_KEY");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .expect("failed to build HTTP client");

    let state = AppState {
        db: Arc::new(db),
        http,
        signer: Arc::new(signer),
        policy: config.policy(),
        notices: config.notices(),
        mail_from: config.mail_from_header(),
        request_auth_key: config.request_auth_key,
        issuer_base_url: config.issuer_base_url,
        offer_code_id: config.offer_code_id,
        eligible_suffixes: config.eligible_suffixes,
        resend_base_url: config.resend_base_url,
        resend_api_key: config.resend_api_key,
        alert_webhook_url: config.alert_webhook_url,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.redeem_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("redeem service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
