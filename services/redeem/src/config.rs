use chrono::Duration;
use serde::Deserialize;

use offercode_core::config::Config;

use crate::domain::types::{
    AllocationPolicy, DEFAULT_BATCH_SIZE, DEFAULT_ELIGIBLE_SUFFIXES, DEFAULT_VALIDITY_DAYS,
    ELIGIBILITY_WINDOW_DAYS, EXPIRY_BUFFER_DAYS,
};
use crate::usecase::notice::NoticeSettings;

/// Redeem service configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct RedeemConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port to listen on (default 3120). Env var: `REDEEM_PORT`.
    #[serde(default = "default_port")]
    pub redeem_port: u16,
    /// Shared secret callers send verbatim in the `Authorization` header.
    pub request_auth_key: String,

    /// Issuer origin, without trailing slash.
    #[serde(default = "default_issuer_base_url")]
    pub issuer_base_url: String,
    /// `kid` header of the signed issuer token.
    pub issuer_key_id: String,
    /// `iss` claim of the signed issuer token.
    pub issuer_id: String,
    /// PKCS#8 PEM of the ES256 signing key.
    pub issuer_private_key: String,
    /// Offer that minted codes belong to.
    pub offer_code_id: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
    #[serde(default = "default_expiry_buffer_days")]
    pub expiry_buffer_days: i64,
    #[serde(default = "default_eligibility_window_days")]
    pub eligibility_window_days: i64,
    /// Timeout applied to every outbound HTTP call.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    pub resend_api_key: String,
    #[serde(default = "default_resend_base_url")]
    pub resend_base_url: String,
    /// Sender address; shown as `{app_name} <{mail_from}>`.
    pub mail_from: String,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    pub contact_email: String,

    /// Operator chat-bot webhook.
    pub alert_webhook_url: String,

    /// Comma-separated address suffixes accepted as educational.
    #[serde(default = "default_eligible_suffixes")]
    pub eligible_suffixes: Vec<String>,
}

impl Config for RedeemConfig {}

fn default_port() -> u16 {
    3120
}

fn default_issuer_base_url() -> String {
    "https://api.appstoreconnect.apple.com".to_owned()
}

fn default_batch_size() -> u32 {
    DEFAULT_BATCH_SIZE
}

fn default_validity_days() -> u32 {
    DEFAULT_VALIDITY_DAYS
}

fn default_expiry_buffer_days() -> i64 {
    EXPIRY_BUFFER_DAYS
}

fn default_eligibility_window_days() -> i64 {
    ELIGIBILITY_WINDOW_DAYS
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_resend_base_url() -> String {
    "https://api.resend.com".to_owned()
}

fn default_app_name() -> String {
    "Offer Codes".to_owned()
}

fn default_eligible_suffixes() -> Vec<String> {
    DEFAULT_ELIGIBLE_SUFFIXES
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

impl RedeemConfig {
    pub fn policy(&self) -> AllocationPolicy {
        AllocationPolicy {
            eligibility_window: Duration::days(self.eligibility_window_days),
            expiry_buffer: Duration::days(self.expiry_buffer_days),
            batch_size: self.batch_size,
            validity_days: self.validity_days,
        }
    }

    pub fn notices(&self) -> NoticeSettings {
        NoticeSettings {
            app_name: self.app_name.clone(),
            contact_email: self.contact_email.clone(),
        }
    }

    pub fn mail_from_header(&self) -> String {
        format!("{} <{}>", self.app_name, self.mail_from)
    }
}
