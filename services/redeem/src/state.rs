use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::domain::types::AllocationPolicy;
use crate::infra::alert::WebhookAlerter;
use crate::infra::db::DbCodeRepository;
use crate::infra::issuer::HttpCodeIssuer;
use crate::infra::jwt::IssuerTokenSigner;
use crate::infra::mailer::ResendMailer;
use crate::usecase::notice::NoticeSettings;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    /// Outbound client; carries the per-request timeout.
    pub http: reqwest::Client,
    pub signer: Arc<IssuerTokenSigner>,
    pub request_auth_key: String,
    pub issuer_base_url: String,
    pub offer_code_id: String,
    pub policy: AllocationPolicy,
    pub notices: NoticeSettings,
    pub eligible_suffixes: Vec<String>,
    pub resend_base_url: String,
    pub resend_api_key: String,
    pub mail_from: String,
    pub alert_webhook_url: String,
}

impl AppState {
    pub fn code_repo(&self) -> DbCodeRepository {
        DbCodeRepository {
            db: Arc::clone(&self.db),
        }
    }

    pub fn code_issuer(&self) -> HttpCodeIssuer {
        HttpCodeIssuer::new(
            self.http.clone(),
            Arc::clone(&self.signer),
            &self.issuer_base_url,
            self.offer_code_id.clone(),
        )
    }

    pub fn mailer(&self) -> ResendMailer {
        ResendMailer::new(
            self.http.clone(),
            &self.resend_base_url,
            self.resend_api_key.clone(),
            self.mail_from.clone(),
        )
    }

    pub fn alerter(&self) -> WebhookAlerter {
        WebhookAlerter::new(
            self.http.clone(),
            self.alert_webhook_url.clone(),
            self.notices.app_name.clone(),
        )
    }
}
