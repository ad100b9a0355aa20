use anyhow::Context as _;
use reqwest::Client;
use serde::Serialize;

use crate::domain::repository::Mailer;
use crate::domain::types::Email;
use crate::error::RedeemServiceError;

/// Sends notices through the Resend HTTP API.
#[derive(Clone)]
pub struct ResendMailer {
    client: Client,
    base_url: String,
    api_key: String,
    /// Full `From` header, e.g. `Offer Codes <noreply@example.com>`.
    from: String,
}

#[derive(Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl ResendMailer {
    pub fn new(client: Client, base_url: &str, api_key: String, from: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
            from,
        }
    }
}

impl Mailer for ResendMailer {
    async fn send(&self, email: &Email) -> Result<(), RedeemServiceError> {
        let body = SendEmailBody {
            from: &self.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
        };
        self.client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .context("send email")
            .map_err(RedeemServiceError::Notification)?;
        tracing::info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}
