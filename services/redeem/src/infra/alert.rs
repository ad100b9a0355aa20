use anyhow::Context as _;
use chrono::FixedOffset;
use reqwest::Client;
use serde_json::json;

use crate::domain::repository::OperatorAlerter;
use crate::domain::types::OperatorAlert;
use crate::error::RedeemServiceError;

/// Posts interactive-card messages to a chat-bot webhook.
#[derive(Clone)]
pub struct WebhookAlerter {
    client: Client,
    url: String,
    app_name: String,
}

impl WebhookAlerter {
    pub fn new(client: Client, url: String, app_name: String) -> Self {
        Self {
            client,
            url,
            app_name,
        }
    }
}

/// Operators read alert times in UTC+8.
const OPERATOR_UTC_OFFSET_SECS: i32 = 8 * 60 * 60;

fn card_payload(alert: &OperatorAlert, app_name: &str) -> serde_json::Value {
    let local_time = FixedOffset::east_opt(OPERATOR_UTC_OFFSET_SECS)
        .map(|tz| alert.occurred_at.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| alert.occurred_at.to_rfc3339());
    json!({
        "msg_type": "interactive",
        "card": {
            "elements": [
                { "tag": "markdown", "content": format!("**Error**: {}", alert.message) },
                {
                    "tag": "markdown",
                    "content": format!(
                        "**Requester**: {}",
                        alert.requester.as_deref().unwrap_or("unknown")
                    )
                },
                { "tag": "markdown", "content": format!("**Time**: {local_time}") }
            ],
            "header": {
                "template": "blue",
                "title": {
                    "content": format!("Service problem - {app_name} offer code distribution"),
                    "tag": "plain_text"
                }
            }
        }
    })
}

impl OperatorAlerter for WebhookAlerter {
    async fn alert(&self, alert: &OperatorAlert) -> Result<(), RedeemServiceError> {
        self.client
            .post(&self.url)
            .json(&card_payload(alert, &self.app_name))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .context("post operator alert")
            .map_err(RedeemServiceError::Notification)?;
        Ok(())
    }
}
