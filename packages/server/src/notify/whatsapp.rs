use std::time::Duration;

use serde_json::json;

use super::mailer::MailError;
use crate::config::WhatsAppConfig;

const GRAPH_API: &str = "https://graph.facebook.com/v20.0";

/// Sends short text messages through the WhatsApp Cloud API.
pub struct WhatsAppClient {
    client: reqwest::Client,
    url: String,
    token: String,
    to: String,
}

impl WhatsAppClient {
    /// `None` unless token, phone number id and recipient are all set.
    pub fn from_config(
        config: &WhatsAppConfig,
        timeout: Duration,
    ) -> Result<Option<Self>, MailError> {
        let (Some(token), Some(phone_number_id), Some(to)) =
            (&config.token, &config.phone_number_id, &config.to)
        else {
            return Ok(None);
        };
        if token.is_empty() || phone_number_id.is_empty() || to.is_empty() {
            return Ok(None);
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Some(Self {
            client,
            url: format!("{GRAPH_API}/{phone_number_id}/messages"),
            token: token.clone(),
            to: to.clone(),
        }))
    }

    pub async fn send_text(&self, body: &str) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&json!({
                "messaging_product": "whatsapp",
                "to": self.to,
                "type": "text",
                "text": { "body": body },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }
        Ok(())
    }
}
