//! WhatsApp delivery through the Twilio Messages API.
//!
//! Inbound messages arrive on the `/webhook` route as form posts; this
//! module only handles the outbound direction.

use crate::traits::{MessageSender, SendResult};
use async_trait::async_trait;
use chatline_common::config::TwilioConfig;
use chatline_common::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Twilio WhatsApp sandbox number every message is sent from.
pub const WHATSAPP_FROM: &str = "whatsapp:+14155238886";

const WHATSAPP_SCHEME: &str = "whatsapp:";

/// Prefix `number` with the `whatsapp:` scheme unless it already has it.
pub fn format_address(number: &str) -> String {
    let number = number.trim();
    if number.starts_with(WHATSAPP_SCHEME) {
        number.to_string()
    } else {
        format!("{WHATSAPP_SCHEME}{number}")
    }
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

/// Twilio REST client for WhatsApp messages.
pub struct TwilioChannel {
    account_sid: String,
    auth_token: String,
    api_base: String,
    client: Client,
}

impl TwilioChannel {
    /// Create a new Twilio channel against the public API.
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self::with_timeout(account_sid, auth_token, Duration::from_secs(30))
    }

    fn with_timeout(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            api_base: "https://api.twilio.com".into(),
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Point the client at another API base (used by tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Create a channel from the Twilio section of the config.
    ///
    /// Missing credentials are allowed; sends then fail with a config error.
    pub fn from_config(config: &TwilioConfig) -> Self {
        Self::with_timeout(
            config.account_sid.clone().unwrap_or_default(),
            config.auth_token.clone().unwrap_or_default(),
            Duration::from_secs(config.timeout_secs),
        )
        .with_api_base(config.api_base.clone())
    }

    fn ensure_credentials(&self) -> Result<()> {
        if self.account_sid.is_empty() || self.auth_token.is_empty() {
            return Err(Error::Config("Twilio credentials not configured".into()));
        }
        Ok(())
    }

    fn account_url(&self) -> String {
        format!("{}/2010-04-01/Accounts/{}", self.api_base, self.account_sid)
    }

    /// Create a message resource and return its SID.
    async fn create_message(&self, to: &str, body: &str) -> Result<String> {
        self.ensure_credentials()?;

        let url = format!("{}/Messages.json", self.account_url());
        let to = format_address(to);
        let form = [("From", WHATSAPP_FROM), ("To", to.as_str()), ("Body", body)];

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<ApiError>(&text) {
                Ok(api) => match api.code {
                    Some(code) => format!("{} (code {code})", api.message),
                    None => api.message,
                },
                Err(_) => text,
            };
            return Err(Error::External(format!(
                "Twilio API error ({}): {detail}",
                status.as_u16()
            )));
        }

        let message: MessageResource = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("Failed to parse Twilio response: {e}")))?;

        Ok(message.sid)
    }

    /// Verify the credentials by fetching the account resource.
    pub async fn health_check(&self) -> Result<()> {
        self.ensure_credentials()?;

        let resp = self
            .client
            .get(format!("{}.json", self.account_url()))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(map_transport_error)?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Error::External(format!(
                "Twilio authentication failed ({})",
                resp.status().as_u16()
            )))
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else {
        Error::External(format!("Twilio request failed: {e}"))
    }
}

#[async_trait]
impl MessageSender for TwilioChannel {
    fn name(&self) -> &'static str {
        "twilio-whatsapp"
    }

    async fn send(&self, to: &str, body: &str) -> SendResult {
        match self.create_message(to, body).await {
            Ok(sid) => {
                tracing::info!(
                    to = %chatline_common::util::mask_address(to),
                    sid = %sid,
                    "WhatsApp message sent"
                );
                SendResult::Sent { sid }
            }
            Err(e) => {
                tracing::error!(error = %e, "Error sending message");
                SendResult::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
