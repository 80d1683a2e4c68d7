//! Twilio SMS client.

use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use stowline_core::PhoneNumber;

use crate::config::TwilioConfig;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Errors from sending an SMS.
#[derive(Debug, Error)]
pub enum SmsError {
    /// The HTTP request could not be made.
    #[error("Twilio request failed: {0}")]
    Request(String),

    /// Twilio rejected the message.
    #[error("Twilio API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body was not what Twilio documents.
    #[error("Invalid Twilio response: {0}")]
    Response(String),
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// Sends text messages through Twilio's Messages API.
#[derive(Clone)]
pub struct SmsClient {
    client: Client,
    config: TwilioConfig,
}

impl std::fmt::Debug for SmsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SmsClient {
    /// Create a new SMS client.
    #[must_use]
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Send `body` to `to`. Returns the Twilio message SID.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Twilio rejects the message.
    #[instrument(skip(self, body), fields(to = %to))]
    pub async fn send(&self, to: &PhoneNumber, body: &str) -> Result<String, SmsError> {
        let url = format!(
            "{TWILIO_API_BASE}/Accounts/{}/Messages.json",
            self.config.account_sid
        );
        let to = to.to_e164();

        let response = self
            .client
            .post(url)
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&[
                ("To", to.as_str()),
                ("From", self.config.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| SmsError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map_or_else(|_| "Unknown error".to_string(), |e| e.message);
            tracing::error!(status = status.as_u16(), %message, "Twilio rejected SMS");
            return Err(SmsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let sent: MessageResponse = response
            .json()
            .await
            .map_err(|e| SmsError::Response(e.to_string()))?;

        tracing::info!(sid = %sent.sid, status = %sent.status, "SMS sent");
        Ok(sent.sid)
    }
}
