//! Telegram Bot API transport.
//!
//! Implements `ChatTransport` with `getUpdates` long polling and
//! `sendMessage`. The bot token is part of every request URL, so URLs are
//! stripped from all errors before they are logged or returned.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use trainerbot_core::transport::ChatTransport;
use trainerbot_types::config::TelegramSettings;
use trainerbot_types::error::TransportError;
use trainerbot_types::update::{ApiResponse, OutboundMessage, Update};

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

pub struct TelegramClient {
    token: SecretString,
    api_url: String,
    send_timeout: Duration,
    poll_request_timeout: Duration,
    http: reqwest::Client,
}

impl TelegramClient {
    /// `poll_request_timeout` bounds the whole `getUpdates` HTTP call and
    /// must exceed the long-poll wait.
    pub fn new(token: SecretString, settings: &TelegramSettings, poll_request_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("trainerbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            token,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            send_timeout: Duration::from_secs(settings.send_timeout_secs),
            poll_request_timeout,
            http,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_url, self.token.expose_secret())
    }

    async fn call<Req, Resp>(
        &self,
        method: &str,
        body: &Req,
        timeout: Duration,
    ) -> Result<Resp, TransportError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.method_url(method))
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.without_url().to_string()))?;

        // Error statuses still carry the standard envelope with a description.
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.without_url().to_string()))?;
        let envelope: ApiResponse<Resp> = serde_json::from_slice(&bytes)
            .map_err(|e| TransportError::Decode(format!("HTTP {status}: {e}")))?;

        if !envelope.ok {
            return Err(TransportError::Api {
                description: envelope
                    .description
                    .unwrap_or_else(|| format!("HTTP {status}")),
            });
        }
        envelope
            .result
            .ok_or_else(|| TransportError::Decode(format!("{method}: missing result")))
    }
}

impl ChatTransport for TelegramClient {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, TransportError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: ["message"],
        };
        let updates: Vec<Update> = self
            .call("getUpdates", &request, self.poll_request_timeout)
            .await?;
        if !updates.is_empty() {
            debug!(count = updates.len(), offset = ?offset, "Received updates");
        }
        Ok(updates)
    }

    async fn send_message(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let _: serde_json::Value = self.call("sendMessage", message, self.send_timeout).await?;
        Ok(())
    }
}
