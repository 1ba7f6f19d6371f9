//! HTTP client for the module backend.
//!
//! Implements both `ModuleBackend` (discovery, probing, single-shot module
//! calls, snapshots) and `TrainerEngine` (the dialogue trainer) over one
//! shared `reqwest::Client`. Every call carries its own timeout: short for
//! probes and the route summary, longer for dialogue turns.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use trainerbot_core::backend::{ModuleBackend, TrainerEngine};
use trainerbot_types::config::{BackendSettings, TrainerSettings};
use trainerbot_types::engine::{
    ModuleInvocation, ProbeAck, ProbeReply, ProbeRequest, RoutesSummary, StartRequest, StartResponse,
    StopRequest, StopResponse, TurnRequest, TurnResponse,
};
use trainerbot_types::error::BackendError;
use trainerbot_types::session::ChatId;

/// Longest response body excerpt kept in a status error.
const ERROR_BODY_LIMIT: usize = 300;

pub struct HttpBackend {
    base_url: String,
    settings: BackendSettings,
    trainer: TrainerSettings,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url` (trailing slashes are
    /// ignored).
    pub fn new(base_url: &str, settings: BackendSettings, trainer: TrainerSettings) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("trainerbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            settings,
            trainer,
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    fn trainer_path(&self, action: &str) -> String {
        format!("{}/{action}", self.trainer.base_path.trim_end_matches('/'))
    }

    /// POST `body` and decode a JSON response.
    ///
    /// With `error_bodies`, a non-2xx response whose JSON carries an `error`
    /// key is decoded like a success so the protocol error reaches the caller.
    async fn post_json<Req, Resp>(
        &self,
        path: &str,
        body: &Req,
        timeout_secs: u64,
        error_bodies: bool,
    ) -> Result<Resp, BackendError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(url = %url, "POST");

        let response = self
            .http
            .post(&url)
            .json(body)
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_request_error)?;

        if !status.is_success() {
            if error_bodies {
                if let Ok(value) = serde_json::from_str::<Value>(&text) {
                    if value.get("error").is_some_and(|e| !e.is_null()) {
                        return serde_json::from_value(value)
                            .map_err(|e| BackendError::Decode(e.to_string()));
                    }
                }
            }
            return Err(status_error(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

impl ModuleBackend for HttpBackend {
    async fn routes_summary(&self) -> Result<RoutesSummary, BackendError> {
        let url = self.url(&self.settings.routes_summary_path);
        debug!(url = %url, "Fetching routes summary");

        let response = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(self.settings.summary_timeout_secs))
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        response
            .json::<RoutesSummary>()
            .await
            .map_err(|e| BackendError::Decode(e.without_url().to_string()))
    }

    async fn probe(&self, endpoint: &str) -> Result<ProbeReply, BackendError> {
        let response = self
            .http
            .post(self.url(endpoint))
            .json(&ProbeRequest::discovery())
            .timeout(Duration::from_secs(self.settings.probe_timeout_secs))
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status().as_u16();
        let ack = if response.status().is_success() {
            // Discovery accepts by status alone; the ack feeds `check`.
            let ack = response.json::<ProbeAck>().await.ok();
            debug!(endpoint, ack = ?ack, "Probe acknowledged");
            ack
        } else {
            None
        };
        Ok(ProbeReply { status, ack })
    }

    async fn invoke(&self, endpoint: &str, chat_id: ChatId) -> Result<Value, BackendError> {
        let url = self.url(endpoint);
        debug!(url = %url, chat_id, "Invoking module");

        let response = self
            .http
            .post(&url)
            .json(&ModuleInvocation { chat_id })
            .timeout(Duration::from_secs(self.settings.module_timeout_secs))
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_request_error)?;
        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        // Modules may answer with plain text.
        Ok(serde_json::from_str(&text).unwrap_or_else(|_| serde_json::json!({ "result": text })))
    }

    async fn snapshot(&self, base_path: &str, sid: &str) -> Result<Value, BackendError> {
        let mut url = reqwest::Url::parse(&self.url(base_path.trim_end_matches('/')))
            .map_err(|e| BackendError::Transport(format!("invalid backend URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| BackendError::Transport("backend URL cannot take a path".to_string()))?
            .pop_if_empty()
            .push("snapshot")
            .push(sid);
        debug!(url = %url, "Fetching snapshot");

        let response = self
            .http
            .get(url)
            .timeout(Duration::from_secs(self.settings.module_timeout_secs))
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_request_error)?;
        if !status.is_success() {
            return Err(status_error(status, &text));
        }
        serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

impl TrainerEngine for HttpBackend {
    async fn start(&self, manager_id: &str) -> Result<StartResponse, BackendError> {
        let request = StartRequest {
            manager_id: manager_id.to_string(),
            scenario_id: self.trainer.scenario_id.clone(),
        };
        self.post_json(
            &self.trainer_path("start"),
            &request,
            self.settings.session_timeout_secs,
            true,
        )
        .await
    }

    async fn turn(&self, sid: &str, text: &str) -> Result<TurnResponse, BackendError> {
        let request = TurnRequest {
            sid: sid.to_string(),
            text: text.to_string(),
        };
        self.post_json(
            &self.trainer_path("turn"),
            &request,
            self.settings.turn_timeout_secs,
            true,
        )
        .await
    }

    async fn stop(&self, sid: &str) -> Result<StopResponse, BackendError> {
        let request = StopRequest {
            sid: sid.to_string(),
        };
        self.post_json(
            &self.trainer_path("stop"),
            &request,
            self.settings.session_timeout_secs,
            true,
        )
        .await
    }
}

fn map_request_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Transport(error.without_url().to_string())
    }
}

fn status_error(status: reqwest::StatusCode, body: &str) -> BackendError {
    BackendError::Status {
        status: status.as_u16(),
        body: body.chars().take(ERROR_BODY_LIMIT).collect(),
    }
}
