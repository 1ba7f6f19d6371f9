//! In-memory doubles of the core ports, shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use trainerbot_types::engine::{
    ProbeAck, ProbeReply, RoutesSummary, StartResponse, StopResponse, TurnResponse,
};
use trainerbot_types::error::{BackendError, TransportError};
use trainerbot_types::session::ChatId;
use trainerbot_types::update::{OutboundMessage, Update};

use crate::backend::{ModuleBackend, TrainerEngine};
use crate::transport::ChatTransport;

// ---------------------------------------------------------------------------
// MockBackend
// ---------------------------------------------------------------------------

/// Module backend double. Unknown probe endpoints answer 404.
#[derive(Default)]
pub struct MockBackend {
    summary: Option<RoutesSummary>,
    probe_replies: HashMap<String, ProbeReply>,
    probe_failures: HashSet<String>,
    invoke_bodies: HashMap<String, Value>,
    probe_calls: Mutex<Vec<String>>,
    invoke_calls: Mutex<Vec<(String, ChatId)>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report these attached module paths from `routes_summary`.
    pub fn with_attached(mut self, attached: &[&str]) -> Self {
        self.summary = Some(RoutesSummary {
            attached: attached.iter().map(|s| s.to_string()).collect(),
            errors: Vec::new(),
        });
        self
    }

    /// Answer probes on `endpoint` with `status`; 2xx statuses carry a full
    /// `{ok: true, available: true}` ack.
    pub fn with_probe_status(self, endpoint: &str, status: u16) -> Self {
        let ack = (200..300).contains(&status).then_some(ProbeAck {
            ok: true,
            available: true,
        });
        self.with_probe_reply(endpoint, ProbeReply { status, ack })
    }

    pub fn with_probe_reply(mut self, endpoint: &str, reply: ProbeReply) -> Self {
        self.probe_replies.insert(endpoint.to_string(), reply);
        self
    }

    pub fn with_probe_failure(mut self, endpoint: &str) -> Self {
        self.probe_failures.insert(endpoint.to_string());
        self
    }

    /// Answer `invoke(endpoint)` with `body`. Unconfigured endpoints fail
    /// with a transport error.
    pub fn with_invoke_body(mut self, endpoint: &str, body: Value) -> Self {
        self.invoke_bodies.insert(endpoint.to_string(), body);
        self
    }

    pub fn probe_calls(&self) -> Vec<String> {
        self.probe_calls.lock().unwrap().clone()
    }

    pub fn invoke_calls(&self) -> Vec<(String, ChatId)> {
        self.invoke_calls.lock().unwrap().clone()
    }
}

impl ModuleBackend for MockBackend {
    fn routes_summary(&self) -> impl Future<Output = Result<RoutesSummary, BackendError>> + Send {
        let result = self
            .summary
            .clone()
            .ok_or_else(|| BackendError::Transport("connection refused".to_string()));
        async move { result }
    }

    fn probe(&self, endpoint: &str) -> impl Future<Output = Result<ProbeReply, BackendError>> + Send {
        self.probe_calls.lock().unwrap().push(endpoint.to_string());
        let result = if self.probe_failures.contains(endpoint) {
            Err(BackendError::Timeout)
        } else {
            Ok(self
                .probe_replies
                .get(endpoint)
                .copied()
                .unwrap_or(ProbeReply { status: 404, ack: None }))
        };
        async move { result }
    }

    fn invoke(
        &self,
        endpoint: &str,
        chat_id: ChatId,
    ) -> impl Future<Output = Result<Value, BackendError>> + Send {
        self.invoke_calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), chat_id));
        let result = self
            .invoke_bodies
            .get(endpoint)
            .cloned()
            .ok_or_else(|| BackendError::Transport("connection reset".to_string()));
        async move { result }
    }

    fn snapshot(
        &self,
        base_path: &str,
        sid: &str,
    ) -> impl Future<Output = Result<Value, BackendError>> + Send {
        let body = json!({"base": base_path, "sid": sid});
        async move { Ok(body) }
    }
}

// ---------------------------------------------------------------------------
// MockTrainer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainerCall {
    Start(String),
    Turn(String, String),
    Stop(String),
}

/// Trainer double. Each configured body is returned for every call of that
/// kind; an unconfigured call fails with a transport error.
#[derive(Default)]
pub struct MockTrainer {
    start: Option<Value>,
    turn: Option<Value>,
    stop: Option<Value>,
    calls: Mutex<Vec<TrainerCall>>,
}

impl MockTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(mut self, body: Value) -> Self {
        self.start = Some(body);
        self
    }

    pub fn with_turn(mut self, body: Value) -> Self {
        self.turn = Some(body);
        self
    }

    pub fn with_stop(mut self, body: Value) -> Self {
        self.stop = Some(body);
        self
    }

    pub fn calls(&self) -> Vec<TrainerCall> {
        self.calls.lock().unwrap().clone()
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &Option<Value>) -> Result<T, BackendError> {
    match body {
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| BackendError::Decode(e.to_string())),
        None => Err(BackendError::Transport("connection refused".to_string())),
    }
}

impl TrainerEngine for MockTrainer {
    fn start(
        &self,
        manager_id: &str,
    ) -> impl Future<Output = Result<StartResponse, BackendError>> + Send {
        self.calls
            .lock()
            .unwrap()
            .push(TrainerCall::Start(manager_id.to_string()));
        let result = decode(&self.start);
        async move { result }
    }

    fn turn(
        &self,
        sid: &str,
        text: &str,
    ) -> impl Future<Output = Result<TurnResponse, BackendError>> + Send {
        self.calls
            .lock()
            .unwrap()
            .push(TrainerCall::Turn(sid.to_string(), text.to_string()));
        let result = decode(&self.turn);
        async move { result }
    }

    fn stop(&self, sid: &str) -> impl Future<Output = Result<StopResponse, BackendError>> + Send {
        self.calls
            .lock()
            .unwrap()
            .push(TrainerCall::Stop(sid.to_string()));
        let result = decode(&self.stop);
        async move { result }
    }
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Chat transport double that replays scripted poll results.
///
/// Once the script is exhausted it cancels `shutdown` and returns an empty
/// batch, so a loop under test stops on its own.
pub struct MockTransport {
    script: Mutex<VecDeque<Result<Vec<Update>, TransportError>>>,
    offsets: Mutex<Vec<Option<i64>>>,
    sent: Mutex<Vec<OutboundMessage>>,
    fail_sends_to: Option<ChatId>,
    shutdown: CancellationToken,
}

impl MockTransport {
    pub fn new(
        script: Vec<Result<Vec<Update>, TransportError>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            offsets: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            fail_sends_to: None,
            shutdown,
        }
    }

    pub fn failing_sends_to(mut self, chat_id: ChatId) -> Self {
        self.fail_sends_to = Some(chat_id);
        self
    }

    /// Offsets passed to each `get_updates` call, in order.
    pub fn offsets(&self) -> Vec<Option<i64>> {
        self.offsets.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl ChatTransport for MockTransport {
    fn get_updates(
        &self,
        offset: Option<i64>,
        _timeout: Duration,
    ) -> impl Future<Output = Result<Vec<Update>, TransportError>> + Send {
        self.offsets.lock().unwrap().push(offset);
        let next = self.script.lock().unwrap().pop_front();
        let result = match next {
            Some(result) => result,
            None => {
                self.shutdown.cancel();
                Ok(Vec::new())
            }
        };
        async move { result }
    }

    fn send_message(
        &self,
        message: &OutboundMessage,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let result = if self.fail_sends_to == Some(message.chat_id) {
            Err(TransportError::Api {
                description: "Forbidden: bot was blocked by the user".to_string(),
            })
        } else {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        };
        async move { result }
    }
}

/// A text update from `chat_id`.
pub fn text_update(update_id: i64, chat_id: ChatId, text: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "message": {
            "chat": {"id": chat_id},
            "from": {"username": "tester"},
            "text": text
        }
    }))
    .unwrap()
}
