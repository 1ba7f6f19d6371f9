//! Module contract check.
//!
//! Verifies that a bound module honours the two calls the bot relies on:
//! a discovery probe acknowledged with `{ok: true, available: true}`, and a
//! real start that returns a reply or a session id.

use serde_json::Value;
use tracing::debug;

use trainerbot_types::module::ModuleBinding;
use trainerbot_types::session::ChatId;

use crate::backend::ModuleBackend;
use crate::discovery::registry::ModuleRegistry;

/// Body keys that make a start response usable.
const START_KEYS: [&str; 3] = ["reply", "sid", "session_id"];

/// Outcome of one step of the check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub ok: bool,
    pub message: String,
}

impl StepResult {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Probe and start results for one module binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCheck {
    pub command: String,
    pub endpoint: String,
    pub probe: StepResult,
    pub start: StepResult,
}

impl ContractCheck {
    pub fn passed(&self) -> bool {
        self.probe.ok && self.start.ok
    }
}

/// Check one binding. The start step really opens a session for `chat_id`.
pub async fn check_binding<B: ModuleBackend>(
    backend: &B,
    binding: &ModuleBinding,
    chat_id: ChatId,
) -> ContractCheck {
    let probe = match backend.probe(&binding.endpoint).await {
        Ok(reply) if reply.is_success() && reply.ack.is_some_and(|a| a.is_available()) => {
            StepResult::pass("Probe OK")
        }
        Ok(reply) if reply.is_success() => {
            StepResult::fail(format!("Probe not acknowledged: {}", reply.status))
        }
        Ok(reply) => StepResult::fail(format!("Probe failed: {}", reply.status)),
        Err(e) => StepResult::fail(format!("Probe error: {e}")),
    };

    let start = match backend.invoke(&binding.endpoint, chat_id).await {
        Ok(body) if has_start_key(&body) => StepResult::pass("Start OK"),
        Ok(_) => StepResult::fail("Start returned no reply or session id"),
        Err(e) => StepResult::fail(format!("Start failed: {e}")),
    };

    debug!(
        endpoint = %binding.endpoint,
        probe = probe.ok,
        start = start.ok,
        "Contract check finished"
    );

    ContractCheck {
        command: binding.command(),
        endpoint: binding.endpoint.clone(),
        probe,
        start,
    }
}

/// Check every binding in registry order.
pub async fn check_registry<B: ModuleBackend>(
    backend: &B,
    registry: &ModuleRegistry,
    chat_id: ChatId,
) -> Vec<ContractCheck> {
    let mut checks = Vec::with_capacity(registry.len());
    for binding in registry.iter() {
        checks.push(check_binding(backend, binding, chat_id).await);
    }
    checks
}

fn has_start_key(body: &Value) -> bool {
    body.as_object()
        .is_some_and(|map| START_KEYS.iter().any(|k| map.contains_key(*k)))
}
