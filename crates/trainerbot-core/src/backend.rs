//! Module backend port definitions.
//!
//! `ModuleBackend` covers discovery and single-shot module calls;
//! `TrainerEngine` covers the long-running dialogue trainer. Both are
//! implemented over HTTP in trainerbot-infra and by in-memory doubles in
//! tests. Uses native async fn in traits (RPITIT), no async_trait macro.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use trainerbot_types::engine::{
    ProbeReply, RoutesSummary, StartResponse, StopResponse, TurnResponse,
};
use trainerbot_types::error::BackendError;
use trainerbot_types::session::ChatId;

/// Discovery and single-shot calls against the module backend.
pub trait ModuleBackend: Send + Sync {
    /// Fetch the backend's attached-module list.
    fn routes_summary(&self) -> impl Future<Output = Result<RoutesSummary, BackendError>> + Send;

    /// Send a discovery probe to `endpoint` and return the HTTP status with
    /// the module's acknowledgement, if it sent one.
    ///
    /// Non-2xx statuses are returned as `Ok`; only network-level failures
    /// are errors.
    fn probe(&self, endpoint: &str) -> impl Future<Output = Result<ProbeReply, BackendError>> + Send;

    /// Invoke a module entry point on behalf of a chat.
    ///
    /// A successful response body that is not JSON is returned as
    /// `{"result": "<text>"}`.
    fn invoke(
        &self,
        endpoint: &str,
        chat_id: ChatId,
    ) -> impl Future<Output = Result<Value, BackendError>> + Send;

    /// Fetch a module's opaque state for a session.
    fn snapshot(
        &self,
        base_path: &str,
        sid: &str,
    ) -> impl Future<Output = Result<Value, BackendError>> + Send;
}

/// The long-running dialogue trainer behind `/train`.
pub trait TrainerEngine: Send + Sync {
    /// Open a new session for `manager_id` (the chat identity as a string).
    fn start(
        &self,
        manager_id: &str,
    ) -> impl Future<Output = Result<StartResponse, BackendError>> + Send;

    /// Forward one dialogue turn.
    fn turn(
        &self,
        sid: &str,
        text: &str,
    ) -> impl Future<Output = Result<TurnResponse, BackendError>> + Send;

    /// Finish a session and request its final scoring.
    fn stop(&self, sid: &str) -> impl Future<Output = Result<StopResponse, BackendError>> + Send;
}

impl<T: ModuleBackend> ModuleBackend for Arc<T> {
    fn routes_summary(&self) -> impl Future<Output = Result<RoutesSummary, BackendError>> + Send {
        (**self).routes_summary()
    }

    fn probe(&self, endpoint: &str) -> impl Future<Output = Result<ProbeReply, BackendError>> + Send {
        (**self).probe(endpoint)
    }

    fn invoke(
        &self,
        endpoint: &str,
        chat_id: ChatId,
    ) -> impl Future<Output = Result<Value, BackendError>> + Send {
        (**self).invoke(endpoint, chat_id)
    }

    fn snapshot(
        &self,
        base_path: &str,
        sid: &str,
    ) -> impl Future<Output = Result<Value, BackendError>> + Send {
        (**self).snapshot(base_path, sid)
    }
}

impl<T: TrainerEngine> TrainerEngine for Arc<T> {
    fn start(
        &self,
        manager_id: &str,
    ) -> impl Future<Output = Result<StartResponse, BackendError>> + Send {
        (**self).start(manager_id)
    }

    fn turn(
        &self,
        sid: &str,
        text: &str,
    ) -> impl Future<Output = Result<TurnResponse, BackendError>> + Send {
        (**self).turn(sid, text)
    }

    fn stop(&self, sid: &str) -> impl Future<Output = Result<StopResponse, BackendError>> + Send {
        (**self).stop(sid)
    }
}
