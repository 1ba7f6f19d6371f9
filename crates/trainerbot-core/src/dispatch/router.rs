//! Dispatch router.
//!
//! Turns one incoming text into outbound messages. Every failure below this
//! point (transport, protocol, missing fields) becomes user-facing text;
//! nothing propagates to the update loop.

use std::sync::Arc;

use tracing::{debug, info, warn};

use trainerbot_types::engine::extract_module_reply;
use trainerbot_types::error::{CallError, ModuleError};
use trainerbot_types::session::ChatId;
use trainerbot_types::update::OutboundMessage;

use crate::backend::{ModuleBackend, TrainerEngine};
use crate::discovery::registry::ModuleRegistry;
use crate::dispatch::command::{BuiltinCommand, Route, classify};
use crate::dispatch::render;
use crate::session::SessionStore;

pub struct DispatchRouter<B, E> {
    backend: B,
    trainer: E,
    registry: Arc<ModuleRegistry>,
    admin_chat: Option<ChatId>,
}

impl<B: ModuleBackend, E: TrainerEngine> DispatchRouter<B, E> {
    pub fn new(backend: B, trainer: E, registry: Arc<ModuleRegistry>) -> Self {
        Self {
            backend,
            trainer,
            registry,
            admin_chat: None,
        }
    }

    /// Mirror session summaries to this chat.
    pub fn with_admin_chat(mut self, admin_chat: Option<ChatId>) -> Self {
        self.admin_chat = admin_chat;
        self
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Swap in a rebuilt registry. The old table is never mutated.
    pub fn replace_registry(&mut self, registry: Arc<ModuleRegistry>) {
        info!(count = registry.len(), "Module registry replaced");
        self.registry = registry;
    }

    /// Route one message. The user's reply comes first, followed by any
    /// admin mirror.
    pub async fn route(
        &self,
        store: &mut SessionStore,
        chat_id: ChatId,
        text: &str,
    ) -> Vec<OutboundMessage> {
        let text = text.trim();
        let active_sid = store.get(chat_id).active_sid().map(str::to_owned);

        match classify(text, &self.registry) {
            Route::Builtin(BuiltinCommand::Start) => {
                store.get(chat_id).reset();
                vec![OutboundMessage::new(chat_id, render::welcome(&self.registry))]
            }
            Route::Builtin(BuiltinCommand::Train) => {
                vec![OutboundMessage::new(chat_id, self.start_dialog(store, chat_id).await)]
            }
            Route::Builtin(BuiltinCommand::StopDialog) => match active_sid {
                Some(sid) => self.stop_dialog(store, chat_id, &sid).await,
                None => vec![OutboundMessage::new(chat_id, render::NO_ACTIVE_SESSION)],
            },
            Route::Builtin(BuiltinCommand::Modules) => {
                vec![OutboundMessage::new(chat_id, render::module_listing(&self.registry))]
            }
            Route::Module(command) => {
                vec![OutboundMessage::new(chat_id, self.invoke_module(chat_id, &command).await)]
            }
            Route::Text => {
                let reply = match active_sid {
                    Some(sid) => self.dialog_turn(store, chat_id, &sid, text).await,
                    None => render::FALLBACK_HINT.to_string(),
                };
                vec![OutboundMessage::new(chat_id, reply)]
            }
        }
    }

    async fn start_dialog(&self, store: &mut SessionStore, chat_id: ChatId) -> String {
        let manager_id = chat_id.to_string();
        let started = match self.trainer.start(&manager_id).await {
            Ok(response) => response.into_started(),
            Err(e) => {
                warn!(chat_id, error = %e, "Trainer start failed");
                return render::START_FAILED.to_string();
            }
        };

        match started {
            Ok(started) => {
                info!(chat_id, sid = %started.sid, "Dialogue started");
                store.get(chat_id).begin_dialog(started.sid);
                render::dialog_started(started.reply.as_deref())
            }
            Err(ModuleError::MissingField(field)) => {
                warn!(chat_id, field, "Trainer start response has no session id");
                render::NO_SESSION_ID.to_string()
            }
            Err(e) => {
                warn!(chat_id, error = %e, "Trainer rejected start");
                render::START_FAILED.to_string()
            }
        }
    }

    /// Request final scoring, then clear the session whatever the outcome.
    async fn stop_dialog(
        &self,
        store: &mut SessionStore,
        chat_id: ChatId,
        sid: &str,
    ) -> Vec<OutboundMessage> {
        let result: Result<_, CallError> = match self.trainer.stop(sid).await {
            Ok(response) => response.into_outcome().map_err(CallError::from),
            Err(e) => Err(e.into()),
        };
        store.get(chat_id).reset();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(chat_id, sid, error = %e, "Trainer stop failed");
                return vec![OutboundMessage::new(chat_id, render::STOP_FAILED)];
            }
        };

        info!(chat_id, sid, "Dialogue stopped");
        let summary = render::session_summary(&outcome);
        let mut messages = Vec::with_capacity(2);
        if let Some(admin) = self.admin_chat {
            messages.push(OutboundMessage::new(admin, render::admin_copy(chat_id, sid, &summary)));
        }
        messages.insert(0, OutboundMessage::new(chat_id, summary));
        messages
    }

    async fn dialog_turn(
        &self,
        store: &mut SessionStore,
        chat_id: ChatId,
        sid: &str,
        text: &str,
    ) -> String {
        let response = match self.trainer.turn(sid, text).await {
            Ok(response) => response,
            Err(e) => {
                warn!(chat_id, sid, error = %e, "Trainer turn failed");
                return render::TURN_FAILED.to_string();
            }
        };

        match response.into_outcome() {
            Ok(outcome) => render::scorecard(&outcome),
            Err(ModuleError::SessionNotFound) => {
                info!(chat_id, sid, "Remote session is gone; resetting");
                store.get(chat_id).reset();
                render::SESSION_LOST.to_string()
            }
            Err(e) => {
                debug!(chat_id, sid, error = %e, "Trainer rejected turn");
                render::turn_error(&reason(&e))
            }
        }
    }

    async fn invoke_module(&self, chat_id: ChatId, command: &str) -> String {
        let Some(binding) = self.registry.get(command) else {
            return render::module_failed(command);
        };
        debug!(chat_id, command, endpoint = %binding.endpoint, "Invoking module");

        match self.backend.invoke(&binding.endpoint, chat_id).await {
            Ok(body) => match extract_module_reply(&body) {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(chat_id, command, error = %e, "Module reported an error");
                    render::module_rejected(command, &reason(&e))
                }
            },
            Err(e) => {
                warn!(chat_id, command, error = %e, "Module call failed");
                render::module_failed(command)
            }
        }
    }
}

fn reason(error: &ModuleError) -> String {
    match error {
        ModuleError::Rejected(reason) => reason.clone(),
        other => other.to_string(),
    }
}
