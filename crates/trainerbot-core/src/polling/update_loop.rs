//! The long-poll update loop.
//!
//! Alternates between POLLING (waiting on `get_updates`) and PROCESSING
//! (routing the returned batch one update at a time). Updates are handled
//! sequentially in arrival order, so the session store needs no locking.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use trainerbot_types::config::PollingSettings;
use trainerbot_types::update::{TextMessage, Update};

use crate::backend::{ModuleBackend, TrainerEngine};
use crate::dispatch::DispatchRouter;
use crate::polling::cursor::UpdateCursor;
use crate::polling::heartbeat::Liveness;
use crate::session::SessionStore;
use crate::transport::ChatTransport;

/// Characters of message text included in the receive log.
const LOG_PREVIEW_CHARS: usize = 200;

pub struct UpdateLoop<T, B, E> {
    transport: T,
    router: DispatchRouter<B, E>,
    store: SessionStore,
    cursor: UpdateCursor,
    settings: PollingSettings,
    liveness: Arc<Liveness>,
}

impl<T, B, E> UpdateLoop<T, B, E>
where
    T: ChatTransport,
    B: ModuleBackend,
    E: TrainerEngine,
{
    pub fn new(transport: T, router: DispatchRouter<B, E>, settings: PollingSettings) -> Self {
        Self {
            transport,
            router,
            store: SessionStore::new(),
            cursor: UpdateCursor::new(),
            settings,
            liveness: Arc::new(Liveness::new()),
        }
    }

    /// Shared liveness counters, for the heartbeat task.
    pub fn liveness(&self) -> Arc<Liveness> {
        self.liveness.clone()
    }

    pub fn cursor(&self) -> UpdateCursor {
        self.cursor
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn router_mut(&mut self) -> &mut DispatchRouter<B, E> {
        &mut self.router
    }

    /// Poll and process until `cancel` fires.
    ///
    /// Poll failures are logged and retried after the fixed back-off with an
    /// unchanged cursor. Cancellation is observed while waiting on the poll
    /// and during back-off, never in the middle of a batch.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(
            timeout_secs = self.settings.timeout_secs,
            backoff_secs = self.settings.backoff_secs,
            "Update loop started"
        );

        while !cancel.is_cancelled() {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                polled = self.transport.get_updates(self.cursor.offset(), self.settings.timeout()) => polled,
            };

            match polled {
                Ok(batch) => {
                    self.process_batch(batch).await;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        offset = ?self.cursor.offset(),
                        backoff_secs = self.settings.backoff_secs,
                        "Polling failed; backing off"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.settings.backoff()) => {}
                    }
                }
            }
        }

        info!(offset = ?self.cursor.offset(), "Update loop stopped");
    }

    /// Route every new update in `batch`, advancing the cursor past each.
    ///
    /// Returns the number of updates routed.
    pub async fn process_batch(&mut self, batch: Vec<Update>) -> usize {
        let mut routed = 0;
        for update in batch {
            if !self.cursor.accepts(update.update_id) {
                debug!(update_id = update.update_id, "Skipping already handled update");
                continue;
            }
            match update.text_message() {
                Some(message) => {
                    self.handle(message).await;
                    routed += 1;
                }
                None => debug!(update_id = update.update_id, "Skipping update without text"),
            }
            self.cursor.advance_past(update.update_id);
        }
        routed
    }

    async fn handle(&mut self, message: TextMessage) {
        let preview: String = message.text.chars().take(LOG_PREVIEW_CHARS).collect();
        info!(
            chat_id = message.chat_id,
            user = %message.sender,
            text = %preview,
            "Update received"
        );
        self.liveness.record_activity();

        let outbound = self
            .router
            .route(&mut self.store, message.chat_id, &message.text)
            .await;
        self.liveness.set_active_chats(self.store.len());

        for reply in &outbound {
            if let Err(e) = self.transport.send_message(reply).await {
                warn!(chat_id = reply.chat_id, error = %e, "Failed to send message");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use trainerbot_types::error::TransportError;

    use crate::discovery::registry::ModuleRegistry;
    use crate::testing::{MockBackend, MockTrainer, MockTransport, text_update};

    fn update_loop(
        transport: MockTransport,
    ) -> UpdateLoop<MockTransport, MockBackend, MockTrainer> {
        let router = DispatchRouter::new(
            MockBackend::new(),
            MockTrainer::new(),
            Arc::new(ModuleRegistry::new()),
        );
        UpdateLoop::new(transport, router, PollingSettings::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_error_backs_off_and_keeps_cursor() {
        let cancel = CancellationToken::new();
        let transport = MockTransport::new(
            vec![
                Ok(vec![text_update(10, 5, "/modules")]),
                Err(TransportError::Request("network unreachable".to_string())),
                Ok(vec![text_update(11, 5, "/modules")]),
            ],
            cancel.clone(),
        );
        let mut update_loop = update_loop(transport);

        let started = tokio::time::Instant::now();
        update_loop.run(cancel).await;

        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(
            update_loop.transport.offsets(),
            vec![None, Some(11), Some(11), Some(12)]
        );
        assert_eq!(update_loop.transport.sent().len(), 2);
        assert_eq!(update_loop.cursor().offset(), Some(12));
    }

    #[tokio::test]
    async fn test_duplicates_and_stale_updates_are_skipped() {
        let cancel = CancellationToken::new();
        let mut update_loop = update_loop(MockTransport::new(Vec::new(), cancel));

        let routed = update_loop
            .process_batch(vec![
                text_update(5, 1, "hello"),
                text_update(5, 1, "hello again"),
                text_update(4, 1, "stale"),
                text_update(6, 2, "hi"),
            ])
            .await;

        assert_eq!(routed, 2);
        assert_eq!(update_loop.transport.sent().len(), 2);
        assert_eq!(update_loop.cursor().offset(), Some(7));
        assert_eq!(update_loop.store().len(), 2);
    }

    #[tokio::test]
    async fn test_non_text_updates_advance_cursor() {
        let cancel = CancellationToken::new();
        let mut update_loop = update_loop(MockTransport::new(Vec::new(), cancel));
        let no_message: Update = serde_json::from_value(json!({"update_id": 20})).unwrap();
        let blank: Update = serde_json::from_value(json!({
            "update_id": 21,
            "message": {"chat": {"id": 3}, "text": "  "}
        }))
        .unwrap();

        let routed = update_loop.process_batch(vec![no_message, blank]).await;

        assert_eq!(routed, 0);
        assert_eq!(update_loop.cursor().offset(), Some(22));
        assert!(update_loop.transport.sent().is_empty());
        assert!(update_loop.store().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_does_not_abort_batch() {
        let cancel = CancellationToken::new();
        let transport = MockTransport::new(Vec::new(), cancel).failing_sends_to(1);
        let mut update_loop = update_loop(transport);

        let routed = update_loop
            .process_batch(vec![text_update(1, 1, "hello"), text_update(2, 2, "hello")])
            .await;

        assert_eq!(routed, 2);
        let sent = update_loop.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, 2);
        assert_eq!(update_loop.cursor().offset(), Some(3));
    }

    #[tokio::test]
    async fn test_activity_updates_liveness() {
        let cancel = CancellationToken::new();
        let mut update_loop = update_loop(MockTransport::new(Vec::new(), cancel));
        let liveness = update_loop.liveness();

        update_loop
            .process_batch(vec![text_update(1, 1, "a"), text_update(2, 2, "b")])
            .await;

        assert_eq!(liveness.active_chats(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_loop_does_not_poll() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut update_loop = update_loop(MockTransport::new(Vec::new(), cancel.clone()));

        update_loop.run(cancel).await;

        assert!(update_loop.transport.offsets().is_empty());
    }

    #[tokio::test]
    async fn test_registry_swap_applies_to_next_update() {
        use trainerbot_types::config::DuplicatePolicy;
        use trainerbot_types::module::{ModuleBinding, ModuleIdentity, ModuleVersion};

        let cancel = CancellationToken::new();
        let mut update_loop = update_loop(MockTransport::new(Vec::new(), cancel));

        let mut registry = ModuleRegistry::new();
        let identity = ModuleIdentity::new("arena", Some(ModuleVersion(4))).unwrap();
        registry.insert(
            ModuleBinding::discovered(identity, "/arena/v4/start"),
            DuplicatePolicy::default(),
        );
        update_loop.router_mut().replace_registry(Arc::new(registry));

        update_loop.process_batch(vec![text_update(1, 1, "/modules")]).await;

        let sent = update_loop.transport.sent();
        assert!(sent[0].text.contains("/arena - arena (v4)"));
    }
}
