//! Chat transport port.
//!
//! The minimal send/receive primitives the update loop needs. The Telegram
//! Bot API implementation lives in trainerbot-infra.

use std::future::Future;
use std::time::Duration;

use trainerbot_types::error::TransportError;
use trainerbot_types::update::{OutboundMessage, Update};

pub trait ChatTransport: Send + Sync {
    /// Long-poll for updates with id >= `offset`, waiting up to `timeout`
    /// server-side when none are pending.
    fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<Update>, TransportError>> + Send;

    /// Deliver one text message.
    fn send_message(
        &self,
        message: &OutboundMessage,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
