//! `trainerbot run`: discover modules, then serve chat updates.

use std::sync::Arc;

use anyhow::Context;
use console::style;
use tokio_util::sync::CancellationToken;
use tracing::info;

use trainerbot_core::dispatch::DispatchRouter;
use trainerbot_core::polling::{Heartbeat, UpdateLoop};
use trainerbot_infra::config::resolve_bot_token;
use trainerbot_infra::telegram::TelegramClient;

use crate::state::AppState;

/// Run the bot until `cancel` fires.
///
/// A missing bot token is the only startup failure; an empty module
/// registry still leaves `/train` and the built-in commands working.
pub async fn run(state: &AppState, cancel: CancellationToken, quiet: bool) -> anyhow::Result<()> {
    let token = resolve_bot_token().context("cannot start the bot")?;
    let config = &state.config;

    if let Some(path) = &state.config_path {
        info!(path = %path.display(), "Using config path");
    }

    let discovery = state.discover().await;
    info!(
        source = %discovery.source,
        modules = discovery.registry.len(),
        "Module discovery finished"
    );
    for binding in discovery.registry.iter() {
        info!(command = %binding.command(), endpoint = %binding.endpoint, "Registered module");
    }

    let router = DispatchRouter::new(
        state.backend.clone(),
        state.backend.clone(),
        Arc::new(discovery.registry),
    )
    .with_admin_chat(config.admin_sink());

    let transport = TelegramClient::new(token, &config.telegram, config.polling.request_timeout());
    let mut update_loop = UpdateLoop::new(transport, router, config.polling.clone());

    let heartbeat = Heartbeat::spawn(
        update_loop.liveness(),
        config.polling.heartbeat(),
        cancel.clone(),
    );

    if !quiet {
        eprintln!(
            "  {} trainerbot polling for updates ({})",
            style("▶").green().bold(),
            style("Ctrl+C to stop").dim()
        );
    }

    update_loop.run(cancel.clone()).await;

    cancel.cancel();
    let _ = heartbeat.await;
    info!(active_chats = update_loop.store().len(), "Bot stopped");
    Ok(())
}
