//! Trainerbot entry point.
//!
//! Binary name: `trainerbot`
//!
//! Parses CLI arguments, sets up logging and configuration, then dispatches
//! to the command handler. `run` drives the chat update loop until Ctrl+C or
//! SIGTERM.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn,trainerbot=info",
        1 => "info,trainerbot=debug",
        _ => "trace",
    };
    if let Err(e) = trainerbot_observe::tracing_setup::init_tracing(filter, cli.otel) {
        eprintln!("failed to initialize logging: {e}");
    }

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "trainerbot", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(&cli.overrides()).await?;

    let result = match cli.command {
        Commands::Run => {
            let cancel = CancellationToken::new();
            let signal_token = cancel.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                tracing::info!("Shutdown signal received");
                signal_token.cancel();
            });
            cli::run::run(&state, cancel, cli.quiet).await
        }

        Commands::Discover => cli::modules::discover(&state, cli.json).await,

        Commands::Probe { name, version } => {
            cli::modules::probe(&state, &name, version, cli.json).await
        }

        Commands::Check { chat_id } => cli::modules::check(&state, chat_id, cli.json).await,

        Commands::Snapshot { command, sid } => {
            cli::modules::snapshot(&state, &command, &sid).await
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    };

    trainerbot_observe::tracing_setup::shutdown_tracing();
    result
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
