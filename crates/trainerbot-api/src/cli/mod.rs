//! CLI command definitions for the `trainerbot` binary.
//!
//! Uses clap derive macros. Connection settings can come from flags, the
//! environment, or `config.toml`, in that order of precedence.

pub mod modules;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use trainerbot_types::module::ModuleVersion;
use trainerbot_types::session::ChatId;

/// Chat front end for the sales-trainer module backend.
#[derive(Parser)]
#[command(name = "trainerbot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config.toml (default: ~/.trainerbot/config.toml).
    #[arg(long, global = true, env = "TRAINERBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Module backend base URL.
    #[arg(long, global = true, env = "BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Chat that receives a copy of every session summary (0 disables).
    #[arg(long, global = true, env = "ADMIN_CHAT_ID", allow_negative_numbers = true)]
    pub admin_chat_id: Option<ChatId>,

    /// Also export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover modules and serve chat updates until interrupted.
    Run,

    /// Run module discovery and print the command registry.
    #[command(alias = "ls")]
    Discover,

    /// Probe the entry endpoint of a single module.
    Probe {
        /// Module name (e.g. "arena").
        name: String,

        /// Module version (e.g. "v4").
        #[arg(id = "module_version", value_name = "VERSION")]
        version: Option<ModuleVersion>,
    },

    /// Discover modules, then check each one answers a probe and a start.
    ///
    /// Exits non-zero when any module fails.
    Check {
        /// Chat id sent with the start request.
        #[arg(long, default_value_t = 99999, allow_negative_numbers = true)]
        chat_id: ChatId,
    },

    /// Fetch a module's state snapshot for a session.
    Snapshot {
        /// Module command, with or without the leading slash (e.g. "/arena").
        command: String,

        /// Session identifier issued by the module.
        sid: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Settings taken from flags or the environment, applied over `config.toml`.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub admin_chat_id: Option<ChatId>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_path: self.config.clone(),
            backend_url: self.backend_url.clone(),
            admin_chat_id: self.admin_chat_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_probe_with_version() {
        let cli = Cli::try_parse_from(["trainerbot", "probe", "arena", "v4"]).unwrap();
        match cli.command {
            Commands::Probe { name, version } => {
                assert_eq!(name, "arena");
                assert_eq!(version, Some(ModuleVersion(4)));
            }
            _ => panic!("expected probe"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_version() {
        assert!(Cli::try_parse_from(["trainerbot", "probe", "arena", "4"]).is_err());
    }

    #[test]
    fn test_parse_check_chat_id() {
        let cli = Cli::try_parse_from(["trainerbot", "check"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { chat_id: 99999 }));

        let cli = Cli::try_parse_from(["trainerbot", "check", "--chat-id", "-5", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Check { chat_id: -5 }));
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "trainerbot",
            "discover",
            "--backend-url",
            "http://backend:9000",
            "--admin-chat-id",
            "-1001",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.backend_url.as_deref(), Some("http://backend:9000"));
        assert_eq!(overrides.admin_chat_id, Some(-1001));
    }
}
