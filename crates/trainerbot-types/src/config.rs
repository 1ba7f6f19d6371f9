//! Configuration types for trainerbot.
//!
//! `BotConfig` mirrors the optional `config.toml`. Every field has a default,
//! so an empty file (or no file) is a valid configuration. The chat platform
//! token is deliberately not part of this struct; it is resolved from the
//! environment at startup.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::module::ModuleDescriptor;
use crate::session::ChatId;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Base URL of the module backend, without a trailing slash.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Chat that receives a copy of every session summary. `0` disables it.
    #[serde(default)]
    pub admin_chat_id: Option<ChatId>,

    #[serde(default)]
    pub telegram: TelegramSettings,

    #[serde(default)]
    pub polling: PollingSettings,

    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub trainer: TrainerSettings,

    #[serde(default)]
    pub discovery: DiscoverySettings,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            admin_chat_id: None,
            telegram: TelegramSettings::default(),
            polling: PollingSettings::default(),
            backend: BackendSettings::default(),
            trainer: TrainerSettings::default(),
            discovery: DiscoverySettings::default(),
        }
    }
}

impl BotConfig {
    /// Admin sink, treating `0` as unset.
    pub fn admin_sink(&self) -> Option<ChatId> {
        self.admin_chat_id.filter(|id| *id != 0)
    }

    /// Normalize values that are accepted loosely on input.
    pub fn normalized(mut self) -> Self {
        self.backend_url = self.backend_url.trim_end_matches('/').to_string();
        self.telegram.api_url = self.telegram.api_url.trim_end_matches('/').to_string();
        self
    }

    /// Non-fatal problems worth reporting at startup.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut problems = Vec::new();
        if !is_http_url(&self.backend_url) {
            problems.push(ConfigError::InvalidValue {
                field: "backend_url",
                reason: format!("'{}' is not an http(s) URL", self.backend_url),
            });
        }
        if !is_http_url(&self.telegram.api_url) {
            problems.push(ConfigError::InvalidValue {
                field: "telegram.api_url",
                reason: format!("'{}' is not an http(s) URL", self.telegram.api_url),
            });
        }
        if self.polling.request_timeout_secs <= self.polling.timeout_secs {
            problems.push(ConfigError::InvalidValue {
                field: "polling.request_timeout_secs",
                reason: format!(
                    "{}s does not exceed the long-poll wait of {}s; using {}s",
                    self.polling.request_timeout_secs,
                    self.polling.timeout_secs,
                    self.polling.request_timeout().as_secs()
                ),
            });
        }
        problems
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Chat platform endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Timeout for `sendMessage` calls.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_send_timeout() -> u64 {
    10
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            send_timeout_secs: default_send_timeout(),
        }
    }
}

/// Long-poll loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Server-side long-poll wait.
    #[serde(default = "default_poll_timeout")]
    pub timeout_secs: u64,

    /// Client-side HTTP timeout for the poll call; must exceed `timeout_secs`.
    #[serde(default = "default_poll_request_timeout")]
    pub request_timeout_secs: u64,

    /// Fixed delay after a failed poll.
    #[serde(default = "default_backoff")]
    pub backoff_secs: u64,

    #[serde(default = "default_heartbeat")]
    pub heartbeat_secs: u64,
}

/// Slack added to the long-poll wait when the configured HTTP timeout is too short.
const POLL_REQUEST_MARGIN_SECS: u64 = 20;

fn default_poll_timeout() -> u64 {
    50
}

fn default_poll_request_timeout() -> u64 {
    70
}

fn default_backoff() -> u64 {
    3
}

fn default_heartbeat() -> u64 {
    60
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_poll_timeout(),
            request_timeout_secs: default_poll_request_timeout(),
            backoff_secs: default_backoff(),
            heartbeat_secs: default_heartbeat(),
        }
    }
}

impl PollingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// HTTP timeout for the poll call, kept above the long-poll wait.
    pub fn request_timeout(&self) -> Duration {
        let floor = self.timeout_secs + POLL_REQUEST_MARGIN_SECS;
        if self.request_timeout_secs > self.timeout_secs {
            Duration::from_secs(self.request_timeout_secs)
        } else {
            Duration::from_secs(floor)
        }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }
}

/// Backend call timeouts and discovery path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_routes_summary_path")]
    pub routes_summary_path: String,

    #[serde(default = "default_summary_timeout")]
    pub summary_timeout_secs: u64,

    /// Short timeout for discovery probes.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Single-shot module invocations.
    #[serde(default = "default_module_timeout")]
    pub module_timeout_secs: u64,

    /// Trainer start and stop calls.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,

    /// Trainer dialogue turns.
    #[serde(default = "default_turn_timeout")]
    pub turn_timeout_secs: u64,
}

fn default_routes_summary_path() -> String {
    "/api/public/v1/routes_summary".to_string()
}

fn default_summary_timeout() -> u64 {
    5
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_module_timeout() -> u64 {
    15
}

fn default_session_timeout() -> u64 {
    10
}

fn default_turn_timeout() -> u64 {
    15
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            routes_summary_path: default_routes_summary_path(),
            summary_timeout_secs: default_summary_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            module_timeout_secs: default_module_timeout(),
            session_timeout_secs: default_session_timeout(),
            turn_timeout_secs: default_turn_timeout(),
        }
    }
}

/// The long-running dialogue trainer driven by `/train`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerSettings {
    /// Path prefix of the trainer's `start`, `turn` and `stop` endpoints.
    #[serde(default = "default_trainer_base")]
    pub base_path: String,

    #[serde(default = "default_scenario")]
    pub scenario_id: String,
}

fn default_trainer_base() -> String {
    "/trainer_dialog_engine/v1".to_string()
}

fn default_scenario() -> String {
    "cold_start_warm".to_string()
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            base_path: default_trainer_base(),
            scenario_id: default_scenario(),
        }
    }
}

/// How to resolve two discovered modules that share a name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the binding with the highest version; ties go to the later one.
    #[default]
    HighestVersion,
    /// The later binding always replaces the earlier one.
    LastWins,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoverySettings {
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Local module directory for the filesystem fallback. When unset, a few
    /// conventional locations relative to the working directory are searched.
    #[serde(default)]
    pub modules_dir: Option<PathBuf>,

    /// Static registration list, probed when the backend reports nothing.
    #[serde(default)]
    pub modules: Vec<ModuleDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleVersion;

    #[test]
    fn test_bot_config_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.backend_url, "http://127.0.0.1:8080");
        assert_eq!(config.polling.timeout_secs, 50);
        assert_eq!(config.polling.request_timeout_secs, 70);
        assert_eq!(config.polling.backoff_secs, 3);
        assert_eq!(config.polling.heartbeat_secs, 60);
        assert_eq!(config.backend.probe_timeout_secs, 5);
        assert_eq!(config.trainer.base_path, "/trainer_dialog_engine/v1");
        assert_eq!(config.discovery.duplicate_policy, DuplicatePolicy::HighestVersion);
        assert!(config.admin_sink().is_none());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: BotConfig = toml::from_str("").unwrap();
        assert_eq!(config.backend.routes_summary_path, "/api/public/v1/routes_summary");
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
    }

    #[test]
    fn test_toml_with_values() {
        let toml_str = r#"
backend_url = "http://backend:9000/"
admin_chat_id = 0

[polling]
backoff_secs = 7

[discovery]
duplicate_policy = "last_wins"

[[discovery.modules]]
name = "arena"
version = "v4"
candidate_endpoints = ["/arena/v4/start"]
capabilities = ["dialog"]
"#;
        let config: BotConfig = toml::from_str(toml_str).unwrap();
        let config = config.normalized();
        assert_eq!(config.backend_url, "http://backend:9000");
        assert!(config.admin_sink().is_none());
        assert_eq!(config.polling.backoff_secs, 7);
        assert_eq!(config.polling.timeout_secs, 50);
        assert_eq!(config.discovery.duplicate_policy, DuplicatePolicy::LastWins);
        assert_eq!(config.discovery.modules.len(), 1);
        assert_eq!(config.discovery.modules[0].version, Some(ModuleVersion(4)));
    }

    #[test]
    fn test_admin_sink_non_zero() {
        let config = BotConfig {
            admin_chat_id: Some(-100123),
            ..BotConfig::default()
        };
        assert_eq!(config.admin_sink(), Some(-100123));
    }

    #[test]
    fn test_validate_reports_problems() {
        assert!(BotConfig::default().validate().is_empty());

        let config = BotConfig {
            backend_url: "backend:8080".to_string(),
            polling: PollingSettings {
                timeout_secs: 50,
                request_timeout_secs: 30,
                ..PollingSettings::default()
            },
            ..BotConfig::default()
        };
        let problems = config.validate();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].to_string().contains("backend_url"));
        assert_eq!(config.polling.request_timeout(), Duration::from_secs(70));
    }

    #[test]
    fn test_heartbeat_never_zero() {
        let polling = PollingSettings {
            heartbeat_secs: 0,
            ..PollingSettings::default()
        };
        assert_eq!(polling.heartbeat(), Duration::from_secs(1));
    }
}
