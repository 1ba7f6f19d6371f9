//! Configuration loader and credential resolution.
//!
//! Reads `config.toml` (by default `~/.trainerbot/config.toml`) into
//! [`BotConfig`], falling back to defaults when the file is missing or
//! malformed. The chat platform token only ever comes from the environment.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use trainerbot_types::config::BotConfig;
use trainerbot_types::error::ConfigError;

/// Environment variables checked for the bot token, in priority order.
pub const TOKEN_ENV_VARS: [&str; 4] = [
    "TELEGRAM_BOT_TOKEN",
    "TG_BOT_TOKEN",
    "TELEGRAM_TOKEN",
    "TOKEN",
];

/// `~/.trainerbot/config.toml`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".trainerbot").join("config.toml"))
}

/// Load configuration from `path`.
///
/// - Missing file: [`BotConfig::default()`].
/// - Unreadable or unparseable file: logs a warning, returns the default.
pub async fn load_bot_config(path: &Path) -> BotConfig {
    match read_bot_config(path).await {
        Ok(Some(config)) => config,
        Ok(None) => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            BotConfig::default()
        }
        Err(err) => {
            tracing::warn!("{err} ({}), using defaults", path.display());
            BotConfig::default()
        }
    }
}

/// Read and parse `path`. A missing file is `Ok(None)`.
pub async fn read_bot_config(path: &Path) -> Result<Option<BotConfig>, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(ConfigError::Read(err.to_string())),
    };
    parse_bot_config(&content).map(Some)
}

/// Parse and normalize a TOML configuration document.
pub fn parse_bot_config(content: &str) -> Result<BotConfig, ConfigError> {
    toml::from_str::<BotConfig>(content)
        .map(BotConfig::normalized)
        .map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Resolve the bot token from the process environment.
pub fn resolve_bot_token() -> Result<SecretString, ConfigError> {
    resolve_bot_token_with(|key| std::env::var(key).ok())
}

/// Resolve the bot token through `lookup`: the first non-blank value among
/// [`TOKEN_ENV_VARS`] wins.
pub fn resolve_bot_token_with<F>(lookup: F) -> Result<SecretString, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    TOKEN_ENV_VARS
        .iter()
        .find_map(|key| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingCredential(TOKEN_ENV_VARS.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use secrecy::ExposeSecret;
    use tempfile::TempDir;
    use trainerbot_types::config::DuplicatePolicy;

    #[tokio::test]
    async fn load_bot_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_bot_config(&tmp.path().join("config.toml")).await;
        assert_eq!(config.backend_url, "http://127.0.0.1:8080");
        assert!(config.discovery.modules.is_empty());
    }

    #[tokio::test]
    async fn load_bot_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(
            &path,
            r#"
backend_url = "http://backend:8080//"
admin_chat_id = -1001

[trainer]
scenario_id = "objection_price"

[discovery]
duplicate_policy = "last_wins"
modules_dir = "/srv/modules"
"#,
        )
        .await
        .unwrap();

        let config = load_bot_config(&path).await;
        assert_eq!(config.backend_url, "http://backend:8080");
        assert_eq!(config.admin_sink(), Some(-1001));
        assert_eq!(config.trainer.scenario_id, "objection_price");
        assert_eq!(config.trainer.base_path, "/trainer_dialog_engine/v1");
        assert_eq!(config.discovery.duplicate_policy, DuplicatePolicy::LastWins);
        assert_eq!(config.discovery.modules_dir, Some(PathBuf::from("/srv/modules")));
    }

    #[tokio::test]
    async fn load_bot_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(&path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_bot_config(&path).await;
        assert_eq!(config.backend_url, "http://127.0.0.1:8080");
    }

    #[tokio::test]
    async fn read_bot_config_distinguishes_outcomes() {
        let tmp = TempDir::new().unwrap();
        assert!(read_bot_config(&tmp.path().join("absent.toml")).await.unwrap().is_none());

        // A directory cannot be read as a file.
        let err = read_bot_config(tmp.path()).await.unwrap_err();
        assert!(matches!(err, ConfigError::Read(_)));
    }

    #[test]
    fn parse_bot_config_reports_errors() {
        let err = parse_bot_config("polling = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn resolve_token_priority_order() {
        let env: HashMap<&str, &str> = [("TOKEN", "generic"), ("TG_BOT_TOKEN", "tg")].into();
        let token = resolve_bot_token_with(|key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(token.expose_secret(), "tg");
    }

    #[test]
    fn resolve_token_skips_blank_values() {
        let env: HashMap<&str, &str> = [("TELEGRAM_BOT_TOKEN", "  "), ("TOKEN", "fallback")].into();
        let token = resolve_bot_token_with(|key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(token.expose_secret(), "fallback");
    }

    #[test]
    fn resolve_token_missing_is_fatal_error() {
        let err = resolve_bot_token_with(|_| None).unwrap_err();
        match err {
            ConfigError::MissingCredential(vars) => {
                assert_eq!(vars, "TELEGRAM_BOT_TOKEN, TG_BOT_TOKEN, TELEGRAM_TOKEN, TOKEN");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
