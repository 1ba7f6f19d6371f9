//! Application state wiring the adapters together.
//!
//! Core components are generic over the backend and catalog ports; AppState
//! pins them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use trainerbot_core::discovery::prober::EndpointProber;
use trainerbot_core::discovery::{Discovery, discover_modules};
use trainerbot_infra::backend::HttpBackend;
use trainerbot_infra::config::{default_config_path, load_bot_config};
use trainerbot_infra::filesystem::FsModuleCatalog;
use trainerbot_types::config::BotConfig;

use crate::cli::Overrides;

/// Shared application state used by every command.
pub struct AppState {
    pub config: BotConfig,
    pub config_path: Option<PathBuf>,
    pub backend: Arc<HttpBackend>,
    pub catalog: FsModuleCatalog,
}

impl AppState {
    /// Load configuration, apply overrides, and build the adapters.
    pub async fn init(overrides: &Overrides) -> anyhow::Result<Self> {
        let config_path = overrides.config_path.clone().or_else(default_config_path);
        let config = match &config_path {
            Some(path) => load_bot_config(path).await,
            None => BotConfig::default(),
        };
        let config = apply_overrides(config, overrides);

        for problem in config.validate() {
            warn!("{problem}");
        }
        info!(
            backend = %config.backend_url,
            admin_chat = ?config.admin_sink(),
            "Configuration loaded"
        );

        let backend = Arc::new(HttpBackend::new(
            &config.backend_url,
            config.backend.clone(),
            config.trainer.clone(),
        ));
        let catalog = FsModuleCatalog::new(config.discovery.modules_dir.clone());

        Ok(Self {
            config,
            config_path,
            backend,
            catalog,
        })
    }

    /// Run the full discovery chain against the configured backend.
    pub async fn discover(&self) -> Discovery {
        discover_modules(
            self.backend.as_ref(),
            &self.catalog,
            EndpointProber::default(),
            &self.config.discovery,
        )
        .await
    }
}

fn apply_overrides(mut config: BotConfig, overrides: &Overrides) -> BotConfig {
    if let Some(url) = &overrides.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(id) = overrides.admin_chat_id {
        config.admin_chat_id = Some(id);
    }
    config.normalized()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win_over_file_values() {
        let config = BotConfig {
            backend_url: "http://from-file:8080".to_string(),
            admin_chat_id: Some(42),
            ..BotConfig::default()
        };
        let overrides = Overrides {
            backend_url: Some("http://from-flag:9000/".to_string()),
            admin_chat_id: Some(0),
            ..Overrides::default()
        };

        let config = apply_overrides(config, &overrides);
        assert_eq!(config.backend_url, "http://from-flag:9000");
        assert!(config.admin_sink().is_none());
    }

    #[test]
    fn test_no_overrides_keeps_file_values() {
        let config = BotConfig {
            admin_chat_id: Some(42),
            ..BotConfig::default()
        };
        let config = apply_overrides(config, &Overrides::default());
        assert_eq!(config.admin_sink(), Some(42));
        assert_eq!(config.backend_url, "http://127.0.0.1:8080");
    }
}
