use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use costline::config::default_config_path;
use costline::AppConfig;

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    // stdout carries command output; logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: Option<PathBuf>,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = match config_path {
        Some(path) => Some(path.clone()),
        None => default_config_path(),
    };

    let config = match &config_path {
        Some(path) if path.exists() => {
            let content = fs::read_to_string(path)
                .await
                .context("Failed to read config file")?;
            let config = AppConfig::from_yaml(&content).context("Failed to parse config file")?;
            info!("Loaded configuration from: {}", path.display());
            config
        }
        Some(path) => {
            warn!("Config file not found, using defaults: {}", path.display());
            AppConfig::default()
        }
        None => {
            warn!("No config directory on this platform, using defaults");
            AppConfig::default()
        }
    };

    let config = config
        .finalize()
        .context("Invalid propagation settings")?;
    Ok(LoadedConfig {
        config,
        path: config_path,
    })
}
