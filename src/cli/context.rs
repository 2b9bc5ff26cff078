use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use costline::{AppConfig, StoreSession};

use super::output::OutputFormat;

pub struct CliContext {
    config: AppConfig,
    config_path: Option<PathBuf>,
    store_override: Option<PathBuf>,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(
        config: AppConfig,
        config_path: Option<PathBuf>,
        store_override: Option<PathBuf>,
        output: OutputFormat,
    ) -> Self {
        Self {
            config,
            config_path,
            store_override,
            output,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    pub fn store_path(&self) -> Option<PathBuf> {
        self.config
            .resolve_store_path(self.store_override.as_deref())
            .ok()
    }

    pub fn open_session(&self) -> Result<StoreSession> {
        let path = self
            .config
            .resolve_store_path(self.store_override.as_deref())?;
        StoreSession::open(&path, self.config.propagation.clone())
            .with_context(|| format!("Failed to open store snapshot {}", path.display()))
    }

    /// Persists the session when `write` is set; otherwise the run is a dry run.
    pub fn finish(&self, session: &StoreSession, write: bool) -> Result<bool> {
        if write {
            session.persist().context("Failed to save store snapshot")?;
        } else {
            info!("Dry run; pass --write to save changes to {}", session.path().display());
        }
        Ok(write)
    }
}
