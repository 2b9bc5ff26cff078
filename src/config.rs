//! Configuration management module
//!
//! `config.yaml` holds the default store snapshot and the propagation
//! policy; `COSTLINE_PROPAGATION__*` variables override the policy section.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use costline_propagation::{apply_env_overrides, PropagationPolicy};

use crate::errors::AppError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Store snapshot used when `--store` is not given.
    pub store_path: Option<PathBuf>,
    pub propagation: PropagationPolicy,
}

impl AppConfig {
    pub fn from_yaml(content: &str) -> Result<Self, AppError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|err| AppError::ConfigParse(err.to_string()))
    }

    /// Layers env overrides onto the policy section and validates it.
    pub fn finalize(mut self) -> Result<Self, AppError> {
        apply_env_overrides(&mut self.propagation)?;
        self.propagation.validate()?;
        Ok(self)
    }

    /// `--store` wins over the configured path.
    pub fn resolve_store_path(&self, cli: Option<&Path>) -> Result<PathBuf, AppError> {
        cli.map(Path::to_path_buf)
            .or_else(|| self.store_path.clone())
            .ok_or(AppError::NoStore)
    }
}

/// `<config dir>/costline/config.yaml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("costline");
    path.push("config.yaml");
    Some(path)
}
