//! Error handling module
//!
//! Errors raised while wiring the CLI to a store snapshot

use thiserror::Error;

use costline_core_types::CostlineError;
use costline_entity_store::StoreError;
use costline_propagation::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to parse config file: {0}")]
    ConfigParse(String),
    #[error("no store snapshot given; pass --store or set store_path in the config file")]
    NoStore,
}

impl From<AppError> for CostlineError {
    fn from(value: AppError) -> Self {
        CostlineError::new(value.to_string())
    }
}
