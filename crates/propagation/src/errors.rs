use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use costline_core_types::{CostlineError, MenuId};
use costline_entity_store::StoreError;

/// Pipeline stage of a single propagation call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationStage {
    Resolving,
    Partitioning,
    Invalidating,
    Tracking,
    Done,
}

impl fmt::Display for PropagationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PropagationStage::Resolving => "resolving",
            PropagationStage::Partitioning => "partitioning",
            PropagationStage::Invalidating => "invalidating",
            PropagationStage::Tracking => "tracking",
            PropagationStage::Done => "done",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Error)]
pub enum PropagationError {
    #[error("resolving dependents of {origin} failed: {source}")]
    Resolve { origin: String, source: StoreError },
    #[error("clearing {items} cached prices for {origin} failed: {source}")]
    Invalidate {
        origin: String,
        items: usize,
        menus: BTreeSet<MenuId>,
        source: StoreError,
    },
    #[error("tracking {origin} on locked menu {menu_id} failed: {source}")]
    Track {
        origin: String,
        menu_id: MenuId,
        source: StoreError,
    },
}

impl PropagationError {
    pub fn stage(&self) -> PropagationStage {
        match self {
            PropagationError::Resolve { .. } => PropagationStage::Resolving,
            PropagationError::Invalidate { .. } => PropagationStage::Invalidating,
            PropagationError::Track { .. } => PropagationStage::Tracking,
        }
    }
}

impl From<PropagationError> for CostlineError {
    fn from(value: PropagationError) -> Self {
        CostlineError::new(value.to_string())
    }
}

#[derive(Clone, Debug, Error)]
pub enum LockCheckError {
    #[error("unknown menu: {0}")]
    UnknownMenu(MenuId),
    #[error("lock state unavailable: {0}")]
    Store(#[from] StoreError),
    #[error("lock check for {menu} timed out after {after_ms}ms")]
    TimedOut { menu: MenuId, after_ms: u64 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl From<ConfigError> for CostlineError {
    fn from(value: ConfigError) -> Self {
        CostlineError::new(value.to_string())
    }
}
