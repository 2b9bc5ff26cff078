use thiserror::Error;

use costline_core_types::CostlineError;

#[derive(Clone, Debug, Error)]
pub enum StoreErrorKind {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

#[derive(Clone, Debug, Error)]
#[error(transparent)]
pub struct StoreError(pub StoreErrorKind);

impl StoreError {
    pub fn new(kind: StoreErrorKind) -> Self {
        Self(kind)
    }

    pub fn kind(&self) -> &StoreErrorKind {
        &self.0
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self(StoreErrorKind::Unavailable(msg.into()))
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(StoreErrorKind::NotFound(msg.into()))
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self(StoreErrorKind::InvalidRecord(msg.into()))
    }

    /// Short machine-readable code used in operation logs.
    pub fn code(&self) -> &'static str {
        match self.0 {
            StoreErrorKind::Unavailable(_) => "STORE.UNAVAILABLE",
            StoreErrorKind::NotFound(_) => "STORE.NOT_FOUND",
            StoreErrorKind::Conflict(_) => "STORE.CONFLICT",
            StoreErrorKind::InvalidRecord(_) => "STORE.INVALID_RECORD",
            StoreErrorKind::Io(_) => "STORE.IO",
            StoreErrorKind::Serde(_) => "STORE.SERDE",
        }
    }
}

impl From<StoreError> for CostlineError {
    fn from(value: StoreError) -> Self {
        CostlineError::new(value.to_string())
    }
}

impl From<StoreErrorKind> for StoreError {
    fn from(kind: StoreErrorKind) -> Self {
        StoreError(kind)
    }
}
