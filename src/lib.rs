//! Costline library
//!
//! Exposes modules for integration testing

pub mod config;
pub mod errors;
pub mod session;

// Re-export commonly used types for external use
pub use config::AppConfig;
pub use costline_core_types as core_types;
pub use costline_entity_store as entity_store;
pub use costline_propagation as propagation;
pub use errors::AppError;
pub use session::{StoreCascade, StoreSession};
