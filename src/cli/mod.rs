pub mod app;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod info;
pub mod lock;
pub mod output;
pub mod propagate;
pub mod recalculate;
pub mod records;
pub mod resolve;
pub mod runtime;
