pub mod cascade;
pub mod config;
pub mod errors;
pub mod invalidator;
pub mod lock;
pub mod metrics;
pub mod model;
pub mod partition;
pub mod reconcile;
pub mod resolver;
pub mod tracker;

pub use cascade::PriceCascade;
pub use config::{apply_env_overrides, load_policy, PropagationPolicy};
pub use errors::{ConfigError, LockCheckError, PropagationError, PropagationStage};
pub use invalidator::PriceInvalidator;
pub use lock::{MenuLockOracle, StoreLockOracle};
pub use model::{
    AffectedItem, ChangeNotice, PropagationFailure, PropagationOrigin, PropagationOutcome,
    PropagationSummary, TrackSkip,
};
pub use partition::{LockPartition, LockPartitioner};
pub use reconcile::{ReconcileSummary, Reconciler};
pub use resolver::DependencyResolver;
pub use tracker::{ChangeTracker, TrackOutcome};
