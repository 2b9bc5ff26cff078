//! A store snapshot opened for one CLI invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use costline_entity_store::{InMemoryEntityStore, StoreSnapshot};
use costline_propagation::{PriceCascade, PropagationPolicy, Reconciler, StoreLockOracle};

use crate::errors::AppError;

pub type StoreCascade = PriceCascade<InMemoryEntityStore, StoreLockOracle<InMemoryEntityStore>>;

pub struct StoreSession {
    path: PathBuf,
    store: Arc<InMemoryEntityStore>,
    policy: PropagationPolicy,
}

impl StoreSession {
    pub fn open(path: &Path, policy: PropagationPolicy) -> Result<Self, AppError> {
        let snapshot = StoreSnapshot::load(path)?;
        let store = InMemoryEntityStore::from_snapshot(snapshot)?;
        info!(path = %path.display(), "Loaded store snapshot");
        Ok(Self {
            path: path.to_path_buf(),
            store: Arc::new(store),
            policy,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self) -> &Arc<InMemoryEntityStore> {
        &self.store
    }

    pub fn cascade(&self) -> StoreCascade {
        PriceCascade::with_store_locks(Arc::clone(&self.store), &self.policy)
    }

    pub fn reconciler(&self) -> Reconciler<InMemoryEntityStore> {
        Reconciler::new(Arc::clone(&self.store))
    }

    /// Writes the current tables back to the file the session was opened from.
    pub fn persist(&self) -> Result<(), AppError> {
        self.store.to_snapshot().save(&self.path)?;
        info!(path = %self.path.display(), "Saved store snapshot");
        Ok(())
    }
}
