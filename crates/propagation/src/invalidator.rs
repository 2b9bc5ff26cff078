use std::sync::Arc;

use tracing::{debug, error};

use costline_core_types::MenuItemId;
use costline_entity_store::{EntityStore, StoreResult};

/// Clears cached recommended prices so readers recompute them.
pub struct PriceInvalidator<S> {
    store: Arc<S>,
}

impl<S> PriceInvalidator<S>
where
    S: EntityStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// One batched update. An empty slice is a successful no-op.
    pub async fn invalidate(&self, origin: &str, items: &[MenuItemId]) -> StoreResult<usize> {
        if items.is_empty() {
            return Ok(0);
        }
        match self.store.clear_recommended_prices(items).await {
            Ok(rows) => {
                debug!(origin, requested = items.len(), rows, "cleared recommended prices");
                Ok(rows)
            }
            Err(err) => {
                let ids: Vec<&str> = items.iter().map(MenuItemId::as_str).collect();
                error!(origin, menu_items = ?ids, code = err.code(), "price invalidation failed: {err}");
                Err(err)
            }
        }
    }
}
