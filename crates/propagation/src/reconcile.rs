use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use costline_core_types::{MenuId, MenuItemId};
use costline_entity_store::{ChangeTrackingRecord, EntityStore, Menu, StoreError};

use crate::metrics;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub records: usize,
    pub prices_cleared: usize,
}

/// Closes the deferred-change lifecycle on a locked menu.
pub struct Reconciler<S> {
    store: Arc<S>,
}

impl<S> Reconciler<S>
where
    S: EntityStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Unreconciled records for the menu, oldest first.
    pub async fn pending(&self, menu: &MenuId) -> Result<Vec<ChangeTrackingRecord>, StoreError> {
        self.store.pending_change_records(menu).await
    }

    /// Clears every cached price on the menu, then closes its pending records
    /// so the next change opens a fresh one. Prices go first: if closing fails
    /// the records stay pending and a retry is harmless.
    pub async fn reconcile(
        &self,
        menu: &MenuId,
        reconciled_by: &str,
    ) -> Result<ReconcileSummary, StoreError> {
        if self.store.menu(menu).await?.is_none() {
            return Err(StoreError::not_found(format!("menu {menu}")));
        }
        let items: Vec<MenuItemId> = self
            .store
            .menu_items_in_menu(menu)
            .await?
            .into_iter()
            .map(|item| item.id)
            .collect();
        let prices_cleared = if items.is_empty() {
            0
        } else {
            self.store.clear_recommended_prices(&items).await?
        };
        metrics::record_invalidated(prices_cleared);

        let records = self
            .store
            .mark_change_records_reconciled(menu, reconciled_by)
            .await?;
        info!(menu_id = %menu, records, prices_cleared, reconciled_by, "menu reconciled");
        Ok(ReconcileSummary {
            records,
            prices_cleared,
        })
    }

    pub async fn lock_menu(&self, menu: &MenuId, locked_by: &str) -> Result<Menu, StoreError> {
        let row = self.store.set_menu_lock(menu, true, Some(locked_by)).await?;
        info!(menu_id = %menu, locked_by, "menu locked");
        Ok(row)
    }

    pub async fn unlock_menu(&self, menu: &MenuId) -> Result<Menu, StoreError> {
        let row = self.store.set_menu_lock(menu, false, None).await?;
        info!(menu_id = %menu, "menu unlocked");
        Ok(row)
    }
}
