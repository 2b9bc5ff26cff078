use std::sync::Arc;

use async_trait::async_trait;

use costline_core_types::MenuId;
use costline_entity_store::EntityStore;

use crate::errors::LockCheckError;

/// Authoritative "is this menu frozen" predicate.
#[async_trait]
pub trait MenuLockOracle: Send + Sync {
    async fn is_menu_locked(&self, menu: &MenuId) -> Result<bool, LockCheckError>;
}

#[async_trait]
impl<L> MenuLockOracle for Arc<L>
where
    L: MenuLockOracle + ?Sized,
{
    async fn is_menu_locked(&self, menu: &MenuId) -> Result<bool, LockCheckError> {
        (**self).is_menu_locked(menu).await
    }
}

/// Reads the `menus.locked` column.
pub struct StoreLockOracle<S> {
    store: Arc<S>,
}

impl<S> StoreLockOracle<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> MenuLockOracle for StoreLockOracle<S>
where
    S: EntityStore + 'static,
{
    async fn is_menu_locked(&self, menu: &MenuId) -> Result<bool, LockCheckError> {
        let row = self.store.menu(menu).await?;
        row.map(|menu| menu.locked)
            .ok_or_else(|| LockCheckError::UnknownMenu(menu.clone()))
    }
}
