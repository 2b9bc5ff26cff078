use async_trait::async_trait;

use costline_core_types::{DishId, IngredientId, MenuId, MenuItemId, RecipeId};

use crate::errors::StoreError;
use crate::model::{ChangeRecordDraft, ChangeTrackingRecord, Menu, MenuItem, UpsertOutcome};

pub type StoreResult<T> = Result<T, StoreError>;

/// Filtered select/update/insert primitives the propagation engine needs from
/// the relational store. Every call is one round-trip.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// `SELECT recipe_id FROM recipe_ingredients WHERE ingredient_id = $1`
    async fn recipes_using_ingredient(&self, ingredient: &IngredientId)
        -> StoreResult<Vec<RecipeId>>;

    /// `SELECT dish_id FROM dish_ingredients WHERE ingredient_id = $1`
    async fn dishes_using_ingredient(&self, ingredient: &IngredientId) -> StoreResult<Vec<DishId>>;

    /// `SELECT dish_id FROM dish_recipes WHERE recipe_id = ANY($1)`
    async fn dishes_using_recipes(&self, recipes: &[RecipeId]) -> StoreResult<Vec<DishId>>;

    /// `SELECT * FROM menu_items WHERE recipe_id = ANY($1) OR dish_id = ANY($2)`
    async fn menu_items_for_sources(
        &self,
        recipes: &[RecipeId],
        dishes: &[DishId],
    ) -> StoreResult<Vec<MenuItem>>;

    async fn menu_items_in_menu(&self, menu: &MenuId) -> StoreResult<Vec<MenuItem>>;

    /// Sets `recommended_selling_price = NULL` for the given ids. Returns the
    /// number of rows matched.
    async fn clear_recommended_prices(&self, items: &[MenuItemId]) -> StoreResult<usize>;

    async fn menu(&self, menu: &MenuId) -> StoreResult<Option<Menu>>;

    async fn set_menu_lock(
        &self,
        menu: &MenuId,
        locked: bool,
        locked_by: Option<&str>,
    ) -> StoreResult<Menu>;

    /// Insert-or-merge on the pending (menu_id, entity_type, entity_id) key.
    async fn upsert_change_record(&self, draft: ChangeRecordDraft) -> StoreResult<UpsertOutcome>;

    async fn pending_change_records(&self, menu: &MenuId)
        -> StoreResult<Vec<ChangeTrackingRecord>>;

    /// Marks every pending record of the menu reconciled. Returns how many were closed.
    async fn mark_change_records_reconciled(
        &self,
        menu: &MenuId,
        reconciled_by: &str,
    ) -> StoreResult<usize>;
}

#[async_trait]
impl<S> EntityStore for std::sync::Arc<S>
where
    S: EntityStore + ?Sized,
{
    async fn recipes_using_ingredient(
        &self,
        ingredient: &IngredientId,
    ) -> StoreResult<Vec<RecipeId>> {
        (**self).recipes_using_ingredient(ingredient).await
    }

    async fn dishes_using_ingredient(&self, ingredient: &IngredientId) -> StoreResult<Vec<DishId>> {
        (**self).dishes_using_ingredient(ingredient).await
    }

    async fn dishes_using_recipes(&self, recipes: &[RecipeId]) -> StoreResult<Vec<DishId>> {
        (**self).dishes_using_recipes(recipes).await
    }

    async fn menu_items_for_sources(
        &self,
        recipes: &[RecipeId],
        dishes: &[DishId],
    ) -> StoreResult<Vec<MenuItem>> {
        (**self).menu_items_for_sources(recipes, dishes).await
    }

    async fn menu_items_in_menu(&self, menu: &MenuId) -> StoreResult<Vec<MenuItem>> {
        (**self).menu_items_in_menu(menu).await
    }

    async fn clear_recommended_prices(&self, items: &[MenuItemId]) -> StoreResult<usize> {
        (**self).clear_recommended_prices(items).await
    }

    async fn menu(&self, menu: &MenuId) -> StoreResult<Option<Menu>> {
        (**self).menu(menu).await
    }

    async fn set_menu_lock(
        &self,
        menu: &MenuId,
        locked: bool,
        locked_by: Option<&str>,
    ) -> StoreResult<Menu> {
        (**self).set_menu_lock(menu, locked, locked_by).await
    }

    async fn upsert_change_record(&self, draft: ChangeRecordDraft) -> StoreResult<UpsertOutcome> {
        (**self).upsert_change_record(draft).await
    }

    async fn pending_change_records(
        &self,
        menu: &MenuId,
    ) -> StoreResult<Vec<ChangeTrackingRecord>> {
        (**self).pending_change_records(menu).await
    }

    async fn mark_change_records_reconciled(
        &self,
        menu: &MenuId,
        reconciled_by: &str,
    ) -> StoreResult<usize> {
        (**self).mark_change_records_reconciled(menu, reconciled_by).await
    }
}
