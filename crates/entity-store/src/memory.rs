use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;

use costline_core_types::{
    ChangeRecordId, ChangedEntity, DishId, IngredientId, MenuId, MenuItemId, RecipeId,
};

use crate::errors::StoreError;
use crate::fault::{FaultPlan, StoreOp};
use crate::model::{
    ChangeKey, ChangeRecordDraft, ChangeTrackingRecord, Dish, DishIngredient, DishRecipe,
    Ingredient, Menu, MenuItem, Recipe, RecipeIngredient, UpsertOutcome,
};
use crate::observe;
use crate::snapshot::StoreSnapshot;
use crate::spi::{EntityStore, StoreResult};

/// In-memory relational store. Cloning shares the same tables.
#[derive(Clone, Default)]
pub struct InMemoryEntityStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    tables: RwLock<Tables>,
    faults: FaultPlan,
}

#[derive(Default)]
struct Tables {
    ingredients: BTreeMap<IngredientId, Ingredient>,
    recipes: BTreeMap<RecipeId, Recipe>,
    recipe_ingredients: Vec<RecipeIngredient>,
    dishes: BTreeMap<DishId, Dish>,
    dish_ingredients: Vec<DishIngredient>,
    dish_recipes: Vec<DishRecipe>,
    menus: BTreeMap<MenuId, Menu>,
    menu_items: BTreeMap<MenuItemId, MenuItem>,
    change_records: BTreeMap<ChangeRecordId, ChangeTrackingRecord>,
    // UNIQUE (menu_id, entity_type, entity_id) WHERE reconciled_at IS NULL
    pending_index: HashMap<ChangeKey, ChangeRecordId>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        let store = Self::new();
        {
            let mut tables = store.inner.tables.write();
            for row in snapshot.ingredients {
                tables.ingredients.insert(row.id.clone(), row);
            }
            for row in snapshot.recipes {
                tables.recipes.insert(row.id.clone(), row);
            }
            tables.recipe_ingredients = snapshot.recipe_ingredients;
            for row in snapshot.dishes {
                tables.dishes.insert(row.id.clone(), row);
            }
            tables.dish_ingredients = snapshot.dish_ingredients;
            tables.dish_recipes = snapshot.dish_recipes;
            for row in snapshot.menus {
                tables.menus.insert(row.id.clone(), row);
            }
            for row in snapshot.menu_items {
                validate_menu_item(&row)?;
                tables.menu_items.insert(row.id.clone(), row);
            }
            for row in snapshot.change_records {
                if row.is_pending() {
                    let key = row.key();
                    if tables.pending_index.contains_key(&key) {
                        return Err(StoreError::invalid(format!(
                            "duplicate pending change record for {}/{}:{}",
                            key.menu_id, key.entity_type, key.entity_id
                        )));
                    }
                    tables.pending_index.insert(key, row.id.clone());
                }
                tables.change_records.insert(row.id.clone(), row);
            }
        }
        Ok(store)
    }

    pub fn to_snapshot(&self) -> StoreSnapshot {
        let tables = self.inner.tables.read();
        StoreSnapshot {
            ingredients: tables.ingredients.values().cloned().collect(),
            recipes: tables.recipes.values().cloned().collect(),
            recipe_ingredients: tables.recipe_ingredients.clone(),
            dishes: tables.dishes.values().cloned().collect(),
            dish_ingredients: tables.dish_ingredients.clone(),
            dish_recipes: tables.dish_recipes.clone(),
            menus: tables.menus.values().cloned().collect(),
            menu_items: tables.menu_items.values().cloned().collect(),
            change_records: tables.change_records.values().cloned().collect(),
        }
    }

    pub fn insert_ingredient(&self, row: Ingredient) {
        self.inner.tables.write().ingredients.insert(row.id.clone(), row);
    }

    /// Writes a new cost and returns the previous one.
    pub fn update_ingredient_cost(
        &self,
        id: &IngredientId,
        cost_per_unit: f64,
    ) -> Result<f64, StoreError> {
        let mut tables = self.inner.tables.write();
        let row = tables
            .ingredients
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(format!("ingredient {id}")))?;
        let before = row.cost_per_unit;
        row.cost_per_unit = cost_per_unit;
        Ok(before)
    }

    pub fn insert_recipe(&self, row: Recipe, links: Vec<RecipeIngredient>) {
        let mut tables = self.inner.tables.write();
        tables.recipe_ingredients.retain(|link| link.recipe_id != row.id);
        tables.recipe_ingredients.extend(links);
        tables.recipes.insert(row.id.clone(), row);
    }

    pub fn insert_dish(&self, row: Dish, ingredients: Vec<DishIngredient>, recipes: Vec<DishRecipe>) {
        let mut tables = self.inner.tables.write();
        tables.dish_ingredients.retain(|link| link.dish_id != row.id);
        tables.dish_recipes.retain(|link| link.dish_id != row.id);
        tables.dish_ingredients.extend(ingredients);
        tables.dish_recipes.extend(recipes);
        tables.dishes.insert(row.id.clone(), row);
    }

    pub fn insert_menu(&self, row: Menu) {
        self.inner.tables.write().menus.insert(row.id.clone(), row);
    }

    pub fn insert_menu_item(&self, row: MenuItem) -> Result<(), StoreError> {
        validate_menu_item(&row)?;
        self.inner.tables.write().menu_items.insert(row.id.clone(), row);
        Ok(())
    }

    /// Display name of a cost-bearing entity, if the row exists.
    pub fn entity_name(&self, entity: &ChangedEntity) -> Option<String> {
        let tables = self.inner.tables.read();
        match entity {
            ChangedEntity::Ingredient(id) => tables.ingredients.get(id).map(|row| row.name.clone()),
            ChangedEntity::Recipe(id) => tables.recipes.get(id).map(|row| row.name.clone()),
            ChangedEntity::Dish(id) => tables.dishes.get(id).map(|row| row.name.clone()),
        }
    }

    pub fn menu_item(&self, id: &MenuItemId) -> Option<MenuItem> {
        self.inner.tables.read().menu_items.get(id).cloned()
    }

    /// All change records, pending and reconciled, ordered by id.
    pub fn change_records(&self) -> Vec<ChangeTrackingRecord> {
        self.inner.tables.read().change_records.values().cloned().collect()
    }

    /// Makes every call to `op` fail until [`clear_faults`](Self::clear_faults).
    pub fn inject_fault(&self, op: StoreOp) {
        self.inner.faults.add(op, None);
    }

    /// Makes `op` fail only when it touches `menu`.
    pub fn inject_menu_fault(&self, op: StoreOp, menu: MenuId) {
        self.inner.faults.add(op, Some(menu));
    }

    pub fn clear_faults(&self) {
        self.inner.faults.clear();
    }
}

fn validate_menu_item(item: &MenuItem) -> Result<(), StoreError> {
    match (&item.recipe_id, &item.dish_id) {
        (Some(_), None) | (None, Some(_)) => Ok(()),
        _ => Err(StoreError::invalid(format!(
            "menu item {} must reference exactly one of recipe_id or dish_id",
            item.id
        ))),
    }
}

/// JSON merge patch: objects merge per key, anything else overwrites.
pub(crate) fn merge_patch(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (k, v) in patch_map {
                merge_patch(target_map.entry(k).or_insert(Value::Null), v);
            }
        }
        (slot, value) => {
            *slot = value.clone();
        }
    }
}

fn dedup<T: Ord>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    values.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn recipes_using_ingredient(
        &self,
        ingredient: &IngredientId,
    ) -> StoreResult<Vec<RecipeId>> {
        let guard = observe::operation("recipes_using_ingredient", Some(ingredient.as_str()));
        let result = self.inner.faults.check(StoreOp::ResolveRecipes, None).map(|_| {
            let tables = self.inner.tables.read();
            dedup(
                tables
                    .recipe_ingredients
                    .iter()
                    .filter(|link| &link.ingredient_id == ingredient)
                    .map(|link| link.recipe_id.clone()),
            )
        });
        guard.finish_with(&result, Vec::len, StoreError::code);
        result
    }

    async fn dishes_using_ingredient(&self, ingredient: &IngredientId) -> StoreResult<Vec<DishId>> {
        let guard = observe::operation("dishes_using_ingredient", Some(ingredient.as_str()));
        let result = self.inner.faults.check(StoreOp::ResolveDishes, None).map(|_| {
            let tables = self.inner.tables.read();
            dedup(
                tables
                    .dish_ingredients
                    .iter()
                    .filter(|link| &link.ingredient_id == ingredient)
                    .map(|link| link.dish_id.clone()),
            )
        });
        guard.finish_with(&result, Vec::len, StoreError::code);
        result
    }

    async fn dishes_using_recipes(&self, recipes: &[RecipeId]) -> StoreResult<Vec<DishId>> {
        let guard = observe::operation("dishes_using_recipes", None);
        let result = self.inner.faults.check(StoreOp::ResolveDishes, None).map(|_| {
            let tables = self.inner.tables.read();
            dedup(
                tables
                    .dish_recipes
                    .iter()
                    .filter(|link| recipes.contains(&link.recipe_id))
                    .map(|link| link.dish_id.clone()),
            )
        });
        guard.finish_with(&result, Vec::len, StoreError::code);
        result
    }

    async fn menu_items_for_sources(
        &self,
        recipes: &[RecipeId],
        dishes: &[DishId],
    ) -> StoreResult<Vec<MenuItem>> {
        let guard = observe::operation("menu_items_for_sources", None);
        let result = self
            .inner
            .faults
            .check(StoreOp::ResolveMenuItems, None)
            .map(|_| {
                let tables = self.inner.tables.read();
                tables
                    .menu_items
                    .values()
                    .filter(|item| {
                        item.recipe_id
                            .as_ref()
                            .map(|id| recipes.contains(id))
                            .unwrap_or(false)
                            || item
                                .dish_id
                                .as_ref()
                                .map(|id| dishes.contains(id))
                                .unwrap_or(false)
                    })
                    .cloned()
                    .collect::<Vec<_>>()
            });
        guard.finish_with(&result, Vec::len, StoreError::code);
        result
    }

    async fn menu_items_in_menu(&self, menu: &MenuId) -> StoreResult<Vec<MenuItem>> {
        let guard = observe::operation("menu_items_in_menu", Some(menu.as_str()));
        let result = self
            .inner
            .faults
            .check(StoreOp::ResolveMenuItems, Some(menu))
            .map(|_| {
                let tables = self.inner.tables.read();
                tables
                    .menu_items
                    .values()
                    .filter(|item| &item.menu_id == menu)
                    .cloned()
                    .collect::<Vec<_>>()
            });
        guard.finish_with(&result, Vec::len, StoreError::code);
        result
    }

    async fn clear_recommended_prices(&self, items: &[MenuItemId]) -> StoreResult<usize> {
        let guard = observe::operation("clear_recommended_prices", None);
        let result = (|| -> StoreResult<usize> {
            let mut tables = self.inner.tables.write();
            let menus: BTreeSet<MenuId> = items
                .iter()
                .filter_map(|id| tables.menu_items.get(id).map(|item| item.menu_id.clone()))
                .collect();
            self.inner.faults.check(StoreOp::ClearPrices, None)?;
            for menu in &menus {
                self.inner.faults.check(StoreOp::ClearPrices, Some(menu))?;
            }
            let mut matched = 0;
            for id in items {
                if let Some(item) = tables.menu_items.get_mut(id) {
                    item.recommended_selling_price = None;
                    matched += 1;
                }
            }
            Ok(matched)
        })();
        guard.finish_with(&result, |rows| *rows, StoreError::code);
        result
    }

    async fn menu(&self, menu: &MenuId) -> StoreResult<Option<Menu>> {
        let guard = observe::operation("menu", Some(menu.as_str()));
        let result = self
            .inner
            .faults
            .check(StoreOp::ReadMenu, Some(menu))
            .map(|_| self.inner.tables.read().menus.get(menu).cloned());
        guard.finish_with(&result, |row| usize::from(row.is_some()), StoreError::code);
        result
    }

    async fn set_menu_lock(
        &self,
        menu: &MenuId,
        locked: bool,
        locked_by: Option<&str>,
    ) -> StoreResult<Menu> {
        let guard = observe::operation("set_menu_lock", Some(menu.as_str()));
        let result = self
            .inner
            .faults
            .check(StoreOp::WriteMenu, Some(menu))
            .and_then(|_| {
                let mut tables = self.inner.tables.write();
                let row = tables
                    .menus
                    .get_mut(menu)
                    .ok_or_else(|| StoreError::not_found(format!("menu {menu}")))?;
                row.locked = locked;
                if locked {
                    row.locked_at = Some(Utc::now());
                    row.locked_by = locked_by.map(str::to_string);
                } else {
                    row.locked_at = None;
                    row.locked_by = None;
                }
                Ok(row.clone())
            });
        guard.finish_with(&result, |_| 1, StoreError::code);
        result
    }

    async fn upsert_change_record(&self, draft: ChangeRecordDraft) -> StoreResult<UpsertOutcome> {
        let guard = observe::operation("upsert_change_record", Some(draft.menu_id.as_str()));
        let result = self
            .inner
            .faults
            .check(StoreOp::UpsertChangeRecord, Some(&draft.menu_id))
            .and_then(|_| {
                let key = draft.key();
                let now = Utc::now();
                let mut tables = self.inner.tables.write();
                let existing = tables.pending_index.get(&key).cloned();
                if let Some(record_id) = existing {
                    let record = tables.change_records.get_mut(&record_id).ok_or_else(|| {
                        StoreError::invalid(format!("dangling pending index entry {record_id}"))
                    })?;
                    merge_patch(&mut record.change_details, &draft.change_details);
                    record.entity_name = draft.entity_name;
                    record.change_type = draft.change_type;
                    if draft.changed_by.is_some() {
                        record.changed_by = draft.changed_by;
                    }
                    record.updated_at = now;
                    return Ok(UpsertOutcome {
                        record: record.clone(),
                        created: false,
                    });
                }

                let record = ChangeTrackingRecord {
                    id: ChangeRecordId::new(),
                    menu_id: draft.menu_id,
                    entity_type: draft.entity_type,
                    entity_id: draft.entity_id,
                    entity_name: draft.entity_name,
                    change_type: draft.change_type,
                    change_details: draft.change_details,
                    changed_by: draft.changed_by,
                    created_at: now,
                    updated_at: now,
                    reconciled_at: None,
                    reconciled_by: None,
                };
                tables.pending_index.insert(key, record.id.clone());
                tables
                    .change_records
                    .insert(record.id.clone(), record.clone());
                Ok(UpsertOutcome {
                    record,
                    created: true,
                })
            });
        guard.finish_with(&result, |_| 1, StoreError::code);
        result
    }

    async fn pending_change_records(
        &self,
        menu: &MenuId,
    ) -> StoreResult<Vec<ChangeTrackingRecord>> {
        let guard = observe::operation("pending_change_records", Some(menu.as_str()));
        let result = self
            .inner
            .faults
            .check(StoreOp::ReadChangeRecords, Some(menu))
            .map(|_| {
                let tables = self.inner.tables.read();
                let mut records: Vec<ChangeTrackingRecord> = tables
                    .change_records
                    .values()
                    .filter(|record| &record.menu_id == menu && record.is_pending())
                    .cloned()
                    .collect();
                records.sort_by(|a, b| {
                    a.created_at
                        .cmp(&b.created_at)
                        .then_with(|| a.id.cmp(&b.id))
                });
                records
            });
        guard.finish_with(&result, Vec::len, StoreError::code);
        result
    }

    async fn mark_change_records_reconciled(
        &self,
        menu: &MenuId,
        reconciled_by: &str,
    ) -> StoreResult<usize> {
        let guard = observe::operation("mark_change_records_reconciled", Some(menu.as_str()));
        let result = self
            .inner
            .faults
            .check(StoreOp::ReconcileChangeRecords, Some(menu))
            .map(|_| {
                let now = Utc::now();
                let mut tables = self.inner.tables.write();
                let Tables {
                    change_records,
                    pending_index,
                    ..
                } = &mut *tables;
                let mut closed = 0;
                for record in change_records.values_mut() {
                    if &record.menu_id == menu && record.is_pending() {
                        record.reconciled_at = Some(now);
                        record.reconciled_by = Some(reconciled_by.to_string());
                        pending_index.remove(&record.key());
                        closed += 1;
                    }
                }
                closed
            });
        guard.finish_with(&result, |rows| *rows, StoreError::code);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_patch_overwrites_leaves_and_keeps_other_keys() {
        let mut target = json!({
            "cost_per_unit": { "before": 1.0, "after": 1.2 },
            "unit": { "before": "kg", "after": "kg" }
        });
        merge_patch(
            &mut target,
            &json!({ "cost_per_unit": { "before": 1.2, "after": 1.5 } }),
        );
        assert_eq!(target["cost_per_unit"]["after"], json!(1.5));
        assert_eq!(target["cost_per_unit"]["before"], json!(1.2));
        assert_eq!(target["unit"]["before"], json!("kg"));
    }

    #[test]
    fn menu_item_must_have_exactly_one_cost_source() {
        let store = InMemoryEntityStore::new();
        let err = store
            .insert_menu_item(MenuItem {
                id: MenuItemId::from("orphan"),
                menu_id: MenuId::from("m"),
                name: "Orphan".into(),
                recipe_id: None,
                dish_id: None,
                recommended_selling_price: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), "STORE.INVALID_RECORD");
    }

    #[test]
    fn update_ingredient_cost_returns_previous_value() {
        let store = InMemoryEntityStore::new();
        store.insert_ingredient(Ingredient {
            id: IngredientId::from("flour"),
            name: "Flour".into(),
            cost_per_unit: 1.0,
            unit: Some("kg".into()),
        });
        let before = store
            .update_ingredient_cost(&IngredientId::from("flour"), 1.2)
            .unwrap();
        assert_eq!(before, 1.0);
        assert!(store
            .update_ingredient_cost(&IngredientId::from("salt"), 2.0)
            .is_err());
    }
}
