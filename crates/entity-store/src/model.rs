use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use costline_core_types::{
    ChangeRecordId, ChangeType, DishId, EntityKind, IngredientId, MenuId, MenuItemId, RecipeId,
};

/// Row of the `ingredients` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub cost_per_unit: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Row of the `recipes` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    #[serde(default = "default_yield")]
    pub yield_quantity: f64,
    #[serde(default)]
    pub yield_unit: Option<String>,
}

fn default_yield() -> f64 {
    1.0
}

/// Row of the `recipe_ingredients` link table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub quantity: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub position: u32,
}

/// Row of the `dishes` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub id: DishId,
    pub name: String,
}

/// Row of the `dish_ingredients` link table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DishIngredient {
    pub dish_id: DishId,
    pub ingredient_id: IngredientId,
    pub quantity: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Row of the `dish_recipes` link table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DishRecipe {
    pub dish_id: DishId,
    pub recipe_id: RecipeId,
    #[serde(default = "default_yield")]
    pub quantity: f64,
}

/// Row of the `menus` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub id: MenuId,
    pub name: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub locked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub locked_by: Option<String>,
}

/// Row of the `menu_items` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub menu_id: MenuId,
    pub name: String,
    #[serde(default)]
    pub recipe_id: Option<RecipeId>,
    #[serde(default)]
    pub dish_id: Option<DishId>,
    /// Cached derived price; `None` means "recompute on next read".
    #[serde(default)]
    pub recommended_selling_price: Option<f64>,
}

/// Row of the `menu_change_tracking` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeTrackingRecord {
    pub id: ChangeRecordId,
    pub menu_id: MenuId,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub entity_name: String,
    pub change_type: ChangeType,
    #[serde(default)]
    pub change_details: serde_json::Value,
    #[serde(default)]
    pub changed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub reconciled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reconciled_by: Option<String>,
}

impl ChangeTrackingRecord {
    pub fn is_pending(&self) -> bool {
        self.reconciled_at.is_none()
    }

    pub fn key(&self) -> ChangeKey {
        ChangeKey {
            menu_id: self.menu_id.clone(),
            entity_type: self.entity_type,
            entity_id: self.entity_id.clone(),
        }
    }
}

/// Natural key of a pending change record.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ChangeKey {
    pub menu_id: MenuId,
    pub entity_type: EntityKind,
    pub entity_id: String,
}

/// Values written by a change-tracking upsert.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecordDraft {
    pub menu_id: MenuId,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub entity_name: String,
    pub change_type: ChangeType,
    #[serde(default)]
    pub change_details: serde_json::Value,
    #[serde(default)]
    pub changed_by: Option<String>,
}

impl ChangeRecordDraft {
    pub fn key(&self) -> ChangeKey {
        ChangeKey {
            menu_id: self.menu_id.clone(),
            entity_type: self.entity_type,
            entity_id: self.entity_id.clone(),
        }
    }
}

/// Result of an upsert against the pending-change unique key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    pub record: ChangeTrackingRecord,
    pub created: bool,
}
