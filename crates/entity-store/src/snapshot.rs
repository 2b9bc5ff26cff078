use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{StoreError, StoreErrorKind};
use crate::model::{
    ChangeTrackingRecord, Dish, DishIngredient, DishRecipe, Ingredient, Menu, MenuItem, Recipe,
    RecipeIngredient,
};

/// Full dump of every table, used to seed and persist the in-memory store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub recipe_ingredients: Vec<RecipeIngredient>,
    #[serde(default)]
    pub dishes: Vec<Dish>,
    #[serde(default)]
    pub dish_ingredients: Vec<DishIngredient>,
    #[serde(default)]
    pub dish_recipes: Vec<DishRecipe>,
    #[serde(default)]
    pub menus: Vec<Menu>,
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
    #[serde(default)]
    pub change_records: Vec<ChangeTrackingRecord>,
}

impl StoreSnapshot {
    /// Reads a snapshot from a `.json` file, or YAML for any other extension.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path)
            .map_err(|err| StoreErrorKind::Io(format!("{}: {err}", path.display())))?;
        let snapshot: StoreSnapshot = if is_json(path) {
            serde_json::from_str(&content).map_err(|err| StoreErrorKind::Serde(err.to_string()))?
        } else {
            serde_yaml::from_str(&content).map_err(|err| StoreErrorKind::Serde(err.to_string()))?
        };
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)
                .map_err(|err| StoreErrorKind::Serde(err.to_string()))?
        } else {
            serde_yaml::to_string(self).map_err(|err| StoreErrorKind::Serde(err.to_string()))?
        };
        fs::write(path, content)
            .map_err(|err| StoreErrorKind::Io(format!("{}: {err}", path.display())))?;
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
