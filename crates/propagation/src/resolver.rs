use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use costline_core_types::{ChangedEntity, DishId, RecipeId};
use costline_entity_store::{EntityStore, StoreResult};

use crate::model::AffectedItem;

/// Walks ingredient -> recipe/dish -> menu item. The graph has a fixed depth,
/// so every branch issues a bounded number of queries.
pub struct DependencyResolver<S> {
    store: Arc<S>,
}

impl<S> DependencyResolver<S>
where
    S: EntityStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Menu items depending on `entity`, deduplicated and ordered by item id.
    pub async fn resolve(&self, entity: &ChangedEntity) -> StoreResult<Vec<AffectedItem>> {
        let (recipes, dishes) = match entity {
            ChangedEntity::Ingredient(id) => {
                let (recipes, direct_dishes) = futures::try_join!(
                    self.store.recipes_using_ingredient(id),
                    self.store.dishes_using_ingredient(id),
                )?;
                let via_recipes = if recipes.is_empty() {
                    Vec::new()
                } else {
                    self.store.dishes_using_recipes(&recipes).await?
                };
                (recipes, union(direct_dishes, via_recipes))
            }
            ChangedEntity::Recipe(id) => {
                let recipes = vec![id.clone()];
                let dishes = self.store.dishes_using_recipes(&recipes).await?;
                (recipes, dishes)
            }
            ChangedEntity::Dish(id) => (Vec::<RecipeId>::new(), vec![id.clone()]),
        };

        if recipes.is_empty() && dishes.is_empty() {
            return Ok(Vec::new());
        }

        let items = self.store.menu_items_for_sources(&recipes, &dishes).await?;
        let unique: BTreeMap<_, _> = items
            .into_iter()
            .map(|item| (item.id.clone(), item.menu_id))
            .collect();
        Ok(unique
            .into_iter()
            .map(|(menu_item_id, menu_id)| AffectedItem {
                menu_item_id,
                menu_id,
            })
            .collect())
    }
}

fn union(left: Vec<DishId>, right: Vec<DishId>) -> Vec<DishId> {
    left.into_iter()
        .chain(right)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
