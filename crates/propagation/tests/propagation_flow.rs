use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use costline_core_types::{
    ChangeType, ChangedEntity, DishId, EntityKind, IngredientId, MenuId, MenuItemId, RecipeId,
};
use costline_entity_store::{
    Dish, DishIngredient, DishRecipe, EntityStore, InMemoryEntityStore, Ingredient, Menu,
    MenuItem, Recipe, RecipeIngredient, StoreOp,
};
use costline_propagation::{
    ChangeNotice, DependencyResolver, LockCheckError, MenuLockOracle, PriceCascade,
    PropagationError, PropagationOrigin, PropagationPolicy, PropagationStage, Reconciler,
    StoreLockOracle, TrackSkip,
};

fn menus(values: &[&str]) -> BTreeSet<MenuId> {
    values.iter().map(|v| MenuId::from(*v)).collect()
}

fn ingredient(id: &str, name: &str, cost: f64) -> Ingredient {
    Ingredient {
        id: IngredientId::from(id),
        name: name.into(),
        cost_per_unit: cost,
        unit: Some("kg".into()),
    }
}

fn recipe_link(recipe: &str, ingredient: &str, position: u32) -> RecipeIngredient {
    RecipeIngredient {
        recipe_id: RecipeId::from(recipe),
        ingredient_id: IngredientId::from(ingredient),
        quantity: 0.25,
        unit: Some("kg".into()),
        position,
    }
}

fn menu(id: &str, locked: bool) -> Menu {
    Menu {
        id: MenuId::from(id),
        name: id.replace('-', " "),
        locked,
        locked_at: None,
        locked_by: locked.then(|| "chef".to_string()),
    }
}

fn item(id: &str, menu: &str, recipe: Option<&str>, dish: Option<&str>) -> MenuItem {
    MenuItem {
        id: MenuItemId::from(id),
        menu_id: MenuId::from(menu),
        name: id.replace('-', " "),
        recipe_id: recipe.map(RecipeId::from),
        dish_id: dish.map(DishId::from),
        recommended_selling_price: Some(10.0),
    }
}

/// Kitchen used across the scenarios:
///
/// - `pizza-dough` = flour + salt; `pesto` = basil
/// - `margherita-plate` = basil directly + `pizza-dough` as a sub-recipe
/// - `side-salad` = salt directly
/// - `dinner` and `brunch` are unlocked, `lunch-special` is locked
fn kitchen() -> Arc<InMemoryEntityStore> {
    let store = Arc::new(InMemoryEntityStore::new());
    store.insert_ingredient(ingredient("flour", "Flour", 1.00));
    store.insert_ingredient(ingredient("salt", "Salt", 0.40));
    store.insert_ingredient(ingredient("basil", "Basil", 22.00));
    store.insert_ingredient(ingredient("saffron", "Saffron", 900.00));

    store.insert_recipe(
        Recipe {
            id: RecipeId::from("pizza-dough"),
            name: "Pizza dough".into(),
            yield_quantity: 10.0,
            yield_unit: Some("portion".into()),
        },
        vec![
            recipe_link("pizza-dough", "flour", 0),
            recipe_link("pizza-dough", "salt", 1),
        ],
    );
    store.insert_recipe(
        Recipe {
            id: RecipeId::from("pesto"),
            name: "Pesto".into(),
            yield_quantity: 4.0,
            yield_unit: None,
        },
        vec![recipe_link("pesto", "basil", 0)],
    );
    store.insert_dish(
        Dish {
            id: DishId::from("margherita-plate"),
            name: "Margherita plate".into(),
        },
        vec![DishIngredient {
            dish_id: DishId::from("margherita-plate"),
            ingredient_id: IngredientId::from("basil"),
            quantity: 0.01,
            unit: Some("kg".into()),
        }],
        vec![DishRecipe {
            dish_id: DishId::from("margherita-plate"),
            recipe_id: RecipeId::from("pizza-dough"),
            quantity: 1.0,
        }],
    );
    store.insert_dish(
        Dish {
            id: DishId::from("side-salad"),
            name: "Side salad".into(),
        },
        vec![DishIngredient {
            dish_id: DishId::from("side-salad"),
            ingredient_id: IngredientId::from("salt"),
            quantity: 0.002,
            unit: Some("kg".into()),
        }],
        Vec::new(),
    );

    store.insert_menu(menu("dinner", false));
    store.insert_menu(menu("lunch-special", true));
    store.insert_menu(menu("brunch", false));

    for row in [
        item("dinner-pizza", "dinner", Some("pizza-dough"), None),
        item("dinner-plate", "dinner", None, Some("margherita-plate")),
        item("lunch-pizza", "lunch-special", Some("pizza-dough"), None),
        item("lunch-salad", "lunch-special", None, Some("side-salad")),
        item("brunch-pesto", "brunch", Some("pesto"), None),
    ] {
        store.insert_menu_item(row).unwrap();
    }
    store
}

fn cascade(
    store: &Arc<InMemoryEntityStore>,
) -> PriceCascade<InMemoryEntityStore, StoreLockOracle<InMemoryEntityStore>> {
    PriceCascade::with_store_locks(Arc::clone(store), &PropagationPolicy::default())
}

fn price(store: &InMemoryEntityStore, id: &str) -> Option<f64> {
    store
        .menu_item(&MenuItemId::from(id))
        .and_then(|item| item.recommended_selling_price)
}

fn flour_notice(before: f64, after: f64) -> ChangeNotice {
    ChangeNotice::new(
        ChangedEntity::Ingredient(IngredientId::from("flour")),
        ChangeType::CostChanged,
    )
    .with_name("Flour")
    .with_details(json!({ "cost_per_unit": { "before": before, "after": after } }))
    .changed_by("chef")
}

#[tokio::test]
async fn flour_price_rise_clears_dinner_and_tracks_lunch_special() {
    let store = kitchen();
    let before = store
        .update_ingredient_cost(&IngredientId::from("flour"), 1.20)
        .unwrap();
    assert_eq!(before, 1.00);

    let summary = cascade(&store)
        .invalidate_menu_items_with_ingredient(
            IngredientId::from("flour"),
            Some("Flour".into()),
            Some(json!({ "cost_per_unit": { "before": 1.00, "after": 1.20 } })),
            Some("chef".into()),
        )
        .await
        .unwrap();

    assert_eq!(summary.affected_items, 3);
    assert_eq!(summary.invalidated_count, 2);
    assert_eq!(summary.tracked_count, 1);
    assert_eq!(summary.locked_skipped, 1);
    assert_eq!(summary.invalidated_menus, menus(&["dinner"]));
    assert_eq!(summary.tracked_menus, menus(&["lunch-special"]));
    assert!(summary.indeterminate_menus.is_empty());

    assert_eq!(price(&store, "dinner-pizza"), None);
    assert_eq!(price(&store, "dinner-plate"), None);
    assert_eq!(price(&store, "lunch-pizza"), Some(10.0));
    assert_eq!(price(&store, "brunch-pesto"), Some(10.0));

    let pending = store
        .pending_change_records(&MenuId::from("lunch-special"))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    let record = &pending[0];
    assert_eq!(record.entity_type, EntityKind::Ingredient);
    assert_eq!(record.entity_id, "flour");
    assert_eq!(record.entity_name, "Flour");
    assert_eq!(record.change_type, ChangeType::CostChanged);
    assert_eq!(
        record.change_details,
        json!({ "cost_per_unit": { "before": 1.00, "after": 1.20 } })
    );
    assert_eq!(record.changed_by.as_deref(), Some("chef"));
}

#[tokio::test]
async fn ingredient_without_dependents_is_a_noop() {
    let store = kitchen();

    let summary = cascade(&store)
        .invalidate_menu_items_with_ingredient(
            IngredientId::from("saffron"),
            Some("Saffron".into()),
            None,
            None,
        )
        .await
        .unwrap();

    assert_eq!(summary.affected_items, 0);
    assert!(summary.is_noop());
    assert!(store.change_records().is_empty());
}

async fn ids(
    resolver: &DependencyResolver<InMemoryEntityStore>,
    entity: ChangedEntity,
) -> Vec<String> {
    resolver
        .resolve(&entity)
        .await
        .unwrap()
        .into_iter()
        .map(|affected| affected.menu_item_id.to_string())
        .collect()
}

#[tokio::test]
async fn resolver_follows_every_fixed_hop() {
    let store = kitchen();
    let resolver = DependencyResolver::new(Arc::clone(&store));

    // salt: recipe, direct dish, and dish embedding the recipe
    assert_eq!(
        ids(&resolver, ChangedEntity::Ingredient(IngredientId::from("salt"))).await,
        vec!["dinner-pizza", "dinner-plate", "lunch-pizza", "lunch-salad"]
    );
    assert_eq!(
        ids(&resolver, ChangedEntity::Ingredient(IngredientId::from("basil"))).await,
        vec!["brunch-pesto", "dinner-plate"]
    );
    assert_eq!(
        ids(&resolver, ChangedEntity::Recipe(RecipeId::from("pizza-dough"))).await,
        vec!["dinner-pizza", "dinner-plate", "lunch-pizza"]
    );
    assert_eq!(
        ids(&resolver, ChangedEntity::Dish(DishId::from("side-salad"))).await,
        vec!["lunch-salad"]
    );
    assert!(ids(&resolver, ChangedEntity::Recipe(RecipeId::from("ghost"))).await.is_empty());
}

#[tokio::test]
async fn each_menu_is_either_invalidated_or_tracked() {
    let store = kitchen();

    let summary = cascade(&store)
        .invalidate_menu_items_with_ingredient(
            IngredientId::from("salt"),
            Some("Salt".into()),
            None,
            None,
        )
        .await
        .unwrap();

    assert!(summary.invalidated_menus.is_disjoint(&summary.tracked_menus));
    assert_eq!(summary.invalidated_menus, menus(&["dinner"]));
    assert_eq!(summary.tracked_menus, menus(&["lunch-special"]));
    assert_eq!(summary.locked_skipped, 2);
    assert_eq!(price(&store, "lunch-salad"), Some(10.0));
    assert!(store
        .pending_change_records(&MenuId::from("dinner"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn repeated_changes_are_idempotent() {
    let store = kitchen();
    let cascade = cascade(&store);

    let first = cascade.propagate(flour_notice(1.00, 1.20)).await.unwrap();
    let second = cascade.propagate(flour_notice(1.20, 1.35)).await.unwrap();

    assert_eq!(first.invalidated_count, second.invalidated_count);
    assert_eq!(price(&store, "dinner-pizza"), None);

    let records = store.change_records();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].change_details,
        json!({ "cost_per_unit": { "before": 1.20, "after": 1.35 } })
    );
    assert!(records[0].updated_at >= records[0].created_at);
}

#[tokio::test]
async fn recipe_and_dish_entry_points_default_their_change_type() {
    let store = kitchen();
    let cascade = cascade(&store);

    cascade
        .invalidate_menu_items_with_recipe(
            RecipeId::from("pizza-dough"),
            Some("Pizza dough".into()),
            None,
            None,
            None,
        )
        .await
        .unwrap();
    cascade
        .invalidate_menu_items_with_dish(
            DishId::from("side-salad"),
            Some("Side salad".into()),
            Some(ChangeType::Other("plating_changed".into())),
            Some(json!({ "garnish": "added" })),
            Some("sous".into()),
        )
        .await
        .unwrap();

    let pending = store
        .pending_change_records(&MenuId::from("lunch-special"))
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
    let by_kind = |kind: EntityKind| pending.iter().find(|r| r.entity_type == kind).unwrap();
    assert_eq!(by_kind(EntityKind::Recipe).change_type, ChangeType::IngredientsChanged);
    assert_eq!(
        by_kind(EntityKind::Dish).change_type,
        ChangeType::Other("plating_changed".into())
    );
    assert_eq!(by_kind(EntityKind::Recipe).change_details, json!({}));
}

#[tokio::test]
async fn unnamed_entity_still_invalidates_but_is_not_tracked() {
    let store = kitchen();

    let summary = cascade(&store)
        .invalidate_menu_items_with_ingredient(IngredientId::from("flour"), None, None, None)
        .await
        .unwrap();

    assert_eq!(summary.invalidated_count, 2);
    assert_eq!(summary.tracked_count, 0);
    assert_eq!(summary.tracking_skipped, Some(TrackSkip::MissingEntityName));
    assert!(store.change_records().is_empty());
}

#[tokio::test]
async fn unreadable_lock_state_defers_instead_of_clearing() {
    let store = kitchen();
    store.inject_menu_fault(StoreOp::ReadMenu, MenuId::from("dinner"));

    let summary = cascade(&store)
        .propagate(flour_notice(1.00, 1.20))
        .await
        .unwrap();

    assert_eq!(summary.indeterminate_menus, menus(&["dinner"]));
    assert_eq!(summary.invalidated_count, 0);
    assert_eq!(summary.tracked_menus, menus(&["dinner", "lunch-special"]));
    assert_eq!(price(&store, "dinner-pizza"), Some(10.0));
}

struct StallingOracle;

#[async_trait]
impl MenuLockOracle for StallingOracle {
    async fn is_menu_locked(&self, menu: &MenuId) -> Result<bool, LockCheckError> {
        if menu.as_str() == "dinner" {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(menu.as_str() == "lunch-special")
    }
}

#[tokio::test(start_paused = true)]
async fn slow_lock_checks_time_out_as_locked() {
    let store = kitchen();
    let policy = PropagationPolicy {
        lock_check_timeout_ms: 100,
        ..PropagationPolicy::default()
    };
    let cascade = PriceCascade::new(Arc::clone(&store), Arc::new(StallingOracle), &policy);

    let summary = cascade.propagate(flour_notice(1.00, 1.20)).await.unwrap();

    assert_eq!(summary.indeterminate_menus, menus(&["dinner"]));
    assert_eq!(summary.invalidated_count, 0);
    assert_eq!(summary.tracked_count, 2);
}

#[tokio::test]
async fn invalidation_failure_still_tracks_locked_menus() {
    let store = kitchen();
    store.inject_fault(StoreOp::ClearPrices);

    let failure = cascade(&store)
        .propagate(flour_notice(1.00, 1.20))
        .await
        .unwrap_err();

    assert_eq!(failure.errors.len(), 1);
    match &failure.errors[0] {
        PropagationError::Invalidate { items, menus: failed, .. } => {
            assert_eq!(*items, 2);
            assert_eq!(failed, &menus(&["dinner"]));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(failure.errors[0].stage(), PropagationStage::Invalidating);
    assert_eq!(failure.summary.invalidated_count, 0);
    assert!(failure.summary.invalidated_menus.is_empty());
    assert_eq!(failure.summary.tracked_menus, menus(&["lunch-special"]));
    assert_eq!(price(&store, "dinner-pizza"), Some(10.0));
    assert_eq!(store.change_records().len(), 1);
}

#[tokio::test]
async fn tracking_failure_is_reported_per_menu() {
    let store = kitchen();
    store.inject_menu_fault(StoreOp::UpsertChangeRecord, MenuId::from("lunch-special"));

    let failure = cascade(&store)
        .propagate(flour_notice(1.00, 1.20))
        .await
        .unwrap_err();

    assert_eq!(failure.summary.invalidated_count, 2);
    assert!(matches!(
        &failure.errors[..],
        [PropagationError::Track { menu_id, .. }] if menu_id.as_str() == "lunch-special"
    ));
}

#[tokio::test]
async fn resolve_failure_touches_nothing() {
    let store = kitchen();
    store.inject_fault(StoreOp::ResolveMenuItems);

    let failure = cascade(&store)
        .propagate(flour_notice(1.00, 1.20))
        .await
        .unwrap_err();

    assert_eq!(failure.errors[0].stage(), PropagationStage::Resolving);
    assert_eq!(failure.summary.affected_items, 0);
    assert_eq!(price(&store, "dinner-pizza"), Some(10.0));
    assert!(store.change_records().is_empty());
}

#[tokio::test]
async fn bulk_recalculation_ignores_locks() {
    let store = kitchen();

    let summary = cascade(&store)
        .invalidate_menu_recommended_prices(&MenuId::from("lunch-special"))
        .await
        .unwrap();

    assert_eq!(
        summary.origin,
        PropagationOrigin::Menu {
            menu_id: MenuId::from("lunch-special")
        }
    );
    assert_eq!(summary.invalidated_count, 2);
    assert_eq!(price(&store, "lunch-pizza"), None);
    assert_eq!(price(&store, "lunch-salad"), None);
    assert_eq!(price(&store, "dinner-pizza"), Some(10.0));
    assert!(store.change_records().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn spawned_propagation_can_be_awaited() {
    let store = kitchen();
    let cascade = Arc::new(cascade(&store));

    let handles: Vec<_> = (0..8u8)
        .map(|n| cascade.spawn(flour_notice(1.00, 1.00 + f64::from(n) / 100.0)))
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(price(&store, "dinner-plate"), None);
    let pending = store
        .pending_change_records(&MenuId::from("lunch-special"))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn reconciliation_opens_a_fresh_record_for_the_next_change() {
    let store = kitchen();
    let cascade = cascade(&store);
    let reconciler = Reconciler::new(Arc::clone(&store));
    let lunch = MenuId::from("lunch-special");

    cascade.propagate(flour_notice(1.00, 1.20)).await.unwrap();
    cascade.propagate(flour_notice(1.20, 1.30)).await.unwrap();
    assert_eq!(reconciler.pending(&lunch).await.unwrap().len(), 1);

    let summary = reconciler.reconcile(&lunch, "manager").await.unwrap();
    assert_eq!(summary.records, 1);
    assert_eq!(summary.prices_cleared, 2);
    assert_eq!(price(&store, "lunch-pizza"), None);

    cascade.propagate(flour_notice(1.30, 1.25)).await.unwrap();
    let records = store.change_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records.iter().filter(|r| r.is_pending()).count(), 1);
    let closed = records.iter().find(|r| !r.is_pending()).unwrap();
    assert_eq!(closed.reconciled_by.as_deref(), Some("manager"));

    reconciler.unlock_menu(&lunch).await.unwrap();
    let summary = cascade.propagate(flour_notice(1.25, 1.10)).await.unwrap();
    assert_eq!(summary.tracked_count, 0);
    assert_eq!(summary.tracking_skipped, Some(TrackSkip::NoLockedMenus));
    assert_eq!(summary.invalidated_menus, menus(&["dinner", "lunch-special"]));
}
