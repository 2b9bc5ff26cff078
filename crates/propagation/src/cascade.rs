use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use costline_core_types::{ChangeType, ChangedEntity, DishId, IngredientId, MenuId, MenuItemId, RecipeId};
use costline_entity_store::EntityStore;

use crate::config::PropagationPolicy;
use crate::errors::{PropagationError, PropagationStage};
use crate::invalidator::PriceInvalidator;
use crate::lock::{MenuLockOracle, StoreLockOracle};
use crate::metrics;
use crate::model::{
    ChangeNotice, PropagationFailure, PropagationOrigin, PropagationOutcome, PropagationSummary,
};
use crate::partition::LockPartitioner;
use crate::resolver::DependencyResolver;
use crate::tracker::ChangeTracker;

/// Entry points mutation handlers call after writing a cost-bearing entity.
///
/// Every entity change runs the same pipeline:
/// resolve dependents, partition their menus by lock state, then clear
/// cached prices on unlocked menus while recording the change on locked ones.
pub struct PriceCascade<S, L> {
    store: Arc<S>,
    resolver: DependencyResolver<S>,
    partitioner: LockPartitioner<L>,
    invalidator: PriceInvalidator<S>,
    tracker: ChangeTracker<S>,
}

impl<S> PriceCascade<S, StoreLockOracle<S>>
where
    S: EntityStore + 'static,
{
    /// Uses the store's own `menus.locked` column as the lock predicate.
    pub fn with_store_locks(store: Arc<S>, policy: &PropagationPolicy) -> Self {
        let oracle = Arc::new(StoreLockOracle::new(Arc::clone(&store)));
        Self::new(store, oracle, policy)
    }
}

impl<S, L> PriceCascade<S, L>
where
    S: EntityStore + 'static,
    L: MenuLockOracle + 'static,
{
    pub fn new(store: Arc<S>, oracle: Arc<L>, policy: &PropagationPolicy) -> Self {
        Self {
            resolver: DependencyResolver::new(Arc::clone(&store)),
            partitioner: LockPartitioner::new(
                oracle,
                policy.max_concurrent_lock_checks,
                policy.lock_check_timeout(),
            ),
            invalidator: PriceInvalidator::new(Arc::clone(&store)),
            tracker: ChangeTracker::new(Arc::clone(&store), policy.max_concurrent_track_writes),
            store,
        }
    }

    pub async fn invalidate_menu_items_with_ingredient(
        &self,
        ingredient: IngredientId,
        ingredient_name: Option<String>,
        change_details: Option<Value>,
        changed_by: Option<String>,
    ) -> PropagationOutcome {
        self.propagate(ChangeNotice {
            entity: ChangedEntity::Ingredient(ingredient),
            entity_name: ingredient_name,
            change_type: ChangeType::CostChanged,
            change_details,
            changed_by,
        })
        .await
    }

    pub async fn invalidate_menu_items_with_recipe(
        &self,
        recipe: RecipeId,
        recipe_name: Option<String>,
        change_type: Option<ChangeType>,
        change_details: Option<Value>,
        changed_by: Option<String>,
    ) -> PropagationOutcome {
        self.propagate(ChangeNotice {
            entity: ChangedEntity::Recipe(recipe),
            entity_name: recipe_name,
            change_type: change_type.unwrap_or(ChangeType::IngredientsChanged),
            change_details,
            changed_by,
        })
        .await
    }

    pub async fn invalidate_menu_items_with_dish(
        &self,
        dish: DishId,
        dish_name: Option<String>,
        change_type: Option<ChangeType>,
        change_details: Option<Value>,
        changed_by: Option<String>,
    ) -> PropagationOutcome {
        self.propagate(ChangeNotice {
            entity: ChangedEntity::Dish(dish),
            entity_name: dish_name,
            change_type: change_type.unwrap_or(ChangeType::IngredientsChanged),
            change_details,
            changed_by,
        })
        .await
    }

    /// Clears every cached price on one menu, locked or not. Used by the
    /// explicit "recalculate all" action.
    pub async fn invalidate_menu_recommended_prices(&self, menu: &MenuId) -> PropagationOutcome {
        let origin = PropagationOrigin::Menu {
            menu_id: menu.clone(),
        };
        let span = info_span!("menu_recalculation", menu_id = %menu);
        async move {
            metrics::record_started();
            let origin_label = origin.to_string();
            let mut summary = PropagationSummary::empty(origin);

            let items = match self.store.menu_items_in_menu(menu).await {
                Ok(items) => items,
                Err(source) => {
                    error!(stage = %PropagationStage::Resolving, "loading menu items failed: {source}");
                    return fail(
                        summary,
                        vec![PropagationError::Resolve {
                            origin: origin_label,
                            source,
                        }],
                    );
                }
            };
            summary.affected_items = items.len();
            let ids: Vec<MenuItemId> = items.into_iter().map(|item| item.id).collect();

            match self.invalidator.invalidate(&origin_label, &ids).await {
                Ok(rows) => {
                    metrics::record_invalidated(rows);
                    summary.invalidated_count = rows;
                    if rows > 0 {
                        summary.invalidated_menus.insert(menu.clone());
                    }
                    info!(rows, "menu prices cleared");
                    metrics::record_succeeded();
                    Ok(summary)
                }
                Err(source) => fail(
                    summary,
                    vec![PropagationError::Invalidate {
                        origin: origin_label,
                        items: ids.len(),
                        menus: BTreeSet::from([menu.clone()]),
                        source,
                    }],
                ),
            }
        }
        .instrument(span)
        .await
    }

    /// Runs the full pipeline for one changed entity. Never panics on store
    /// failures; errors come back inside [`PropagationFailure`] with whatever
    /// already succeeded.
    pub async fn propagate(&self, notice: ChangeNotice) -> PropagationOutcome {
        let span = info_span!(
            "propagation",
            entity = %notice.entity,
            change_type = %notice.change_type
        );
        self.run(notice).instrument(span).await
    }

    /// Fire-and-forget variant for request handlers that must not wait.
    pub fn spawn(self: &Arc<Self>, notice: ChangeNotice) -> JoinHandle<PropagationOutcome> {
        let cascade = Arc::clone(self);
        tokio::spawn(async move {
            let entity = notice.entity.clone();
            let outcome = cascade.propagate(notice).await;
            if let Err(failure) = &outcome {
                warn!(entity = %entity, errors = failure.errors.len(), "background propagation incomplete: {failure}");
            }
            outcome
        })
    }

    async fn run(&self, notice: ChangeNotice) -> PropagationOutcome {
        metrics::record_started();
        let origin_label = notice.entity.to_string();
        let mut summary = PropagationSummary::empty(PropagationOrigin::Entity {
            entity: notice.entity.clone(),
        });

        debug!(stage = %PropagationStage::Resolving, "resolving dependents");
        let affected = match self.resolver.resolve(&notice.entity).await {
            Ok(affected) => affected,
            Err(source) => {
                error!(stage = %PropagationStage::Resolving, code = source.code(), "dependency resolution failed: {source}");
                return fail(
                    summary,
                    vec![PropagationError::Resolve {
                        origin: origin_label,
                        source,
                    }],
                );
            }
        };
        summary.affected_items = affected.len();
        if affected.is_empty() {
            debug!(stage = %PropagationStage::Done, "no dependent menu items");
            metrics::record_succeeded();
            return Ok(summary);
        }

        debug!(stage = %PropagationStage::Partitioning, items = affected.len(), "partitioning menus by lock state");
        let partition = self
            .partitioner
            .partition(affected.iter().map(|item| item.menu_id.clone()))
            .await;
        summary.indeterminate_menus = partition.indeterminate.clone();

        let mut unlocked_items = Vec::new();
        let mut unlocked_menus = BTreeSet::new();
        for item in &affected {
            if partition.is_locked(&item.menu_id) {
                summary.locked_skipped += 1;
            } else {
                unlocked_items.push(item.menu_item_id.clone());
                unlocked_menus.insert(item.menu_id.clone());
            }
        }

        debug!(
            stage = %PropagationStage::Invalidating,
            unlocked_items = unlocked_items.len(),
            locked_menus = partition.locked.len(),
            "applying invalidation and tracking"
        );
        let (invalidated, tracked) = tokio::join!(
            self.invalidator.invalidate(&origin_label, &unlocked_items),
            self.tracker.track(&partition.locked, &notice),
        );

        let mut errors = Vec::new();
        match invalidated {
            Ok(rows) => {
                metrics::record_invalidated(rows);
                summary.invalidated_count = rows;
                if rows > 0 {
                    summary.invalidated_menus = unlocked_menus;
                }
            }
            Err(source) => errors.push(PropagationError::Invalidate {
                origin: origin_label.clone(),
                items: unlocked_items.len(),
                menus: unlocked_menus,
                source,
            }),
        }

        metrics::record_tracked(tracked.written());
        summary.tracked_count = tracked.written();
        summary.tracked_menus = tracked.tracked;
        summary.tracking_skipped = tracked.skipped;
        for (menu_id, source) in tracked.failures {
            errors.push(PropagationError::Track {
                origin: origin_label.clone(),
                menu_id,
                source,
            });
        }

        info!(
            stage = %PropagationStage::Done,
            affected = summary.affected_items,
            invalidated = summary.invalidated_count,
            tracked = summary.tracked_count,
            locked_skipped = summary.locked_skipped,
            errors = errors.len(),
            "propagation finished"
        );
        if errors.is_empty() {
            metrics::record_succeeded();
            Ok(summary)
        } else {
            fail(summary, errors)
        }
    }
}

fn fail(summary: PropagationSummary, errors: Vec<PropagationError>) -> PropagationOutcome {
    metrics::record_failed();
    Err(PropagationFailure { summary, errors })
}
