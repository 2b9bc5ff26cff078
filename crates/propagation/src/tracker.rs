use std::collections::BTreeSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error};

use costline_core_types::MenuId;
use costline_entity_store::{ChangeRecordDraft, EntityStore, StoreError};

use crate::model::{ChangeNotice, TrackSkip};

#[derive(Clone, Debug, Default)]
pub struct TrackOutcome {
    pub tracked: BTreeSet<MenuId>,
    pub created: usize,
    pub merged: usize,
    pub failures: Vec<(MenuId, StoreError)>,
    pub skipped: Option<TrackSkip>,
}

impl TrackOutcome {
    fn skipped(reason: TrackSkip) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }

    pub fn written(&self) -> usize {
        self.created + self.merged
    }
}

/// Records unreconciled changes against locked menus instead of touching prices.
pub struct ChangeTracker<S> {
    store: Arc<S>,
    max_concurrency: usize,
}

impl<S> ChangeTracker<S>
where
    S: EntityStore,
{
    pub fn new(store: Arc<S>, max_concurrency: usize) -> Self {
        Self {
            store,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Upserts one record per locked menu on (menu_id, entity_type, entity_id).
    /// Each menu is written independently; failures are collected, not retried.
    pub async fn track(&self, locked: &BTreeSet<MenuId>, notice: &ChangeNotice) -> TrackOutcome {
        if locked.is_empty() {
            return TrackOutcome::skipped(TrackSkip::NoLockedMenus);
        }
        let Some(entity_name) = notice.display_name() else {
            debug!(entity = %notice.entity, "no display name, change not tracked");
            return TrackOutcome::skipped(TrackSkip::MissingEntityName);
        };

        let details = notice.details_or_empty();
        let writes: Vec<(MenuId, Result<bool, StoreError>)> = stream::iter(locked.iter().cloned())
            .map(|menu_id| {
                let draft = ChangeRecordDraft {
                    menu_id: menu_id.clone(),
                    entity_type: notice.entity.kind(),
                    entity_id: notice.entity.id().to_string(),
                    entity_name: entity_name.to_string(),
                    change_type: notice.change_type.clone(),
                    change_details: details.clone(),
                    changed_by: notice.changed_by.clone(),
                };
                async move {
                    let result = self
                        .store
                        .upsert_change_record(draft)
                        .await
                        .map(|outcome| outcome.created);
                    (menu_id, result)
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut outcome = TrackOutcome::default();
        for (menu_id, result) in writes {
            match result {
                Ok(created) => {
                    if created {
                        outcome.created += 1;
                    } else {
                        outcome.merged += 1;
                    }
                    outcome.tracked.insert(menu_id);
                }
                Err(err) => {
                    error!(
                        entity = %notice.entity,
                        menu_id = %menu_id,
                        code = err.code(),
                        "change tracking failed: {err}"
                    );
                    outcome.failures.push((menu_id, err));
                }
            }
        }
        outcome
    }
}
