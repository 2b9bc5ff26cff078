use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use costline_core_types::MenuId;

use crate::errors::LockCheckError;
use crate::lock::MenuLockOracle;
use crate::metrics;

/// Lock classification of a set of menus. `locked` and `unlocked` are
/// disjoint and together cover the input; `indeterminate ⊆ locked`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockPartition {
    pub locked: BTreeSet<MenuId>,
    pub unlocked: BTreeSet<MenuId>,
    pub indeterminate: BTreeSet<MenuId>,
}

impl LockPartition {
    pub fn is_locked(&self, menu: &MenuId) -> bool {
        self.locked.contains(menu)
    }
}

pub struct LockPartitioner<L> {
    oracle: Arc<L>,
    max_concurrency: usize,
    timeout: Option<Duration>,
}

impl<L> LockPartitioner<L>
where
    L: MenuLockOracle,
{
    pub fn new(oracle: Arc<L>, max_concurrency: usize, timeout: Option<Duration>) -> Self {
        Self {
            oracle,
            max_concurrency: max_concurrency.max(1),
            timeout,
        }
    }

    /// Checks each distinct menu once, concurrently. Menus whose lock state
    /// cannot be read are classified as locked.
    pub async fn partition<I>(&self, menus: I) -> LockPartition
    where
        I: IntoIterator<Item = MenuId>,
    {
        let distinct: BTreeSet<MenuId> = menus.into_iter().collect();
        let checks: Vec<(MenuId, Result<bool, LockCheckError>)> = stream::iter(distinct)
            .map(|menu| async move {
                let state = self.check(&menu).await;
                (menu, state)
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut partition = LockPartition::default();
        for (menu, state) in checks {
            match state {
                Ok(true) => {
                    partition.locked.insert(menu);
                }
                Ok(false) => {
                    partition.unlocked.insert(menu);
                }
                Err(err) => {
                    warn!(menu_id = %menu, "lock state unknown, treating menu as locked: {err}");
                    metrics::record_lock_fallback();
                    partition.indeterminate.insert(menu.clone());
                    partition.locked.insert(menu);
                }
            }
        }
        partition
    }

    async fn check(&self, menu: &MenuId) -> Result<bool, LockCheckError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.oracle.is_menu_locked(menu))
                .await
                .unwrap_or_else(|_| {
                    Err(LockCheckError::TimedOut {
                        menu: menu.clone(),
                        after_ms: limit.as_millis() as u64,
                    })
                }),
            None => self.oracle.is_menu_locked(menu).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Scripted {
        Locked,
        Unlocked,
        Fails,
        Hangs,
    }

    #[derive(Default)]
    struct ScriptedOracle {
        answers: HashMap<MenuId, Scripted>,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn with(mut self, menu: &str, answer: Scripted) -> Self {
            self.answers.insert(MenuId::from(menu), answer);
            self
        }
    }

    #[async_trait]
    impl MenuLockOracle for ScriptedOracle {
        async fn is_menu_locked(&self, menu: &MenuId) -> Result<bool, LockCheckError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.answers.get(menu).copied() {
                Some(Scripted::Locked) => Ok(true),
                Some(Scripted::Unlocked) => Ok(false),
                Some(Scripted::Fails) | None => Err(LockCheckError::UnknownMenu(menu.clone())),
                Some(Scripted::Hangs) => {
                    futures::future::pending::<()>().await;
                    Ok(false)
                }
            }
        }
    }

    fn ids(values: &[&str]) -> BTreeSet<MenuId> {
        values.iter().map(|v| MenuId::from(*v)).collect()
    }

    #[tokio::test]
    async fn duplicate_menu_ids_are_checked_once() {
        let oracle = Arc::new(
            ScriptedOracle::default()
                .with("dinner", Scripted::Unlocked)
                .with("lunch", Scripted::Locked),
        );
        let partitioner = LockPartitioner::new(Arc::clone(&oracle), 4, None);

        let input = ["dinner", "lunch", "dinner", "dinner", "lunch"]
            .into_iter()
            .map(MenuId::from);
        let partition = partitioner.partition(input).await;

        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
        assert_eq!(partition.unlocked, ids(&["dinner"]));
        assert_eq!(partition.locked, ids(&["lunch"]));
        assert!(partition.indeterminate.is_empty());
    }

    #[tokio::test]
    async fn failing_checks_land_in_locked() {
        let oracle = Arc::new(
            ScriptedOracle::default()
                .with("a", Scripted::Unlocked)
                .with("b", Scripted::Fails),
        );
        let partitioner = LockPartitioner::new(oracle, 1, None);

        let partition = partitioner
            .partition(ids(&["a", "b", "unknown"]))
            .await;

        assert_eq!(partition.unlocked, ids(&["a"]));
        assert_eq!(partition.locked, ids(&["b", "unknown"]));
        assert_eq!(partition.indeterminate, ids(&["b", "unknown"]));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_checks_time_out_as_locked() {
        let oracle = Arc::new(
            ScriptedOracle::default()
                .with("slow", Scripted::Hangs)
                .with("fast", Scripted::Unlocked),
        );
        let partitioner = LockPartitioner::new(oracle, 2, Some(Duration::from_millis(50)));

        let partition = partitioner.partition(ids(&["slow", "fast"])).await;

        assert_eq!(partition.locked, ids(&["slow"]));
        assert_eq!(partition.indeterminate, ids(&["slow"]));
        assert_eq!(partition.unlocked, ids(&["fast"]));
    }

    #[tokio::test]
    async fn partition_is_disjoint_and_complete() {
        let mut oracle = ScriptedOracle::default();
        let mut input = BTreeSet::new();
        for n in 0..40 {
            let name = format!("menu-{n}");
            let answer = match n % 3 {
                0 => Scripted::Locked,
                1 => Scripted::Unlocked,
                _ => Scripted::Fails,
            };
            oracle.answers.insert(MenuId::from(name.as_str()), answer);
            input.insert(MenuId::from(name));
        }
        let partitioner = LockPartitioner::new(Arc::new(oracle), 8, None);

        let partition = partitioner.partition(input.clone()).await;

        assert!(partition.locked.is_disjoint(&partition.unlocked));
        let covered: BTreeSet<MenuId> = partition
            .locked
            .union(&partition.unlocked)
            .cloned()
            .collect();
        assert_eq!(covered, input);
        assert!(partition.indeterminate.is_subset(&partition.locked));
    }
}
