use std::fmt;

use costline_core_types::MenuId;
use parking_lot::RwLock;

use crate::errors::StoreError;

/// Store operations that can be made to fail on purpose.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StoreOp {
    ResolveRecipes,
    ResolveDishes,
    ResolveMenuItems,
    ClearPrices,
    ReadMenu,
    WriteMenu,
    UpsertChangeRecord,
    ReadChangeRecords,
    ReconcileChangeRecords,
}

impl StoreOp {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreOp::ResolveRecipes => "resolve_recipes",
            StoreOp::ResolveDishes => "resolve_dishes",
            StoreOp::ResolveMenuItems => "resolve_menu_items",
            StoreOp::ClearPrices => "clear_prices",
            StoreOp::ReadMenu => "read_menu",
            StoreOp::WriteMenu => "write_menu",
            StoreOp::UpsertChangeRecord => "upsert_change_record",
            StoreOp::ReadChangeRecords => "read_change_records",
            StoreOp::ReconcileChangeRecords => "reconcile_change_records",
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
struct Fault {
    op: StoreOp,
    menu: Option<MenuId>,
}

/// Injected failures, checked at the start of each in-memory operation.
#[derive(Debug, Default)]
pub(crate) struct FaultPlan {
    faults: RwLock<Vec<Fault>>,
}

impl FaultPlan {
    pub(crate) fn add(&self, op: StoreOp, menu: Option<MenuId>) {
        self.faults.write().push(Fault { op, menu });
    }

    pub(crate) fn clear(&self) {
        self.faults.write().clear();
    }

    /// Fails when a fault matches `op` and either targets every menu or `menu`.
    pub(crate) fn check(&self, op: StoreOp, menu: Option<&MenuId>) -> Result<(), StoreError> {
        let faults = self.faults.read();
        let hit = faults.iter().any(|fault| {
            fault.op == op
                && match (&fault.menu, menu) {
                    (None, _) => true,
                    (Some(expected), Some(actual)) => expected == actual,
                    (Some(_), None) => false,
                }
        });
        if hit {
            return Err(StoreError::unavailable(format!("injected fault on {op}")));
        }
        Ok(())
    }
}
