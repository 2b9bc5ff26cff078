use clap::Subcommand;

use super::lock::{LockArgs, UnlockArgs};
use super::propagate::PropagateArgs;
use super::recalculate::RecalculateArgs;
use super::records::{PendingArgs, ReconcileArgs};
use super::resolve::ResolveArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// List menu items whose price depends on an entity
    Resolve(ResolveArgs),

    /// Propagate a change: clear prices on unlocked menus, track it on locked ones
    Propagate(PropagateArgs),

    /// Clear every cached price on one menu, locked or not
    Recalculate(RecalculateArgs),

    /// List unreconciled changes recorded against a menu
    Pending(PendingArgs),

    /// Close pending changes on a menu and clear its prices
    Reconcile(ReconcileArgs),

    /// Freeze a menu's prices
    Lock(LockArgs),

    /// Unfreeze a menu's prices
    Unlock(UnlockArgs),

    /// Show build, configuration and counter information
    Info,
}
