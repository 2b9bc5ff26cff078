use super::env::CliArgs;
use super::info::cmd_info;
use super::lock::{cmd_lock, cmd_unlock};
use super::propagate::cmd_propagate;
use super::recalculate::cmd_recalculate;
use super::records::{cmd_pending, cmd_reconcile};
use super::resolve::cmd_resolve;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Resolve(args) => cmd_resolve(args, ctx).await,
        Commands::Propagate(args) => cmd_propagate(args, ctx).await,
        Commands::Recalculate(args) => cmd_recalculate(args, ctx).await,
        Commands::Pending(args) => cmd_pending(args, ctx).await,
        Commands::Reconcile(args) => cmd_reconcile(args, ctx).await,
        Commands::Lock(args) => cmd_lock(args, ctx).await,
        Commands::Unlock(args) => cmd_unlock(args, ctx).await,
        Commands::Info => cmd_info(ctx),
    }
}
