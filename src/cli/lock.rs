use anyhow::Result;
use clap::Args;
use serde::Serialize;

use costline::core_types::MenuId;
use costline::entity_store::Menu;

use crate::cli::context::CliContext;
use crate::cli::output::emit;

#[derive(Args, Clone, Debug)]
pub struct LockArgs {
    /// Menu to freeze
    pub menu_id: String,

    /// Who locked the menu
    #[arg(long)]
    pub by: String,

    /// Save the updated snapshot
    #[arg(long)]
    pub write: bool,
}

#[derive(Args, Clone, Debug)]
pub struct UnlockArgs {
    /// Menu to unfreeze
    pub menu_id: String,

    /// Save the updated snapshot
    #[arg(long)]
    pub write: bool,
}

#[derive(Serialize)]
struct LockReport {
    menu: Menu,
    pending_changes: usize,
    saved: bool,
}

pub async fn cmd_lock(args: LockArgs, ctx: &CliContext) -> Result<()> {
    let session = ctx.open_session()?;
    let menu = MenuId::from(args.menu_id);
    let row = session.reconciler().lock_menu(&menu, &args.by).await?;
    report(ctx, &session, row, args.write).await
}

pub async fn cmd_unlock(args: UnlockArgs, ctx: &CliContext) -> Result<()> {
    let session = ctx.open_session()?;
    let menu = MenuId::from(args.menu_id);
    let row = session.reconciler().unlock_menu(&menu).await?;
    report(ctx, &session, row, args.write).await
}

async fn report(
    ctx: &CliContext,
    session: &costline::StoreSession,
    menu: Menu,
    write: bool,
) -> Result<()> {
    let pending_changes = session.reconciler().pending(&menu.id).await?.len();
    let saved = ctx.finish(session, write)?;
    let report = LockReport {
        menu,
        pending_changes,
        saved,
    };
    emit(ctx.output(), &report, |report| {
        let state = if report.menu.locked { "locked" } else { "unlocked" };
        match &report.menu.locked_by {
            Some(by) => println!("Menu {} {} by {}", report.menu.id, state, by),
            None => println!("Menu {} {}", report.menu.id, state),
        }
        if report.pending_changes > 0 {
            println!(
                "  {} pending change(s) still need reconciling",
                report.pending_changes
            );
        }
        if !report.saved {
            println!("(dry run, pass --write to save)");
        }
    })
}
