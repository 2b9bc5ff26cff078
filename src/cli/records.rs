use anyhow::Result;
use clap::Args;
use serde::Serialize;

use costline::core_types::MenuId;
use costline::entity_store::ChangeTrackingRecord;
use costline::propagation::ReconcileSummary;

use crate::cli::context::CliContext;
use crate::cli::output::emit;

#[derive(Args, Clone, Debug)]
pub struct PendingArgs {
    /// Menu to inspect
    pub menu_id: String,
}

#[derive(Args, Clone, Debug)]
pub struct ReconcileArgs {
    /// Menu whose pending changes are closed
    pub menu_id: String,

    /// Who reviewed the changes
    #[arg(long)]
    pub by: String,

    /// Save the updated snapshot
    #[arg(long)]
    pub write: bool,
}

pub async fn cmd_pending(args: PendingArgs, ctx: &CliContext) -> Result<()> {
    let session = ctx.open_session()?;
    let menu = MenuId::from(args.menu_id);
    let records = session.reconciler().pending(&menu).await?;

    emit(ctx.output(), &records, |records| {
        if records.is_empty() {
            println!("No pending changes on menu {}", menu);
            return;
        }
        println!("{} pending change(s) on menu {}:", records.len(), menu);
        for record in records {
            print_record(record);
        }
    })
}

fn print_record(record: &ChangeTrackingRecord) {
    println!(
        "  {}:{} \"{}\" {} (updated {}{})",
        record.entity_type,
        record.entity_id,
        record.entity_name,
        record.change_type,
        record.updated_at.format("%Y-%m-%d %H:%M"),
        record
            .changed_by
            .as_deref()
            .map(|who| format!(" by {who}"))
            .unwrap_or_default()
    );
    if !record.change_details.is_null() {
        println!("    {}", record.change_details);
    }
}

#[derive(Serialize)]
struct ReconcileReport {
    menu_id: MenuId,
    #[serde(flatten)]
    summary: ReconcileSummary,
    saved: bool,
}

pub async fn cmd_reconcile(args: ReconcileArgs, ctx: &CliContext) -> Result<()> {
    let session = ctx.open_session()?;
    let menu = MenuId::from(args.menu_id);
    let summary = session.reconciler().reconcile(&menu, &args.by).await?;
    let saved = ctx.finish(&session, args.write)?;

    let report = ReconcileReport {
        menu_id: menu,
        summary,
        saved,
    };
    emit(ctx.output(), &report, |report| {
        println!(
            "Reconciled {} change(s) on menu {}; {} price(s) cleared for recompute",
            report.summary.records, report.menu_id, report.summary.prices_cleared
        );
        if !report.saved {
            println!("(dry run, pass --write to save)");
        }
    })
}
