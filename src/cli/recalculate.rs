use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use costline::core_types::MenuId;
use costline::propagation::PropagationSummary;

use crate::cli::context::CliContext;
use crate::cli::output::emit;

#[derive(Args, Clone, Debug)]
pub struct RecalculateArgs {
    /// Menu whose cached prices are cleared
    pub menu_id: String,

    /// Save the updated snapshot
    #[arg(long)]
    pub write: bool,
}

#[derive(Serialize)]
struct RecalculateReport {
    summary: PropagationSummary,
    errors: Vec<String>,
    saved: bool,
}

pub async fn cmd_recalculate(args: RecalculateArgs, ctx: &CliContext) -> Result<()> {
    let session = ctx.open_session()?;
    let menu = MenuId::from(args.menu_id);

    let outcome = session
        .cascade()
        .invalidate_menu_recommended_prices(&menu)
        .await;
    let saved = ctx.finish(&session, args.write)?;
    let (summary, errors) = match outcome {
        Ok(summary) => (summary, Vec::new()),
        Err(failure) => (
            failure.summary,
            failure.errors.iter().map(ToString::to_string).collect(),
        ),
    };

    let report = RecalculateReport {
        summary,
        errors,
        saved,
    };
    emit(ctx.output(), &report, |report| {
        println!(
            "Cleared {} of {} cached price(s) on menu {}",
            report.summary.invalidated_count, report.summary.affected_items, menu
        );
        for error in &report.errors {
            println!("  error: {}", error);
        }
        if !report.saved {
            println!("(dry run, pass --write to save)");
        }
    })?;

    if !report.errors.is_empty() {
        bail!("recalculation of menu {} failed", menu);
    }
    Ok(())
}
