use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use costline::core_types::{ChangeType, ChangedEntity, DishId, IngredientId, RecipeId};
use costline::propagation::{ChangeNotice, PropagationOutcome, PropagationSummary};

use super::resolve::EntityKindOpt;
use crate::cli::context::CliContext;
use crate::cli::output::emit;

#[derive(Args, Clone, Debug)]
pub struct PropagateArgs {
    /// Kind of the changed entity
    #[arg(value_enum)]
    pub kind: EntityKindOpt,

    /// Entity id
    pub id: String,

    /// Display name recorded on locked menus (defaults to the stored name)
    #[arg(long)]
    pub name: Option<String>,

    /// Change tag, e.g. cost_changed, yield_changed or any custom tag
    #[arg(long)]
    pub change_type: Option<String>,

    /// JSON payload stored with the change record
    #[arg(long, value_name = "JSON")]
    pub details: Option<String>,

    /// Who made the change
    #[arg(long)]
    pub changed_by: Option<String>,

    /// Write a new cost_per_unit on the ingredient before propagating
    #[arg(long, value_name = "COST")]
    pub set_cost: Option<f64>,

    /// Save the updated snapshot
    #[arg(long)]
    pub write: bool,
}

#[derive(Serialize)]
struct PropagateReport {
    summary: PropagationSummary,
    errors: Vec<String>,
    saved: bool,
}

pub async fn cmd_propagate(args: PropagateArgs, ctx: &CliContext) -> Result<()> {
    let session = ctx.open_session()?;
    let entity = ChangedEntity::from_parts(args.kind.into(), args.id.clone());

    let mut details = args
        .details
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("--details must be valid JSON")?;

    if let Some(cost) = args.set_cost {
        let ChangedEntity::Ingredient(ingredient) = &entity else {
            bail!("--set-cost only applies to ingredients");
        };
        let before = session.store().update_ingredient_cost(ingredient, cost)?;
        info!(ingredient = %ingredient, before, after = cost, "Updated ingredient cost");
        if details.is_none() {
            details = Some(json!({ "cost_per_unit": { "before": before, "after": cost } }));
        }
    }

    let name = args
        .name
        .clone()
        .or_else(|| session.store().entity_name(&entity));
    let change_type = args.change_type.clone().map(ChangeType::from);
    let cascade = session.cascade();

    let outcome: PropagationOutcome = match args.kind {
        EntityKindOpt::Ingredient => match change_type {
            None => {
                cascade
                    .invalidate_menu_items_with_ingredient(
                        IngredientId::from(args.id.clone()),
                        name,
                        details,
                        args.changed_by.clone(),
                    )
                    .await
            }
            Some(change_type) => {
                cascade
                    .propagate(ChangeNotice {
                        entity,
                        entity_name: name,
                        change_type,
                        change_details: details,
                        changed_by: args.changed_by.clone(),
                    })
                    .await
            }
        },
        EntityKindOpt::Recipe => {
            cascade
                .invalidate_menu_items_with_recipe(
                    RecipeId::from(args.id.clone()),
                    name,
                    change_type,
                    details,
                    args.changed_by.clone(),
                )
                .await
        }
        EntityKindOpt::Dish => {
            cascade
                .invalidate_menu_items_with_dish(
                    DishId::from(args.id.clone()),
                    name,
                    change_type,
                    details,
                    args.changed_by.clone(),
                )
                .await
        }
    };

    // Partial effects are real; save them even when some step failed.
    let saved = ctx.finish(&session, args.write)?;
    let (summary, errors) = match outcome {
        Ok(summary) => (summary, Vec::new()),
        Err(failure) => (
            failure.summary,
            failure.errors.iter().map(ToString::to_string).collect(),
        ),
    };
    let failed = !errors.is_empty();

    let report = PropagateReport {
        summary,
        errors,
        saved,
    };
    emit(ctx.output(), &report, print_report)?;

    if failed {
        bail!("propagation finished with {} error(s)", report.errors.len());
    }
    Ok(())
}

fn print_report(report: &PropagateReport) {
    let summary = &report.summary;
    println!("Propagated {}", summary.origin);
    println!("  affected items:    {}", summary.affected_items);
    println!(
        "  prices cleared:    {} on {}",
        summary.invalidated_count,
        join(&summary.invalidated_menus)
    );
    println!(
        "  changes tracked:   {} on {}",
        summary.tracked_count,
        join(&summary.tracked_menus)
    );
    println!("  left on locked:    {}", summary.locked_skipped);
    if !summary.indeterminate_menus.is_empty() {
        println!(
            "  lock unknown:      {} (treated as locked)",
            join(&summary.indeterminate_menus)
        );
    }
    if let Some(skip) = summary.tracking_skipped {
        println!("  tracking skipped:  {:?}", skip);
    }
    for error in &report.errors {
        println!("  error: {}", error);
    }
    if !report.saved {
        println!("(dry run, pass --write to save)");
    }
}

pub(crate) fn join<T: std::fmt::Display>(values: impl IntoIterator<Item = T>) -> String {
    let parts: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}
