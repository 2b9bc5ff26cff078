use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::Serialize;

use costline::core_types::{ChangedEntity, EntityKind};
use costline::propagation::{AffectedItem, DependencyResolver};

use crate::cli::context::CliContext;
use crate::cli::output::emit;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum EntityKindOpt {
    Ingredient,
    Recipe,
    Dish,
}

impl From<EntityKindOpt> for EntityKind {
    fn from(value: EntityKindOpt) -> Self {
        match value {
            EntityKindOpt::Ingredient => EntityKind::Ingredient,
            EntityKindOpt::Recipe => EntityKind::Recipe,
            EntityKindOpt::Dish => EntityKind::Dish,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct ResolveArgs {
    /// Kind of the changed entity
    #[arg(value_enum)]
    pub kind: EntityKindOpt,

    /// Entity id
    pub id: String,
}

#[derive(Serialize)]
struct ResolveReport {
    entity: ChangedEntity,
    items: Vec<AffectedItem>,
}

pub async fn cmd_resolve(args: ResolveArgs, ctx: &CliContext) -> Result<()> {
    let session = ctx.open_session()?;
    let entity = ChangedEntity::from_parts(args.kind.into(), args.id);
    let items = DependencyResolver::new(session.store().clone())
        .resolve(&entity)
        .await?;

    let report = ResolveReport { entity, items };
    emit(ctx.output(), &report, |report| {
        if report.items.is_empty() {
            println!("No menu items depend on {}", report.entity);
            return;
        }
        println!("{} menu item(s) depend on {}:", report.items.len(), report.entity);
        for item in &report.items {
            println!("  {}  (menu {})", item.menu_item_id, item.menu_id);
        }
    })
}
