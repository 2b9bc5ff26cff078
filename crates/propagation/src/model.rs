use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use costline_core_types::{ChangeType, ChangedEntity, MenuId, MenuItemId};

use crate::errors::PropagationError;

/// A menu item reached from a changed entity, tagged with its owning menu.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AffectedItem {
    pub menu_item_id: MenuItemId,
    pub menu_id: MenuId,
}

/// What a mutation handler reports after writing a cost-bearing entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotice {
    pub entity: ChangedEntity,
    #[serde(default)]
    pub entity_name: Option<String>,
    pub change_type: ChangeType,
    #[serde(default)]
    pub change_details: Option<Value>,
    #[serde(default)]
    pub changed_by: Option<String>,
}

impl ChangeNotice {
    pub fn new(entity: ChangedEntity, change_type: ChangeType) -> Self {
        Self {
            entity,
            entity_name: None,
            change_type,
            change_details: None,
            changed_by: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.entity_name = Some(name.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.change_details = Some(details);
        self
    }

    pub fn changed_by(mut self, who: impl Into<String>) -> Self {
        self.changed_by = Some(who.into());
        self
    }

    /// Display name usable in a change record; blank names count as absent.
    pub fn display_name(&self) -> Option<&str> {
        self.entity_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn details_or_empty(&self) -> Value {
        self.change_details
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

/// Where a propagation call started.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum PropagationOrigin {
    Entity { entity: ChangedEntity },
    Menu { menu_id: MenuId },
}

impl fmt::Display for PropagationOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropagationOrigin::Entity { entity } => write!(f, "{entity}"),
            PropagationOrigin::Menu { menu_id } => write!(f, "menu:{menu_id}"),
        }
    }
}

/// Why the tracker wrote nothing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSkip {
    NoLockedMenus,
    MissingEntityName,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropagationSummary {
    pub origin: PropagationOrigin,
    pub affected_items: usize,
    pub invalidated_count: usize,
    pub tracked_count: usize,
    /// Affected items on locked menus whose cached price was left alone.
    pub locked_skipped: usize,
    pub invalidated_menus: BTreeSet<MenuId>,
    pub tracked_menus: BTreeSet<MenuId>,
    /// Menus whose lock state could not be read and were treated as locked.
    pub indeterminate_menus: BTreeSet<MenuId>,
    #[serde(default)]
    pub tracking_skipped: Option<TrackSkip>,
}

impl PropagationSummary {
    pub fn empty(origin: PropagationOrigin) -> Self {
        Self {
            origin,
            affected_items: 0,
            invalidated_count: 0,
            tracked_count: 0,
            locked_skipped: 0,
            invalidated_menus: BTreeSet::new(),
            tracked_menus: BTreeSet::new(),
            indeterminate_menus: BTreeSet::new(),
            tracking_skipped: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.invalidated_count == 0 && self.tracked_count == 0
    }
}

/// Partial result of a propagation call that hit at least one error.
#[derive(Clone, Debug, Error)]
#[error("propagation from {} finished with {} error(s)", .summary.origin, .errors.len())]
pub struct PropagationFailure {
    pub summary: PropagationSummary,
    pub errors: Vec<PropagationError>,
}

pub type PropagationOutcome = Result<PropagationSummary, PropagationFailure>;
