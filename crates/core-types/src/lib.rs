use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Shared error type for the Costline crates.
#[derive(Debug, Error, Clone)]
pub enum CostlineError {
    #[error("{message}")]
    Message { message: String },
}

impl CostlineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identity of an `ingredients` row.
    IngredientId
);
string_id!(
    /// Identity of a `recipes` row.
    RecipeId
);
string_id!(
    /// Identity of a `dishes` row.
    DishId
);
string_id!(
    /// Identity of a `menus` row.
    MenuId
);
string_id!(
    /// Identity of a `menu_items` row.
    MenuItemId
);
string_id!(
    /// Identity of a `menu_change_tracking` row.
    ChangeRecordId
);

/// Kind of cost-bearing entity, as persisted in `entity_type` columns.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Ingredient,
    Recipe,
    Dish,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Ingredient => "ingredient",
            EntityKind::Recipe => "recipe",
            EntityKind::Dish => "dish",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = CostlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ingredient" => Ok(EntityKind::Ingredient),
            "recipe" => Ok(EntityKind::Recipe),
            "dish" => Ok(EntityKind::Dish),
            other => Err(CostlineError::new(format!("unknown entity kind: {other}"))),
        }
    }
}

/// A cost-bearing entity whose inputs changed.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ChangedEntity {
    Ingredient(IngredientId),
    Recipe(RecipeId),
    Dish(DishId),
}

impl ChangedEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            ChangedEntity::Ingredient(_) => EntityKind::Ingredient,
            ChangedEntity::Recipe(_) => EntityKind::Recipe,
            ChangedEntity::Dish(_) => EntityKind::Dish,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ChangedEntity::Ingredient(id) => id.as_str(),
            ChangedEntity::Recipe(id) => id.as_str(),
            ChangedEntity::Dish(id) => id.as_str(),
        }
    }

    pub fn from_parts(kind: EntityKind, id: impl Into<String>) -> Self {
        let id = id.into();
        match kind {
            EntityKind::Ingredient => ChangedEntity::Ingredient(IngredientId(id)),
            EntityKind::Recipe => ChangedEntity::Recipe(RecipeId(id)),
            EntityKind::Dish => ChangedEntity::Dish(DishId(id)),
        }
    }
}

impl fmt::Display for ChangedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Tag describing what changed on an entity. Unknown tags are carried verbatim.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeType {
    CostChanged,
    IngredientsChanged,
    YieldChanged,
    PriceChanged,
    Other(String),
}

impl ChangeType {
    pub fn as_str(&self) -> &str {
        match self {
            ChangeType::CostChanged => "cost_changed",
            ChangeType::IngredientsChanged => "ingredients_changed",
            ChangeType::YieldChanged => "yield_changed",
            ChangeType::PriceChanged => "price_changed",
            ChangeType::Other(tag) => tag,
        }
    }
}

impl From<String> for ChangeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "cost_changed" => ChangeType::CostChanged,
            "ingredients_changed" => ChangeType::IngredientsChanged,
            "yield_changed" => ChangeType::YieldChanged,
            "price_changed" => ChangeType::PriceChanged,
            _ => ChangeType::Other(value),
        }
    }
}

impl From<&str> for ChangeType {
    fn from(value: &str) -> Self {
        ChangeType::from(value.to_string())
    }
}

impl From<ChangeType> for String {
    fn from(value: ChangeType) -> Self {
        match value {
            ChangeType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
