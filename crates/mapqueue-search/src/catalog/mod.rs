//! Registry of searchable categories and their fields.
//!
//! Scopes pick a root entity; categories own a table and an allow-list of
//! fields. The catalog is built once at startup and shared read-only.

mod fields;

use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{Result, SearchError};

pub use fields::{ModelField, SEARCHABLE_FIELDS};
use fields::{DERIVED_TARGETS, FIELD_ALIASES, FIELD_GROUPS};

// ── Scope ──────────────────────────────────────────────────────

/// The root entity a search returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Items,
    ItemSets,
    Queues,
    Requests,
}

impl Scope {
    pub const ALL: [Scope; 4] = [Scope::Items, Scope::ItemSets, Scope::Queues, Scope::Requests];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::ItemSets => "item_sets",
            Self::Queues => "queues",
            Self::Requests => "requests",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "items" | "beatmaps" => Some(Self::Items),
            "item_sets" | "beatmapsets" => Some(Self::ItemSets),
            "queues" => Some(Self::Queues),
            "requests" => Some(Self::Requests),
            _ => None,
        }
    }

    /// Wire identifier.
    pub fn id(self) -> u8 {
        match self {
            Self::Items => 1,
            Self::ItemSets => 2,
            Self::Queues => 3,
            Self::Requests => 4,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    /// The category whose table is the root of this scope.
    pub fn root_category(self) -> Category {
        match self {
            Self::Items => Category::Item,
            Self::ItemSets => Category::ItemSet,
            Self::Queues => Category::Queue,
            Self::Requests => Category::Request,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ── Category ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Profile,
    Item,
    ItemSet,
    Queue,
    Request,
}

impl Category {
    /// Wire order: bit `i` of a category presence mask is `ALL[i]`.
    pub const ALL: [Category; 5] = [
        Category::Profile,
        Category::Item,
        Category::ItemSet,
        Category::Queue,
        Category::Request,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Item => "item",
            Self::ItemSet => "item_set",
            Self::Queue => "queue",
            Self::Request => "request",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "profile" => Some(Self::Profile),
            "item" | "beatmap" => Some(Self::Item),
            "item_set" | "beatmapset" => Some(Self::ItemSet),
            "queue" => Some(Self::Queue),
            "request" => Some(Self::Request),
            _ => None,
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Self::Profile => "profiles",
            Self::Item => "beatmap_snapshots",
            Self::ItemSet => "beatmapset_snapshots",
            Self::Queue => "queues",
            Self::Request => "requests",
        }
    }

    pub fn bit(self) -> u8 {
        match self {
            Self::Profile => 0,
            Self::Item => 1,
            Self::ItemSet => 2,
            Self::Queue => 3,
            Self::Request => 4,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ── Field metadata ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "string",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
        }
    }
}

/// Where a field's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    /// A plain column of the category table.
    Column(&'static str),
    /// A named sub-query in [`DerivedTarget`], joined on the category's id.
    Derived(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub id: u16,
    pub category: Category,
    pub name: &'static str,
    pub ty: FieldType,
    pub target: FieldTarget,
}

#[derive(Debug)]
pub struct DerivedTarget {
    pub name: &'static str,
    pub category: Category,
    pub sql: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchableField {
    pub field: ModelField,
    pub default_weight: i8,
}

impl SearchableField {
    pub const fn new(field: ModelField, default_weight: i8) -> Self {
        Self {
            field,
            default_weight,
        }
    }
}

/// Fields that carry the same information in different forms (romanised and
/// unicode titles). Matches inside one group count once.
#[derive(Debug)]
pub struct FieldGroup {
    pub name: &'static str,
    pub members: &'static [ModelField],
}

impl ModelField {
    pub fn category(self) -> Category {
        self.spec().category
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn field_type(self) -> FieldType {
        self.spec().ty
    }

    /// `category.field`, used in logs and sort keys.
    pub fn qualified_name(self) -> String {
        format!("{}.{}", self.category(), self.name())
    }
}

impl Serialize for ModelField {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

// ── FieldCatalog ───────────────────────────────────────────────

pub struct FieldCatalog {
    by_name: HashMap<(Category, &'static str), ModelField>,
    by_id: HashMap<u16, ModelField>,
    derived: HashMap<&'static str, &'static DerivedTarget>,
}

impl FieldCatalog {
    pub fn new() -> Self {
        let mut by_name = HashMap::new();
        let mut by_id = HashMap::new();
        for &field in ModelField::ALL {
            let spec = field.spec();
            by_name.insert((spec.category, spec.name), field);
            by_id.insert(spec.id, field);
        }
        for &(field, alias) in FIELD_ALIASES {
            by_name.insert((field.category(), alias), field);
        }
        let derived = DERIVED_TARGETS.iter().map(|d| (d.name, d)).collect();

        tracing::debug!(
            fields = by_id.len(),
            names = by_name.len(),
            "field catalog built"
        );

        Self {
            by_name,
            by_id,
            derived,
        }
    }

    pub fn resolve(&self, category: Category, name: &str) -> Option<ModelField> {
        self.by_name.get(&(category, name)).copied()
    }

    /// Resolve a field name or alias, failing with a path-carrying error.
    pub fn resolve_at(&self, category: Category, name: &str, path: &str) -> Result<ModelField> {
        self.resolve(category, name)
            .ok_or_else(|| SearchError::FieldNotSupported {
                path: path.to_string(),
                category,
                field: name.to_string(),
            })
    }

    pub fn categories_for(&self, scope: Scope) -> &'static [Category] {
        match scope {
            Scope::Items => &[Category::Item],
            Scope::ItemSets => &[Category::Profile, Category::Item, Category::ItemSet],
            Scope::Queues | Scope::Requests => &Category::ALL,
        }
    }

    pub fn in_scope(&self, scope: Scope, category: Category) -> bool {
        self.categories_for(scope).contains(&category)
    }

    pub fn ensure_in_scope(&self, scope: Scope, category: Category, path: &str) -> Result<()> {
        if self.in_scope(scope, category) {
            Ok(())
        } else {
            Err(SearchError::CategoryNotInScope {
                path: path.to_string(),
                scope,
                category,
            })
        }
    }

    pub fn id_for(&self, field: ModelField) -> u16 {
        field.spec().id
    }

    pub fn field_for_id(&self, id: u16) -> Option<ModelField> {
        self.by_id.get(&id).copied()
    }

    pub fn searchable_fields(&self) -> &'static [SearchableField] {
        SEARCHABLE_FIELDS
    }

    pub fn searchable_in(&self, category: Category) -> impl Iterator<Item = &'static SearchableField> {
        SEARCHABLE_FIELDS
            .iter()
            .filter(move |s| s.field.category() == category)
    }

    pub fn field_groups(&self, category: Category) -> impl Iterator<Item = &'static FieldGroup> {
        FIELD_GROUPS
            .iter()
            .filter(move |g| g.members.iter().any(|f| f.category() == category))
    }

    pub fn group_of(&self, field: ModelField) -> Option<&'static FieldGroup> {
        FIELD_GROUPS.iter().find(|g| g.members.contains(&field))
    }

    pub fn derived(&self, name: &str) -> Option<&'static DerivedTarget> {
        self.derived.get(name).copied()
    }

    pub fn derived_targets(&self) -> &'static [DerivedTarget] {
        DERIVED_TARGETS
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::new()
    }
}
