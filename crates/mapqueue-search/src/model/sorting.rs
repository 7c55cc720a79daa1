use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::catalog::{Category, FieldCatalog, ModelField, Scope};
use crate::error::{Result, SearchError};

pub const MAX_SORT_OPTIONS: usize = u8::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortingOrder {
    #[default]
    Asc,
    Desc,
}

impl SortingOrder {
    pub fn id(self) -> u8 {
        match self {
            Self::Asc => 0,
            Self::Desc => 1,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Asc),
            1 => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortingOption {
    pub field: ModelField,
    pub order: SortingOrder,
}

impl Serialize for SortingOption {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SortingOption", 3)?;
        s.serialize_field("category", &self.field.category())?;
        s.serialize_field("field", self.field.name())?;
        s.serialize_field("order", &self.order)?;
        s.end()
    }
}

impl SortingOption {
    /// `{"category": "item_set", "field": "title", "order": "desc"}`, or the
    /// dotted form `{"field": "item_set.title"}`.
    pub fn from_json(value: &Value, catalog: &FieldCatalog, path: &str) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| SearchError::invalid(path, "expected an object"))?;
        if let Some(key) = map
            .keys()
            .find(|k| !matches!(k.as_str(), "category" | "field" | "order"))
        {
            return Err(SearchError::invalid(format!("{path}.{key}"), "unknown key"));
        }

        let field_path = format!("{path}.field");
        let field_name = map
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| SearchError::invalid(&field_path, "field name is required"))?;

        let (category_name, name) = match map.get("category") {
            Some(Value::String(c)) => (c.as_str(), field_name),
            Some(_) => {
                return Err(SearchError::invalid(
                    format!("{path}.category"),
                    "expected a string",
                ))
            }
            None => field_name.split_once('.').ok_or_else(|| {
                SearchError::invalid(&field_path, "expected 'category.field' or a category key")
            })?,
        };
        let category = Category::parse(category_name).ok_or_else(|| {
            SearchError::invalid(format!("{path}.category"), "unknown category")
        })?;
        let field = catalog.resolve_at(category, name, &field_path)?;

        let order = match map.get("order") {
            None | Some(Value::Null) => SortingOrder::default(),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("asc") => SortingOrder::Asc,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("desc") => SortingOrder::Desc,
            Some(_) => {
                return Err(SearchError::invalid(
                    format!("{path}.order"),
                    "order must be 'asc' or 'desc'",
                ))
            }
        };
        Ok(Self { field, order })
    }
}

/// Sort keys in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SortingSchema {
    pub options: Vec<SortingOption>,
}

impl SortingSchema {
    pub fn from_json(value: &Value, catalog: &FieldCatalog, path: &str) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| SearchError::invalid(path, "expected a list of sort options"))?;
        let options = items
            .iter()
            .enumerate()
            .map(|(i, v)| SortingOption::from_json(v, catalog, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { options })
    }

    pub fn validate(&self, scope: Scope, catalog: &FieldCatalog, path: &str) -> Result<()> {
        if self.options.len() > MAX_SORT_OPTIONS {
            return Err(SearchError::invalid(
                path,
                format!("at most {MAX_SORT_OPTIONS} sort options"),
            ));
        }
        for (i, option) in self.options.iter().enumerate() {
            let option_path = format!("{path}[{i}]");
            catalog.ensure_in_scope(scope, option.field.category(), &option_path)?;
            if self.options[..i].iter().any(|o| o.field == option.field) {
                return Err(SearchError::invalid(
                    option_path,
                    format!("duplicate sort field {}", option.field.qualified_name()),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn both_forms_resolve_the_same_field() {
        let c = FieldCatalog::new();
        let a = SortingOption::from_json(
            &json!({"category": "item_set", "field": "title", "order": "desc"}),
            &c,
            "sorting[0]",
        )
        .unwrap();
        let b = SortingOption::from_json(
            &json!({"field": "beatmapset.title", "order": "DESC"}),
            &c,
            "sorting[0]",
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.field, ModelField::ItemSetTitle);
        assert_eq!(a.order, SortingOrder::Desc);
    }

    #[test]
    fn order_defaults_to_asc() {
        let c = FieldCatalog::new();
        let o = SortingOption::from_json(&json!({"field": "item.rating"}), &c, "s").unwrap();
        assert_eq!(o.order, SortingOrder::Asc);
        assert_eq!(o.field, ModelField::ItemDifficultyRating);
    }

    #[test]
    fn bad_order_and_unknown_field() {
        let c = FieldCatalog::new();
        assert!(SortingOption::from_json(&json!({"field": "item.bpm", "order": "up"}), &c, "s").is_err());
        let err = SortingOption::from_json(&json!({"field": "item.colour"}), &c, "s").unwrap_err();
        assert_eq!(err.path(), Some("s.field"));
    }

    #[test]
    fn scope_and_duplicates_checked() {
        let c = FieldCatalog::new();
        let schema = SortingSchema::from_json(
            &json!([{"field": "queue.name"}]),
            &c,
            "sorting",
        )
        .unwrap();
        let err = schema.validate(Scope::Items, &c, "sorting").unwrap_err();
        assert_eq!(err.path(), Some("sorting[0]"));
        assert!(schema.validate(Scope::Requests, &c, "sorting").is_ok());

        let dup = SortingSchema::from_json(
            &json!([{"field": "item.bpm"}, {"field": "item.bpm", "order": "desc"}]),
            &c,
            "sorting",
        )
        .unwrap();
        assert!(dup.validate(Scope::Items, &c, "sorting").is_err());
    }
}
