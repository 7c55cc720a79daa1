use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::conditions::Conditions;
use super::regex_guard::RegexSafetyProbe;
use crate::catalog::{Category, FieldCatalog, ModelField, Scope};
use crate::error::{Result, SearchError};

/// Conditions on the fields of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilters {
    pub category: Category,
    pub fields: BTreeMap<ModelField, Conditions>,
}

impl FieldFilters {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            fields: BTreeMap::new(),
        }
    }

    pub fn from_json(
        category: Category,
        value: &Value,
        catalog: &FieldCatalog,
        path: &str,
    ) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| SearchError::invalid(path, "expected an object of field conditions"))?;
        let mut filters = Self::new(category);
        for (name, raw) in map {
            let field_path = format!("{path}.{name}");
            let field = catalog.resolve_at(category, name, &field_path)?;
            let conditions = Conditions::from_json(raw, &field_path)?
                .coerce_to(field.field_type(), &field_path)?;
            if filters.fields.insert(field, conditions).is_some() {
                return Err(SearchError::invalid(
                    field_path,
                    format!("{} is filtered more than once", field.qualified_name()),
                ));
            }
        }
        Ok(filters)
    }

    pub fn validate(&self, probe: &dyn RegexSafetyProbe, path: &str) -> Result<()> {
        for (field, conditions) in &self.fields {
            let field_path = format!("{path}.{}", field.name());
            if field.category() != self.category {
                return Err(SearchError::FieldNotSupported {
                    path: field_path,
                    category: self.category,
                    field: field.qualified_name(),
                });
            }
            conditions.check_types(field.field_type(), &field_path)?;
            conditions.validate(&field_path, probe)?;
        }
        Ok(())
    }
}

impl Serialize for FieldFilters {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, conditions) in &self.fields {
            map.serialize_entry(field.name(), conditions)?;
        }
        map.end()
    }
}

/// Field filters keyed by category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiltersSchema {
    pub categories: BTreeMap<Category, FieldFilters>,
}

impl FiltersSchema {
    pub fn from_json(value: &Value, catalog: &FieldCatalog, path: &str) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| SearchError::invalid(path, "expected an object keyed by category"))?;
        let mut schema = Self::default();
        for (key, raw) in map {
            let cat_path = format!("{path}.{key}");
            let category = Category::parse(key)
                .ok_or_else(|| SearchError::invalid(&cat_path, "unknown category"))?;
            if raw.is_null() {
                continue;
            }
            let filters = FieldFilters::from_json(category, raw, catalog, &cat_path)?;
            if schema.categories.insert(category, filters).is_some() {
                return Err(SearchError::invalid(cat_path, "category given more than once"));
            }
        }
        Ok(schema)
    }

    pub fn validate(
        &self,
        scope: Scope,
        catalog: &FieldCatalog,
        probe: &dyn RegexSafetyProbe,
        path: &str,
    ) -> Result<()> {
        for (category, filters) in &self.categories {
            let cat_path = format!("{path}.{category}");
            catalog.ensure_in_scope(scope, *category, &cat_path)?;
            if filters.category != *category {
                return Err(SearchError::invalid(cat_path, "filters filed under the wrong category"));
            }
            filters.validate(probe, &cat_path)?;
        }
        Ok(())
    }

    /// Every `(field, conditions)` pair, category order then field order.
    pub fn iter(&self) -> impl Iterator<Item = (ModelField, &Conditions)> {
        self.categories
            .values()
            .flat_map(|f| f.fields.iter().map(|(field, c)| (*field, c)))
    }
}

impl Serialize for FiltersSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for (category, filters) in &self.categories {
            map.serialize_entry(category.as_str(), filters)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::regex_guard::StaticProbe;
    use crate::model::value::ConditionValue;
    use serde_json::json;

    #[test]
    fn parses_and_coerces_per_field_type() {
        let c = FieldCatalog::new();
        let f = FiltersSchema::from_json(
            &json!({
                "item": {"rating": {"gt": 4}, "mode": "osu"},
                "item_set": {"submitted_date": {"gte": "2023-01-01"}}
            }),
            &c,
            "filters",
        )
        .unwrap();
        let item = &f.categories[&Category::Item];
        assert_eq!(
            item.fields[&ModelField::ItemDifficultyRating].gt,
            Some(ConditionValue::Float(4.0))
        );
        let set = &f.categories[&Category::ItemSet];
        assert!(matches!(
            set.fields[&ModelField::ItemSetSubmittedDate].gte,
            Some(ConditionValue::Timestamp(_))
        ));
        assert!(f.validate(Scope::ItemSets, &c, &StaticProbe, "filters").is_ok());
    }

    #[test]
    fn type_mismatch_reports_operator_path() {
        let c = FieldCatalog::new();
        let err = FiltersSchema::from_json(&json!({"queue": {"is_open": {"eq": "yes"}}}), &c, "filters")
            .unwrap_err();
        assert!(matches!(err, SearchError::TypeMismatch { .. }));
        assert_eq!(err.path(), Some("filters.queue.is_open.eq"));
    }

    #[test]
    fn alias_and_canonical_name_collide() {
        let c = FieldCatalog::new();
        let err = FiltersSchema::from_json(
            &json!({"item": {"rating": 5.0, "difficulty_rating": 6.0}}),
            &c,
            "filters",
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn out_of_scope_category_rejected() {
        let c = FieldCatalog::new();
        let f = FiltersSchema::from_json(&json!({"request": {"status": "pending"}}), &c, "filters")
            .unwrap();
        let err = f.validate(Scope::ItemSets, &c, &StaticProbe, "filters").unwrap_err();
        assert!(matches!(err, SearchError::CategoryNotInScope { .. }));
        assert!(f.validate(Scope::Queues, &c, &StaticProbe, "filters").is_ok());
    }

    #[test]
    fn null_category_is_absent() {
        let c = FieldCatalog::new();
        let f = FiltersSchema::from_json(&json!({"item": null}), &c, "filters").unwrap();
        assert!(f.categories.is_empty());
        assert!(FiltersSchema::from_json(&json!({"user": {}}), &c, "filters").is_err());
    }
}
