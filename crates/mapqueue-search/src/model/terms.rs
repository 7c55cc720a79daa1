use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::catalog::{Category, FieldCatalog, ModelField, Scope, SEARCHABLE_FIELDS};
use crate::error::{Result, SearchError};

pub const MAX_TERM_LEN: usize = 255;

// ── PatternKind ────────────────────────────────────────────────

/// How a term may match a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Exact,
    Prefix,
    Suffix,
    Substring,
}

impl PatternKind {
    pub const ALL: [PatternKind; 4] = [
        PatternKind::Exact,
        PatternKind::Prefix,
        PatternKind::Suffix,
        PatternKind::Substring,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Prefix => "prefix",
            Self::Suffix => "suffix",
            Self::Substring => "substring",
        }
    }

    pub fn default_multiplier(self) -> i8 {
        match self {
            Self::Exact => 5,
            Self::Prefix => 4,
            Self::Suffix => 3,
            Self::Substring => 2,
        }
    }

    pub fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// `LIKE` pattern for a term. `%`, `_` and `\` in the term are escaped.
    pub fn like_pattern(self, term: &str) -> String {
        let escaped = escape_like(term);
        match self {
            Self::Exact => escaped,
            Self::Prefix => format!("{escaped}%"),
            Self::Suffix => format!("%{escaped}"),
            Self::Substring => format!("%{escaped}%"),
        }
    }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn weight_from_json(value: &Value, path: &str) -> Result<Option<i8>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .and_then(|i| i8::try_from(i).ok())
            .map(Some)
            .ok_or_else(|| SearchError::invalid(path, "must be an integer between -128 and 127")),
        _ => Err(SearchError::invalid(path, "must be an integer or null")),
    }
}

fn expect_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| SearchError::invalid(path, "expected an object"))
}

// ── PatternMultipliers ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatternMultipliers {
    pub exact: Option<i8>,
    pub prefix: Option<i8>,
    pub suffix: Option<i8>,
    pub substring: Option<i8>,
}

impl Default for PatternMultipliers {
    fn default() -> Self {
        Self {
            exact: Some(PatternKind::Exact.default_multiplier()),
            prefix: Some(PatternKind::Prefix.default_multiplier()),
            suffix: Some(PatternKind::Suffix.default_multiplier()),
            substring: Some(PatternKind::Substring.default_multiplier()),
        }
    }
}

impl PatternMultipliers {
    pub fn get(&self, kind: PatternKind) -> Option<i8> {
        match kind {
            PatternKind::Exact => self.exact,
            PatternKind::Prefix => self.prefix,
            PatternKind::Suffix => self.suffix,
            PatternKind::Substring => self.substring,
        }
    }

    pub fn set(&mut self, kind: PatternKind, value: Option<i8>) {
        let slot = match kind {
            PatternKind::Exact => &mut self.exact,
            PatternKind::Prefix => &mut self.prefix,
            PatternKind::Suffix => &mut self.suffix,
            PatternKind::Substring => &mut self.substring,
        };
        *slot = value;
    }

    /// Kinds that take part in matching, with their multiplier.
    pub fn enabled(&self) -> impl Iterator<Item = (PatternKind, i8)> + '_ {
        PatternKind::ALL
            .into_iter()
            .filter_map(|k| self.get(k).map(|m| (k, m)))
    }

    pub fn from_json(value: &Value, path: &str) -> Result<Self> {
        let mut multipliers = Self::default();
        if value.is_null() {
            for kind in PatternKind::ALL {
                multipliers.set(kind, None);
            }
            return Ok(multipliers);
        }
        for (key, raw) in expect_object(value, path)? {
            let key_path = format!("{path}.{key}");
            let kind = PatternKind::ALL
                .into_iter()
                .find(|k| k.as_str() == key)
                .ok_or_else(|| SearchError::invalid(&key_path, "unknown pattern kind"))?;
            multipliers.set(kind, weight_from_json(raw, &key_path)?);
        }
        Ok(multipliers)
    }

    pub fn validate(&self) -> Result<()> {
        if self.enabled().next().is_none() {
            return Err(SearchError::AllValuesNull {
                origin: "pattern_multipliers",
            });
        }
        Ok(())
    }
}

// ── FieldWeights ───────────────────────────────────────────────

/// Per-field relevance weights. Every searchable field has an entry; `None`
/// removes the field from matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWeights {
    weights: BTreeMap<ModelField, Option<i8>>,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            weights: SEARCHABLE_FIELDS
                .iter()
                .map(|s| (s.field, Some(s.default_weight)))
                .collect(),
        }
    }
}

impl FieldWeights {
    pub fn get(&self, field: ModelField) -> Option<i8> {
        self.weights.get(&field).copied().flatten()
    }

    /// Panics in debug builds if `field` is not searchable.
    pub fn set(&mut self, field: ModelField, weight: Option<i8>) {
        debug_assert!(self.weights.contains_key(&field));
        if let Some(slot) = self.weights.get_mut(&field) {
            *slot = weight;
        }
    }

    pub fn is_default(&self, field: ModelField) -> bool {
        SEARCHABLE_FIELDS
            .iter()
            .find(|s| s.field == field)
            .is_some_and(|s| self.weights.get(&field) == Some(&Some(s.default_weight)))
    }

    /// `(field, weight)` for every field of `category` that takes part in matching.
    pub fn active_in(&self, category: Category) -> impl Iterator<Item = (ModelField, i8)> + '_ {
        SEARCHABLE_FIELDS
            .iter()
            .filter(move |s| s.field.category() == category)
            .filter_map(|s| self.get(s.field).map(|w| (s.field, w)))
    }

    pub fn from_json(value: &Value, catalog: &FieldCatalog, path: &str) -> Result<Self> {
        let mut weights = Self::default();
        for (key, raw) in expect_object(value, path)? {
            let cat_path = format!("{path}.{key}");
            let category = Category::parse(key)
                .ok_or_else(|| SearchError::invalid(&cat_path, "unknown category"))?;
            if raw.is_null() {
                for s in catalog.searchable_in(category) {
                    weights.set(s.field, None);
                }
                continue;
            }
            for (name, w) in expect_object(raw, &cat_path)? {
                let field_path = format!("{cat_path}.{name}");
                let field = catalog.resolve_at(category, name, &field_path)?;
                if !weights.weights.contains_key(&field) {
                    return Err(SearchError::invalid(&field_path, "field is not searchable"));
                }
                weights.set(field, weight_from_json(w, &field_path)?);
            }
        }
        Ok(weights)
    }

    pub fn validate(&self, scope: Scope, catalog: &FieldCatalog, path: &str) -> Result<()> {
        for s in SEARCHABLE_FIELDS {
            let category = s.field.category();
            if !self.is_default(s.field) {
                catalog.ensure_in_scope(scope, category, &format!("{path}.{category}"))?;
            }
        }
        let any_active = catalog
            .categories_for(scope)
            .iter()
            .any(|c| self.active_in(*c).next().is_some());
        if !any_active {
            return Err(SearchError::AllValuesNull {
                origin: "field_weights",
            });
        }
        Ok(())
    }
}

impl Serialize for FieldWeights {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut by_category: BTreeMap<Category, BTreeMap<&'static str, Option<i8>>> =
            BTreeMap::new();
        for (field, weight) in &self.weights {
            by_category
                .entry(field.category())
                .or_default()
                .insert(field.name(), *weight);
        }
        let mut map = serializer.serialize_map(Some(by_category.len()))?;
        for (category, fields) in &by_category {
            map.serialize_entry(category.as_str(), fields)?;
        }
        map.end()
    }
}

// ── SearchTermsSchema ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchTermsSchema {
    pub terms: Vec<String>,
    pub case_sensitive: bool,
    pub pattern_multipliers: PatternMultipliers,
    pub field_weights: FieldWeights,
}

impl SearchTermsSchema {
    pub fn new(terms: Vec<String>) -> Self {
        Self {
            terms,
            case_sensitive: false,
            pattern_multipliers: PatternMultipliers::default(),
            field_weights: FieldWeights::default(),
        }
    }

    /// Accepts a bare string or list (terms only, defaults elsewhere) or the
    /// full object form.
    pub fn from_json(value: &Value, catalog: &FieldCatalog, path: &str) -> Result<Self> {
        let map = match value {
            Value::String(_) | Value::Array(_) => {
                return Ok(Self::new(terms_from_json(value, &format!("{path}.terms"))?))
            }
            other => expect_object(other, path)?,
        };

        let terms_value = map
            .get("terms")
            .ok_or_else(|| SearchError::invalid(format!("{path}.terms"), "terms are required"))?;
        let mut schema = Self::new(terms_from_json(terms_value, &format!("{path}.terms"))?);

        for (key, raw) in map {
            let key_path = format!("{path}.{key}");
            match key.as_str() {
                "terms" => {}
                "case_sensitive" => {
                    schema.case_sensitive = raw
                        .as_bool()
                        .ok_or_else(|| SearchError::invalid(&key_path, "expected a boolean"))?;
                }
                "pattern_multipliers" => {
                    schema.pattern_multipliers = PatternMultipliers::from_json(raw, &key_path)?;
                }
                "field_weights" => {
                    schema.field_weights = FieldWeights::from_json(raw, catalog, &key_path)?;
                }
                _ => return Err(SearchError::invalid(&key_path, "unknown key")),
            }
        }
        Ok(schema)
    }

    pub fn validate(&self, scope: Scope, catalog: &FieldCatalog, path: &str) -> Result<()> {
        check_terms(&self.terms, &format!("{path}.terms"))?;
        self.pattern_multipliers.validate()?;
        self.field_weights
            .validate(scope, catalog, &format!("{path}.field_weights"))
    }
}

fn terms_from_json(value: &Value, path: &str) -> Result<Vec<String>> {
    let raw = match value {
        Value::String(s) => tokenize(s, path)?,
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| SearchError::invalid(format!("{path}[{i}]"), "expected a string"))
            })
            .collect::<Result<Vec<_>>>()?,
        _ => return Err(SearchError::invalid(path, "expected a string or a list of strings")),
    };
    let terms: Vec<String> = raw.into_iter().filter(|t| !t.trim().is_empty()).collect();
    check_terms(&terms, path)?;
    Ok(terms)
}

/// Shell-style split: quoted sub-strings stay together.
pub fn tokenize(input: &str, path: &str) -> Result<Vec<String>> {
    shell_words::split(input)
        .map_err(|e| SearchError::invalid(path, format!("cannot split search terms: {e}")))
}

fn check_terms(terms: &[String], path: &str) -> Result<()> {
    if terms.is_empty() {
        return Err(SearchError::invalid(path, "at least one non-empty term is required"));
    }
    for (i, term) in terms.iter().enumerate() {
        if term.trim().is_empty() {
            return Err(SearchError::invalid(format!("{path}[{i}]"), "term is blank"));
        }
        if term.chars().count() > MAX_TERM_LEN {
            return Err(SearchError::invalid(
                format!("{path}[{i}]"),
                format!("term longer than {MAX_TERM_LEN} characters"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> FieldCatalog {
        FieldCatalog::new()
    }

    // ── terms ────────────────────────────────────────────────────

    #[test]
    fn string_terms_are_shell_split() {
        let s = SearchTermsSchema::from_json(&json!("foo \"bar baz\""), &catalog(), "search_terms")
            .unwrap();
        assert_eq!(s.terms, vec!["foo".to_string(), "bar baz".to_string()]);
        assert!(!s.case_sensitive);
    }

    #[test]
    fn blank_terms_dropped_then_required() {
        let s = SearchTermsSchema::from_json(&json!(["a", "  ", ""]), &catalog(), "st").unwrap();
        assert_eq!(s.terms, vec!["a".to_string()]);
        let err = SearchTermsSchema::from_json(&json!(["  "]), &catalog(), "st").unwrap_err();
        assert_eq!(err.path(), Some("st.terms"));
        assert!(SearchTermsSchema::from_json(&json!("   "), &catalog(), "st").is_err());
    }

    #[test]
    fn unbalanced_quotes_rejected() {
        assert!(SearchTermsSchema::from_json(&json!("\"open"), &catalog(), "st").is_err());
    }

    #[test]
    fn overlong_term_rejected() {
        let long = "x".repeat(MAX_TERM_LEN + 1);
        assert!(SearchTermsSchema::from_json(&json!([long]), &catalog(), "st").is_err());
    }

    // ── multipliers ──────────────────────────────────────────────

    #[test]
    fn multipliers_merge_over_defaults() {
        let m = PatternMultipliers::from_json(&json!({"exact": 9, "suffix": null}), "pm").unwrap();
        assert_eq!(m.exact, Some(9));
        assert_eq!(m.prefix, Some(4));
        assert_eq!(m.suffix, None);
        let kinds: Vec<_> = m.enabled().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![PatternKind::Exact, PatternKind::Prefix, PatternKind::Substring]
        );
    }

    #[test]
    fn multipliers_all_null() {
        let m = PatternMultipliers::from_json(&Value::Null, "pm").unwrap();
        let err = m.validate().unwrap_err();
        assert!(matches!(
            err,
            SearchError::AllValuesNull {
                origin: "pattern_multipliers"
            }
        ));
    }

    #[test]
    fn multiplier_range_enforced() {
        assert!(PatternMultipliers::from_json(&json!({"exact": 128}), "pm").is_err());
        assert!(PatternMultipliers::from_json(&json!({"exact": -128}), "pm").is_ok());
        assert!(PatternMultipliers::from_json(&json!({"exact": 1.5}), "pm").is_err());
    }

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(PatternKind::Exact.like_pattern("100%"), "100\\%");
        assert_eq!(PatternKind::Prefix.like_pattern("a_b"), "a\\_b%");
        assert_eq!(PatternKind::Substring.like_pattern("foo"), "%foo%");
        assert_eq!(PatternKind::Suffix.like_pattern("foo"), "%foo");
    }

    // ── weights ──────────────────────────────────────────────────

    #[test]
    fn weight_defaults() {
        let w = FieldWeights::default();
        assert_eq!(w.get(ModelField::ItemSetTitle), Some(5));
        assert_eq!(w.get(ModelField::QueueName), Some(6));
        assert_eq!(w.get(ModelField::RequestComment), Some(0));
        assert_eq!(w.get(ModelField::ItemBpm), None);
    }

    #[test]
    fn null_category_disables_all_fields() {
        let w = FieldWeights::from_json(&json!({"item_set": null}), &catalog(), "fw").unwrap();
        assert_eq!(w.active_in(Category::ItemSet).count(), 0);
        assert_eq!(w.get(ModelField::ItemVersion), Some(2));
    }

    #[test]
    fn weights_accept_aliases_and_reject_unsearchable() {
        let w = FieldWeights::from_json(&json!({"item_set": {"description": 3}}), &catalog(), "fw")
            .unwrap();
        assert_eq!(w.get(ModelField::ItemSetDescription), Some(3));
        let err = FieldWeights::from_json(&json!({"item": {"bpm": 3}}), &catalog(), "fw")
            .unwrap_err();
        assert_eq!(err.path(), Some("fw.item.bpm"));
    }

    #[test]
    fn all_scope_weights_null_is_an_error() {
        let c = catalog();
        let w = FieldWeights::from_json(&json!({"item": null}), &c, "fw").unwrap();
        let err = w.validate(Scope::Items, &c, "fw").unwrap_err();
        assert!(matches!(err, SearchError::AllValuesNull { origin: "field_weights" }));
        assert!(w.validate(Scope::ItemSets, &c, "fw").is_ok());
    }

    #[test]
    fn non_default_weight_outside_scope_rejected() {
        let c = catalog();
        let w = FieldWeights::from_json(&json!({"queue": {"name": 1}}), &c, "fw").unwrap();
        let err = w.validate(Scope::Items, &c, "fw").unwrap_err();
        assert!(matches!(err, SearchError::CategoryNotInScope { .. }));
        assert!(w.validate(Scope::Queues, &c, "fw").is_ok());
    }

    #[test]
    fn serialized_weights_parse_back() {
        let c = catalog();
        let w = FieldWeights::from_json(
            &json!({"item": {"version": -3}, "queue": null}),
            &c,
            "fw",
        )
        .unwrap();
        let back = FieldWeights::from_json(&serde_json::to_value(&w).unwrap(), &c, "fw").unwrap();
        assert_eq!(back, w);
    }
}
