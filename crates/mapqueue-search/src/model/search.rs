use serde::Serialize;
use serde_json::Value;

use super::filters::FiltersSchema;
use super::regex_guard::RegexSafetyProbe;
use super::sorting::SortingSchema;
use super::terms::SearchTermsSchema;
use crate::catalog::{FieldCatalog, Scope};
use crate::codec;
use crate::error::{Result, SearchError};

/// A complete search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchSchema {
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_terms: Option<SearchTermsSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorting: Option<SortingSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<FiltersSchema>,
}

/// Inbound query before parsing.
#[derive(Debug, Clone)]
pub enum RawQuery {
    Json(Value),
    Token(String),
}

/// What parsing and validation need besides the input.
#[derive(Clone, Copy)]
pub struct ParseContext<'a> {
    pub catalog: &'a FieldCatalog,
    pub probe: &'a dyn RegexSafetyProbe,
}

impl<'a> ParseContext<'a> {
    pub fn new(catalog: &'a FieldCatalog, probe: &'a dyn RegexSafetyProbe) -> Self {
        Self { catalog, probe }
    }
}

impl SearchSchema {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            search_terms: None,
            sorting: None,
            filters: None,
        }
    }

    /// Parse and validate a JSON or token query.
    pub fn parse(raw: &RawQuery, ctx: ParseContext<'_>) -> Result<Self> {
        let schema = match raw {
            RawQuery::Json(value) => Self::from_json(value, ctx)?,
            RawQuery::Token(token) => codec::decode_token(token, ctx.catalog)?,
        };
        schema.validate(ctx)?;
        Ok(schema)
    }

    /// Structural parse. Call [`SearchSchema::validate`] before use.
    pub fn from_json(value: &Value, ctx: ParseContext<'_>) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| SearchError::invalid("", "query must be a JSON object"))?;

        let scope_name = map
            .get("scope")
            .and_then(Value::as_str)
            .ok_or_else(|| SearchError::invalid("scope", "scope is required"))?;
        let scope = Scope::parse(scope_name)
            .ok_or_else(|| SearchError::invalid("scope", format!("unknown scope '{scope_name}'")))?;

        let mut schema = Self::new(scope);
        for (key, raw) in map {
            if raw.is_null() {
                continue;
            }
            match key.as_str() {
                "scope" => {}
                "search_terms" => {
                    schema.search_terms =
                        Some(SearchTermsSchema::from_json(raw, ctx.catalog, key)?);
                }
                "sorting" => {
                    schema.sorting = Some(SortingSchema::from_json(raw, ctx.catalog, key)?);
                }
                "filters" => {
                    schema.filters = Some(FiltersSchema::from_json(raw, ctx.catalog, key)?);
                }
                _ => return Err(SearchError::invalid(key, "unknown key")),
            }
        }
        Ok(schema)
    }

    /// Check every invariant. Pure: a valid schema passes unchanged.
    pub fn validate(&self, ctx: ParseContext<'_>) -> Result<()> {
        if let Some(terms) = &self.search_terms {
            terms.validate(self.scope, ctx.catalog, "search_terms")?;
        }
        if let Some(sorting) = &self.sorting {
            sorting.validate(self.scope, ctx.catalog, "sorting")?;
        }
        if let Some(filters) = &self.filters {
            filters.validate(self.scope, ctx.catalog, ctx.probe, "filters")?;
        }
        Ok(())
    }

    pub fn has_terms(&self) -> bool {
        self.search_terms.is_some()
    }
}
