//! Search orchestration: parse, compose and execute, then paginate and dump.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::catalog::{FieldCatalog, Scope};
use crate::codec;
use crate::error::{Result, SearchError};
use crate::model::{ParseContext, RawQuery, RegexSafetyProbe, SearchSchema};
use crate::plan::{relations, PlanComposer, RelationSpec};
use crate::ports::{SearchRow, SearchStore};

pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 500;

// ── Pagination ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u64,
}

impl Pagination {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Result<Self> {
        Self::with_default(limit, offset, DEFAULT_LIMIT)
    }

    /// Negative values are rejected; limits above [`MAX_LIMIT`] are capped.
    pub fn with_default(limit: Option<i64>, offset: Option<i64>, default_limit: u32) -> Result<Self> {
        let limit = match limit {
            None => default_limit.min(MAX_LIMIT),
            Some(l) if l < 0 => return Err(SearchError::invalid("limit", "limit must not be negative")),
            Some(l) => u32::try_from(l).unwrap_or(MAX_LIMIT).min(MAX_LIMIT),
        };
        let offset = match offset {
            None => 0,
            Some(o) if o < 0 => {
                return Err(SearchError::invalid("offset", "offset must not be negative"))
            }
            Some(o) => o.unsigned_abs(),
        };
        Ok(Self { limit, offset })
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

// ── Options and outcome ────────────────────────────────────────

/// How result records are trimmed before they leave the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpMode {
    /// The fixed field set the web frontend renders.
    Frontend,
    /// Keep `include` (everything when empty), then drop `exclude`.
    Select {
        include: Vec<String>,
        exclude: Vec<String>,
    },
}

impl Default for DumpMode {
    fn default() -> Self {
        Self::Select {
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Relation names to embed. Frontend mode adds its own.
    pub relations: Vec<String>,
    pub dump: DumpMode,
    pub debug: bool,
}

impl SearchOptions {
    /// Split an `include` list: relation names of `scope` select relations,
    /// `-name` excludes a field, any other name restricts the output fields.
    pub fn from_include(scope: Scope, include: &[String], frontend_mode: bool, debug: bool) -> Self {
        let mut relation_names = Vec::new();
        let mut fields = Vec::new();
        let mut exclude = Vec::new();
        for item in include.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            if let Some(field) = item.strip_prefix('-') {
                exclude.push(field.to_string());
            } else if relations::find(scope, item).is_some() {
                relation_names.push(item.to_string());
            } else {
                fields.push(item.to_string());
            }
        }
        // requested relations stay visible when fields are restricted
        if !fields.is_empty() {
            fields.extend(relation_names.iter().cloned());
        }
        let dump = if frontend_mode {
            DumpMode::Frontend
        } else {
            DumpMode::Select {
                include: fields,
                exclude,
            }
        };
        Self {
            relations: relation_names,
            dump,
            debug,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub rows: Vec<SearchRow>,
    pub pagination: Pagination,
    pub debug_trace: Option<String>,
}

// ── Service ────────────────────────────────────────────────────

pub struct SearchService {
    catalog: Arc<FieldCatalog>,
    store: Arc<dyn SearchStore>,
    probe: Arc<dyn RegexSafetyProbe>,
    debug: bool,
}

impl SearchService {
    pub fn new(
        catalog: Arc<FieldCatalog>,
        store: Arc<dyn SearchStore>,
        probe: Arc<dyn RegexSafetyProbe>,
    ) -> Self {
        Self {
            catalog,
            store,
            probe,
            debug: false,
        }
    }

    /// Force debug tracing for every request.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    fn context(&self) -> ParseContext<'_> {
        ParseContext::new(&self.catalog, self.probe.as_ref())
    }

    pub fn parse(&self, raw: &RawQuery) -> Result<SearchSchema> {
        SearchSchema::parse(raw, self.context())
    }

    /// Validate a JSON query and return its URL token.
    pub fn encode(&self, value: &Value) -> Result<String> {
        let schema = self.parse(&RawQuery::Json(value.clone()))?;
        Ok(codec::encode_token(&schema, &self.catalog)?)
    }

    pub async fn execute(
        &self,
        schema: &SearchSchema,
        pagination: Pagination,
        options: &SearchOptions,
    ) -> Result<SearchOutcome> {
        let mut embedded: Vec<&'static RelationSpec> =
            relations::resolve(schema.scope, options.relations.as_slice())?;
        if options.dump == DumpMode::Frontend {
            for relation in relations::frontend(schema.scope) {
                if !embedded.contains(&relation) {
                    embedded.push(relation);
                }
            }
        }

        let statement = PlanComposer::new(&self.catalog).compose(
            schema,
            &embedded,
            pagination.limit,
            pagination.offset,
        )?;

        let rows = self.store.fetch(&statement).await?;
        tracing::info!(
            scope = %schema.scope,
            terms = schema.has_terms(),
            rows = rows.len(),
            limit = pagination.limit,
            offset = pagination.offset,
            "search executed"
        );

        let debug_trace = if options.debug || self.debug {
            tracing::debug!(sql = %statement.explain(), "search statement");
            let traced = self.store.fetch(&statement).await?;
            let trace = render_trace(&traced);
            tracing::debug!(trace = %trace, "score breakdown");
            Some(trace)
        } else {
            None
        };

        Ok(SearchOutcome {
            rows,
            pagination,
            debug_trace,
        })
    }
}

// ── Dumping ────────────────────────────────────────────────────

fn frontend_fields(scope: Scope) -> &'static [&'static str] {
    match scope {
        Scope::Items => &["id", "beatmap_id", "version", "mode", "difficulty_rating", "total_length"],
        Scope::ItemSets => &[
            "id",
            "beatmapset_id",
            "artist",
            "artist_unicode",
            "title",
            "title_unicode",
            "creator",
            "items",
            "creator_profile",
        ],
        Scope::Queues => &["id", "name", "description", "is_open", "user_id", "owner"],
        Scope::Requests => &[
            "id",
            "beatmapset_id",
            "user_id",
            "status",
            "comment",
            "item_set",
            "queue",
            "requester",
        ],
    }
}

/// Serializable records. `total_score` is attached when terms were given.
pub fn dump(scope: Scope, rows: &[SearchRow], mode: &DumpMode, with_score: bool) -> Vec<Value> {
    rows.iter()
        .map(|row| {
            let source = row.record.as_object().cloned().unwrap_or_default();
            let mut out: Map<String, Value> = match mode {
                DumpMode::Frontend => frontend_fields(scope)
                    .iter()
                    .filter_map(|k| source.get(*k).map(|v| (k.to_string(), v.clone())))
                    .collect(),
                DumpMode::Select { include, exclude } => source
                    .into_iter()
                    .filter(|(k, _)| include.is_empty() || include.contains(k))
                    .filter(|(k, _)| !exclude.contains(k))
                    .collect(),
            };
            if with_score {
                out.insert("total_score".into(), row.total_score.map_or(Value::Null, Value::from));
            }
            Value::Object(out)
        })
        .collect()
}

fn render_trace(rows: &[SearchRow]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&format!(
            "#{} total_score={}\n",
            row.id,
            row.total_score.map_or_else(|| "-".to_string(), |s| s.to_string())
        ));
        let Some(Value::Object(categories)) = &row.score_details else {
            continue;
        };
        for (category, hits) in categories {
            for hit in hits.as_array().into_iter().flatten() {
                out.push_str(&format!(
                    "  {category}.{} '{}' {} {}\n",
                    hit["field"].as_str().unwrap_or("?"),
                    hit["term"].as_str().unwrap_or("?"),
                    hit["pattern"].as_str().unwrap_or("?"),
                    hit["score"],
                ));
            }
        }
    }
    out
}
