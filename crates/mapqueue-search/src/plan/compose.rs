use super::relations::RelationSpec;
use super::scoring::ScoreColumns;
use super::{filtering, links, scoring, sorting, SqlBuilder, SqlParam, Statement};
use crate::catalog::FieldCatalog;
use crate::error::Result;
use crate::model::SearchSchema;

/// Builds the single statement that answers a search.
pub struct PlanComposer<'a> {
    catalog: &'a FieldCatalog,
}

impl<'a> PlanComposer<'a> {
    pub fn new(catalog: &'a FieldCatalog) -> Self {
        Self { catalog }
    }

    /// Compose the statement for a validated schema.
    ///
    /// Output columns are `id`, `record` (the root row as `jsonb` with the
    /// requested relations merged in), `total_score` and `score_details`.
    /// Explicit sort keys come first; relevance only breaks their ties.
    pub fn compose(
        &self,
        schema: &SearchSchema,
        relations: &[&RelationSpec],
        limit: u32,
        offset: u64,
    ) -> Result<Statement> {
        let scope = schema.scope;
        let mut b = SqlBuilder::default();

        let terms = schema.search_terms.as_ref().filter(|t| !t.terms.is_empty());
        if let Some(terms) = terms {
            filtering::terms(&mut b, self.catalog, scope, terms)?;
        }
        if let Some(filters) = &schema.filters {
            filtering::fields(&mut b, self.catalog, scope, filters)?;
        }
        if let Some(sorting) = &schema.sorting {
            sorting::keys(&mut b, self.catalog, scope, sorting)?;
        }
        let score = match terms {
            Some(terms) => {
                let columns = scoring::scores(&mut b, self.catalog, scope, terms)?;
                b.order("total_score DESC".into());
                columns
            }
            None => ScoreColumns::absent(),
        };
        b.order("r.id ASC".into());

        let limit = b.bind(SqlParam::Int(i64::from(limit)));
        let offset = b.bind(SqlParam::Int(i64::try_from(offset).unwrap_or(i64::MAX)));

        let record = if relations.is_empty() {
            "to_jsonb(r.*)".to_string()
        } else {
            let pairs: Vec<String> = relations
                .iter()
                .map(|rel| format!("'{}', {}", rel.name, rel.sql))
                .collect();
            format!("to_jsonb(r.*) || jsonb_build_object({})", pairs.join(", "))
        };
        let select = format!(
            "SELECT r.id::bigint AS id, {record} AS record, {} AS total_score, {} AS score_details",
            score.total, score.details
        );

        let root = links::root(scope);
        let from = match root.listing {
            Some(listing) => format!("FROM {} r\n{listing}", root.table),
            None => format!("FROM {} r", root.table),
        };

        let mut statement = b.finish(select, from);
        SqlBuilder::append(&mut statement, &format!("LIMIT {limit} OFFSET {offset}"));

        tracing::debug!(
            scope = %scope,
            params = statement.params.len(),
            sql_len = statement.sql.len(),
            "composed search statement"
        );
        Ok(statement)
    }
}
