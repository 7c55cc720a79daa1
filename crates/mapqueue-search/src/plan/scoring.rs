//! Relevance scoring.
//!
//! Per category: every (field, term, pattern) match is a candidate row worth
//! `weight × multiplier`. The best candidate per (entity, field group, term)
//! survives, which keeps only the best pattern per term and counts grouped
//! fields (romanised and unicode titles) once. Categories below or beside the
//! root are mapped onto root ids and reduced again per (root, group, term),
//! so a root linked to many matching children is not counted twice.

use super::filtering::like_operator;
use super::links;
use super::{target, SqlBuilder, SqlParam};
use crate::catalog::{Category, FieldCatalog, Scope};
use crate::error::Result;
use crate::model::{PatternKind, SearchTermsSchema};

/// Select-list expressions for the score columns of the final statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreColumns {
    pub total: String,
    pub details: String,
}

impl ScoreColumns {
    pub(crate) fn absent() -> Self {
        Self {
            total: "NULL::bigint".into(),
            details: "NULL::jsonb".into(),
        }
    }
}

const DETAIL_ROW: &str = "jsonb_build_object('field', field, 'term', term, 'pattern', pattern, 'score', score) \
                          ORDER BY score DESC, field, term";

pub(crate) fn scores(
    b: &mut SqlBuilder,
    catalog: &FieldCatalog,
    scope: Scope,
    schema: &SearchTermsSchema,
) -> Result<ScoreColumns> {
    let like = like_operator(schema.case_sensitive);
    let kinds: Vec<(PatternKind, i8)> = schema.pattern_multipliers.enabled().collect();

    // term text and one pattern per enabled kind, bound once and shared
    let mut bound: Vec<(String, Vec<String>)> = Vec::with_capacity(schema.terms.len());
    for term in &schema.terms {
        let t = b.bind(SqlParam::Text(term.clone()));
        let patterns = kinds
            .iter()
            .map(|(kind, _)| b.bind(SqlParam::Text(kind.like_pattern(term))))
            .collect();
        bound.push((t, patterns));
    }

    let mut totals = Vec::new();
    let mut details = Vec::new();
    for &category in catalog.categories_for(scope) {
        let fields: Vec<_> = schema.field_weights.active_in(category).collect();
        if fields.is_empty() {
            continue;
        }

        let mut candidates = Vec::new();
        for (field, weight) in fields {
            let e = target::expr(b, catalog, field, "c")?;
            let grp = catalog.group_of(field).map_or(field.name(), |g| g.name);
            for (t, patterns) in &bound {
                for ((kind, multiplier), p) in kinds.iter().zip(patterns) {
                    let score = i32::from(weight) * i32::from(*multiplier);
                    candidates.push(format!(
                        "SELECT c.id AS id, '{field}'::text AS field, '{grp}'::text AS grp, \
                         {t}::text AS term, '{kind}'::text AS pattern, {score} AS score \
                         FROM {table} c WHERE {e} {like} {p}",
                        field = field.name(),
                        kind = kind.as_str(),
                        table = category.table(),
                    ));
                }
            }
        }

        let cat = category.as_str();
        b.cte(&format!("{cat}_matches"), candidates.join("\nUNION ALL\n"));
        b.cte(
            &format!("{cat}_hits"),
            format!(
                "SELECT id, field, grp, term, pattern, score FROM (\
                 SELECT m.*, row_number() OVER (PARTITION BY id, grp, term ORDER BY score DESC, field, pattern) AS rank \
                 FROM {cat}_matches m) best WHERE rank = 1"
            ),
        );
        b.cte(&format!("{cat}_score"), roll_up(scope, category)?);

        let alias = format!("sc_{cat}");
        b.join(format!(
            "LEFT JOIN {cat}_score {alias} ON {alias}.root_id = r.id"
        ));
        totals.push(format!("COALESCE({alias}.score, 0)"));
        details.push(format!("'{cat}', {alias}.details"));
    }

    if totals.is_empty() {
        return Ok(ScoreColumns {
            total: "0::bigint".into(),
            details: "'{}'::jsonb".into(),
        });
    }
    Ok(ScoreColumns {
        total: format!("({})::bigint", totals.join(" + ")),
        details: format!("jsonb_strip_nulls(jsonb_build_object({}))", details.join(", ")),
    })
}

/// Sum a category's hits per root id.
fn roll_up(scope: Scope, category: Category) -> Result<String> {
    let cat = category.as_str();
    if category == scope.root_category() {
        return Ok(format!(
            "SELECT id AS root_id, SUM(score)::bigint AS score, jsonb_agg({DETAIL_ROW}) AS details \
             FROM {cat}_hits GROUP BY id"
        ));
    }
    let link = links::link(scope, category)?;
    Ok(format!(
        "SELECT root_id, SUM(score)::bigint AS score, jsonb_agg({DETAIL_ROW}) AS details FROM (\
         SELECT m.root_id, h.field, h.term, h.pattern, h.score, \
         row_number() OVER (PARTITION BY m.root_id, h.grp, h.term ORDER BY h.score DESC, h.field, h.pattern) AS rank \
         FROM (SELECT DISTINCT r.id AS root_id, c.id AS child_id {from}) m \
         JOIN {cat}_hits h ON h.id = m.child_id) per_root WHERE rank = 1 GROUP BY root_id",
        from = links::from_root(scope, &link),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelField;

    fn compose(scope: Scope, schema: &SearchTermsSchema) -> (ScoreColumns, super::super::Statement) {
        let catalog = FieldCatalog::new();
        let mut b = SqlBuilder::default();
        let columns = scores(&mut b, &catalog, scope, schema).unwrap();
        (columns, b.finish("SELECT r.id".into(), "FROM t r".into()))
    }

    #[test]
    fn candidate_score_is_weight_times_multiplier() {
        let schema = SearchTermsSchema::new(vec!["foo".into()]);
        let (_, stmt) = compose(Scope::Items, &schema);
        // version weight 2: exact 10, prefix 8, suffix 6, substring 4
        for (kind, score) in [("exact", 10), ("prefix", 8), ("suffix", 6), ("substring", 4)] {
            assert!(
                stmt.sql.contains(&format!("'{kind}'::text AS pattern, {score} AS score")),
                "{kind}"
            );
        }
        assert_eq!(stmt.params[0], SqlParam::Text("foo".into()));
        assert_eq!(stmt.params.len(), 5);
    }

    #[test]
    fn root_category_sums_directly() {
        let schema = SearchTermsSchema::new(vec!["foo".into()]);
        let (columns, stmt) = compose(Scope::Items, &schema);
        assert!(stmt.sql.contains("item_score AS (\nSELECT id AS root_id, SUM(score)::bigint"));
        assert!(stmt.sql.contains("LEFT JOIN item_score sc_item ON sc_item.root_id = r.id"));
        assert_eq!(columns.total, "(COALESCE(sc_item.score, 0))::bigint");
        assert_eq!(
            columns.details,
            "jsonb_strip_nulls(jsonb_build_object('item', sc_item.details))"
        );
    }

    #[test]
    fn field_groups_collapse_per_term() {
        let schema = SearchTermsSchema::new(vec!["foo".into()]);
        let (_, stmt) = compose(Scope::ItemSets, &schema);
        assert!(stmt.sql.contains("'title_unicode'::text AS field, 'title'::text AS grp"));
        assert!(stmt.sql.contains("'creator'::text AS field, 'creator'::text AS grp"));
        assert!(stmt.sql.contains("PARTITION BY id, grp, term ORDER BY score DESC"));
    }

    #[test]
    fn children_are_mapped_to_roots_without_double_counting() {
        let mut schema = SearchTermsSchema::new(vec!["foo".into()]);
        for f in [ModelField::QueueName, ModelField::QueueDescription, ModelField::RequestComment] {
            schema.field_weights.set(f, None);
        }
        let (columns, stmt) = compose(Scope::Queues, &schema);
        assert!(stmt.sql.contains("item_set_score AS ("));
        assert!(stmt
            .sql
            .contains("PARTITION BY m.root_id, h.grp, h.term ORDER BY h.score DESC"));
        assert!(!stmt.sql.contains("queue_score"));
        assert_eq!(
            columns.total,
            "(COALESCE(sc_item.score, 0) + COALESCE(sc_item_set.score, 0))::bigint"
        );
    }

    #[test]
    fn disabled_patterns_are_not_candidates() {
        let mut schema = SearchTermsSchema::new(vec!["foo".into()]);
        schema.pattern_multipliers.set(PatternKind::Substring, None);
        schema.pattern_multipliers.set(PatternKind::Suffix, None);
        let (_, stmt) = compose(Scope::Items, &schema);
        assert!(!stmt.sql.contains("'substring'"));
        assert_eq!(
            stmt.params,
            vec![
                SqlParam::Text("foo".into()),
                SqlParam::Text("foo".into()),
                SqlParam::Text("foo%".into()),
            ]
        );
    }
}
