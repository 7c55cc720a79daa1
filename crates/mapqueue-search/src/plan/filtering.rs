//! Filtering stage: term matching and field conditions, both reduced to sets
//! of root ids that the final query inner-joins.

use super::links::{self, Cardinality};
use super::{target, SqlBuilder, SqlParam};
use crate::catalog::{FieldCatalog, ModelField, Scope};
use crate::error::{Result, SearchError};
use crate::model::{Conditions, FiltersSchema, Operator, SearchTermsSchema};

pub(crate) fn like_operator(case_sensitive: bool) -> &'static str {
    if case_sensitive {
        "LIKE"
    } else {
        "ILIKE"
    }
}

/// One CTE per term: roots with any weighted field matching any enabled
/// pattern. `term_match` intersects them, so every term must match.
pub(crate) fn terms(
    b: &mut SqlBuilder,
    catalog: &FieldCatalog,
    scope: Scope,
    schema: &SearchTermsSchema,
) -> Result<()> {
    let like = like_operator(schema.case_sensitive);
    let mut term_ctes = Vec::with_capacity(schema.terms.len());

    for (i, term) in schema.terms.iter().enumerate() {
        let patterns: Vec<String> = schema
            .pattern_multipliers
            .enabled()
            .map(|(kind, _)| b.bind(SqlParam::Text(kind.like_pattern(term))))
            .collect();

        let mut branches = Vec::new();
        for &category in catalog.categories_for(scope) {
            let fields: Vec<ModelField> = schema
                .field_weights
                .active_in(category)
                .map(|(f, _)| f)
                .collect();
            if fields.is_empty() {
                continue;
            }
            let link = links::link(scope, category)?;
            let mut predicates = Vec::new();
            for field in fields {
                let e = target::expr(b, catalog, field, "c")?;
                predicates.extend(patterns.iter().map(|p| format!("{e} {like} {p}")));
            }
            branches.push(format!(
                "SELECT r.id AS root_id {} WHERE {}",
                links::from_root(scope, &link),
                predicates.join(" OR ")
            ));
        }
        if branches.is_empty() {
            return Err(SearchError::Composition(
                "no weighted field left to match terms against".into(),
            ));
        }

        let name = format!("term_{i}");
        b.cte(&name, branches.join("\nUNION\n"));
        term_ctes.push(name);
    }

    let intersection: Vec<String> = term_ctes
        .iter()
        .map(|name| format!("SELECT root_id FROM {name}"))
        .collect();
    b.cte("term_match", intersection.join("\nINTERSECT\n"));
    b.join("JOIN term_match tm ON tm.root_id = r.id".into());
    Ok(())
}

/// One CTE per filtered field. Links at or above the root filter rows
/// directly; links below it aggregate children per root.
pub(crate) fn fields(
    b: &mut SqlBuilder,
    catalog: &FieldCatalog,
    scope: Scope,
    filters: &FiltersSchema,
) -> Result<()> {
    for (i, (field, conditions)) in filters.iter().enumerate() {
        let link = links::link(scope, field.category())?;
        let e = target::expr(b, catalog, field, "c")?;
        let predicates = predicates(b, field, &e, conditions, link.cardinality)?;
        let from = links::from_root(scope, &link);
        let body = match link.cardinality {
            Cardinality::One => format!(
                "SELECT DISTINCT r.id AS root_id {from} WHERE {}",
                predicates.join(" AND ")
            ),
            Cardinality::Many => format!(
                "SELECT r.id AS root_id {from} GROUP BY r.id HAVING {}",
                predicates.join(" AND ")
            ),
        };
        let name = format!("filter_{i}");
        b.cte(&name, body);
        b.join(format!("JOIN {name} f{i} ON f{i}.root_id = r.id"));
    }
    Ok(())
}

fn predicates(
    b: &mut SqlBuilder,
    field: ModelField,
    e: &str,
    conditions: &Conditions,
    cardinality: Cardinality,
) -> Result<Vec<String>> {
    let ty = field.field_type();
    let mut out = Vec::new();
    for op in conditions.operators() {
        let predicate = match op {
            Operator::Eq | Operator::Neq | Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
                let value = conditions.scalar(op).ok_or_else(|| {
                    SearchError::Composition(format!("{} has no operand", op.as_str()))
                })?;
                let p = b.bind(SqlParam::scalar(value, ty));
                let sql_op = match op {
                    Operator::Eq => "=",
                    Operator::Neq => "<>",
                    Operator::Lt => "<",
                    Operator::Lte => "<=",
                    Operator::Gt => ">",
                    _ => ">=",
                };
                let cmp = format!("{e} {sql_op} {p}");
                match (cardinality, op) {
                    (Cardinality::One, _) => cmp,
                    // a null child fails the comparison
                    (Cardinality::Many, Operator::Neq) => format!("bool_and(coalesce({cmp}, false))"),
                    (Cardinality::Many, _) => format!("bool_or({cmp})"),
                }
            }
            Operator::In | Operator::NotIn => {
                let values = if op == Operator::In {
                    conditions.in_.as_deref()
                } else {
                    conditions.not_in.as_deref()
                }
                .unwrap_or_default();
                let p = b.bind(SqlParam::array(values, ty)?);
                match (cardinality, op) {
                    (Cardinality::One, Operator::In) => format!("{e} = ANY({p})"),
                    (Cardinality::One, _) => format!("{e} <> ALL({p})"),
                    (Cardinality::Many, Operator::In) => format!("bool_or({e} = ANY({p}))"),
                    (Cardinality::Many, _) => {
                        format!("NOT coalesce(bool_or({e} = ANY({p})), false)")
                    }
                }
            }
            Operator::IsNull => match (cardinality, conditions.is_null == Some(true)) {
                (Cardinality::One, true) => format!("{e} IS NULL"),
                (Cardinality::One, false) => format!("{e} IS NOT NULL"),
                (Cardinality::Many, true) => format!("bool_and({e} IS NULL)"),
                (Cardinality::Many, false) => format!("bool_or({e} IS NOT NULL)"),
            },
            Operator::Regex | Operator::NotRegex => {
                let pattern = if op == Operator::Regex {
                    conditions.regex.clone()
                } else {
                    conditions.not_regex.clone()
                }
                .unwrap_or_default();
                let p = b.bind(SqlParam::Text(pattern));
                match (cardinality, op) {
                    (Cardinality::One, Operator::Regex) => format!("{e} ~ {p}"),
                    (Cardinality::One, _) => format!("{e} !~ {p}"),
                    (Cardinality::Many, Operator::Regex) => format!("bool_or({e} ~ {p})"),
                    (Cardinality::Many, _) => format!("NOT coalesce(bool_or({e} ~ {p}), false)"),
                }
            }
        };
        out.push(predicate);
    }
    Ok(out)
}
