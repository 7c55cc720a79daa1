use super::links::{self, Cardinality};
use super::{target, SqlBuilder};
use crate::catalog::{FieldCatalog, Scope};
use crate::error::Result;
use crate::model::SortingSchema;

/// One sort key CTE per option, left-joined so roots without a value sort
/// last instead of disappearing.
pub(crate) fn keys(
    b: &mut SqlBuilder,
    catalog: &FieldCatalog,
    scope: Scope,
    sorting: &SortingSchema,
) -> Result<()> {
    for (k, option) in sorting.options.iter().enumerate() {
        let link = links::link(scope, option.field.category())?;
        let e = target::expr(b, catalog, option.field, "c")?;
        let from = links::from_root(scope, &link);
        let order = option.order.sql();
        let body = match link.cardinality {
            Cardinality::One => format!("SELECT r.id AS root_id, {e} AS target {from}"),
            // one representative child per root; child id breaks ties
            Cardinality::Many => format!(
                "SELECT root_id, target FROM (\
                 SELECT r.id AS root_id, {e} AS target, \
                 row_number() OVER (PARTITION BY r.id ORDER BY {e} {order} NULLS LAST, c.id ASC) AS rank \
                 {from}) ranked WHERE rank = 1"
            ),
        };
        let name = format!("sort_{k}");
        b.cte(&name, body);
        b.join(format!("LEFT JOIN {name} s{k} ON s{k}.root_id = r.id"));
        b.order(format!("s{k}.target {order} NULLS LAST"));
    }
    Ok(())
}
