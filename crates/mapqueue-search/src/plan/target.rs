use super::SqlBuilder;
use crate::catalog::{FieldCatalog, FieldTarget, ModelField};
use crate::error::{Result, SearchError};

/// SQL expression for `field` on the row aliased `alias`. Derived fields
/// register their sub-query as a CTE and read it through a correlated lookup,
/// so callers never see the difference.
pub(crate) fn expr(
    b: &mut SqlBuilder,
    catalog: &FieldCatalog,
    field: ModelField,
    alias: &str,
) -> Result<String> {
    match field.spec().target {
        FieldTarget::Column(column) => Ok(format!("{alias}.{column}")),
        FieldTarget::Derived(name) => {
            let derived = catalog.derived(name).ok_or_else(|| {
                SearchError::Composition(format!("derived target {name} is not registered"))
            })?;
            b.cte(name, derived.sql.to_string());
            Ok(format!("(SELECT d.target FROM {name} d WHERE d.id = {alias}.id)"))
        }
    }
}
