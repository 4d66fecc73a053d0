//! The filter engine: scanning colon queries, resolving them against the
//! table catalog, and compiling parameterized SQL.
//!
//! The pipeline is raw text -> tokens (syntax) -> Query model (query) ->
//! SqlFragment (sql). Each stage only knows about the one before it.
pub mod query;
pub mod schema;
pub mod sql;
pub mod syntax;


use crate::engine::query::Query;
use crate::engine::schema::Catalog;
use crate::engine::sql::SqlFragment;
use crate::error::ErrorKind;

/// Parses `input` against the named table and compiles the flat filtered
/// selection over all of its columns.
pub fn compile(input: &str, catalog: &Catalog, table: &str) -> Result<SqlFragment, crate::Error> {
    let query = parse(input, catalog, table)?;
    let columns = query.table().column_order();

    Ok(query.compile_flat(&columns))
}

/// Like [compile], but collapses the table to one representative row per
/// prime-column group.
pub fn compile_overview(
    input: &str,
    catalog: &Catalog,
    table: &str,
) -> Result<SqlFragment, crate::Error> {
    let query = parse(input, catalog, table)?;
    let columns = query.table().column_order();

    Ok(query.compile_overview(&columns))
}

fn parse<'a>(input: &str, catalog: &'a Catalog, table: &str) -> Result<Query<'a>, crate::Error> {
    let table = catalog
        .table_by_user_string(table)
        .ok_or_else(|| ErrorKind::UnknownTable(table.to_string()))?;

    let mut query = Query::new(catalog, table);
    if !query.parse(input) {
        return Err(ErrorKind::MalformedQuery(input.to_string()).into());
    }

    Ok(query)
}
