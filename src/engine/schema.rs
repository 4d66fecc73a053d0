//! Metadata for the tables the user can filter and join.
//!
//! The parser never touches the data store; it only needs to know which
//! user-facing names map to which db identifiers, which columns form the
//! grouping key for overview queries, and which column breaks ties. That
//! is exactly what lives here. Catalogs serialize to JSON so the CLI can
//! load one that was saved earlier.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The row id column every data table carries.
pub const ROW_ID: &str = "_id";
/// Tracks where a row is in its sync lifecycle.
pub const SYNC_STATE: &str = "_sync_state";
/// Rows in this state are waiting to be purged and never show up in results.
pub const STATE_DELETING: i32 = 3;

/// Every table visible for join resolution.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Catalog {
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub display_name: String,
    pub db_name: TableName,
    pub columns: Vec<Column>,
    /// The grouping key for overview queries. Empty means the table has no
    /// overview form and overview compilation degrades to the flat one.
    pub prime: Vec<ColumnName>,
    /// Breaks ties within a prime-column group before the row id does.
    pub sort: Option<ColumnName>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub display_name: String,
    pub abbreviation: Option<String>,
    pub db_name: ColumnName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnName(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName(pub String);

impl Catalog {
    /// Looks a table up the way users write it, so "join:fridges" finds the
    /// table displayed as "Fridges".
    pub fn table_by_user_string(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|table| table.display_name.eq_ignore_ascii_case(name))
    }
}

impl Table {
    /// Display name first, abbreviation second.
    pub fn column_by_user_string(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|column| column.display_name == name)
            .or_else(|| {
                self.columns
                    .iter()
                    .find(|column| column.abbreviation.as_deref() == Some(name))
            })
    }

    pub fn column_by_db_name(&self, db_name: &ColumnName) -> Option<&Column> {
        self.columns.iter().find(|column| &column.db_name == db_name)
    }

    /// The name to show a user for a db column. Falls back to the db name
    /// itself, columns in a Query are resolved so the fallback never fires
    /// in practice.
    pub fn user_name_for<'a>(&'a self, db_name: &'a ColumnName) -> &'a str {
        self.column_by_db_name(db_name)
            .map(|column| column.display_name.as_str())
            .unwrap_or(db_name.0.as_str())
    }

    /// All db columns, in declared order.
    pub fn column_order(&self) -> Vec<ColumnName> {
        self.columns
            .iter()
            .map(|column| column.db_name.clone())
            .collect()
    }
}

impl PartialEq<&str> for ColumnName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<&str> for TableName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl<T: Into<String>> From<T> for ColumnName {
    fn from(name: T) -> ColumnName {
        ColumnName(name.into())
    }
}

impl<T: Into<String>> From<T> for TableName {
    fn from(name: T) -> TableName {
        TableName(name.into())
    }
}

impl Display for ColumnName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
