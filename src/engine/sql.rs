//! Compilation of a populated Query into parameterized SQL.
//!
//! Everything here composes [SqlFragment]s, pairs of SQL text and positional
//! arguments, so placeholder and argument order can never drift apart. The
//! compiler assumes a well-formed model: every column identifier in a Query
//! was resolved by the parser, and a Query that failed to parse never gets
//! compiled.

use crate::engine::query::{Join, Query, SortOrder};
use crate::engine::schema::{ColumnName, ROW_ID, STATE_DELETING, SYNC_STATE};

/// SQL text plus the values for its `?` placeholders, in order. Appending
/// fragments to each other is the only composition primitive the compiler
/// uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlFragment {
    sql: String,
    args: Vec<String>,
}

/// Aggregations available for grouped queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFunction {
    Count,
    Average,
    Minimum,
    Maximum,
    Sum,
}

impl SqlFragment {
    pub fn new() -> SqlFragment {
        SqlFragment::default()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.sql, self.args)
    }

    fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    fn push_arg(&mut self, value: String) {
        self.args.push(value);
    }

    fn append(&mut self, other: SqlFragment) {
        self.sql.push_str(&other.sql);
        self.args.extend(other.args);
    }

    fn append_args(&mut self, other: SqlFragment) {
        self.args.extend(other.args);
    }
}

impl Query<'_> {
    /// The flat filtered selection:
    /// `SELECT <row id>, <columns> FROM <table> [joins] WHERE <not deleting>
    /// [constraints] [ORDER BY]`.
    pub fn compile_flat(&self, columns: &[ColumnName]) -> SqlFragment {
        let mut fragment = self.compile_projected(columns);

        if let Some((order_by, direction)) = self.order_by() {
            let direction = match direction {
                SortOrder::Ascending => "ASC",
                SortOrder::Descending => "DESC",
            };
            fragment.push_sql(&format!(" ORDER BY {} {}", order_by, direction));
        }

        fragment
    }

    /// One representative row per distinct combination of prime-column
    /// values: the row with the greatest row id, where a sort column first
    /// narrows each group to its greatest sort value.
    ///
    /// With a sort column the shape is
    ///
    /// ```text
    /// SELECT d._id, d.a, d.b, d.c FROM t d JOIN (
    ///   SELECT MAX(_id) AS _id FROM
    ///     (SELECT t.a AS a, MAX(b) AS b FROM t WHERE ... GROUP BY a) x
    ///     JOIN (SELECT t._id AS _id, t.a AS a, t.b AS b FROM t WHERE ...) y
    ///     ON x.b = y.b AND x.a = y.a
    ///     GROUP BY x.a, x.b
    /// ) z ON d._id = z._id
    /// ```
    ///
    /// for prime column a and sort column b. The x and y sub-selections each
    /// repeat the filter, so every constraint value appears twice in the
    /// argument list, once per sub-selection, keeping placeholders and
    /// arguments aligned.
    pub fn compile_overview(&self, columns: &[ColumnName]) -> SqlFragment {
        let primes = &self.table().prime;
        if primes.is_empty() {
            // Without a grouping key there is nothing to collapse.
            return self.compile_flat(columns);
        }

        let table = &self.table().db_name;
        let prime_list = primes
            .iter()
            .map(|prime| prime.0.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let mut fragment = SqlFragment::new();
        fragment.push_sql(&format!("SELECT d.{}", ROW_ID));
        for column in columns {
            fragment.push_sql(&format!(", d.{}", column));
        }
        fragment.push_sql(&format!(" FROM {} d JOIN (", table));

        match &self.table().sort {
            None => {
                fragment.append(
                    self.compile_filtered(&format!("MAX({}.{}) AS {}", table, ROW_ID, ROW_ID)),
                );
                fragment.push_sql(&format!(" GROUP BY {}", prime_list));
            }
            Some(sort) => {
                fragment.push_sql(&format!("SELECT MAX({}) AS {} FROM ", ROW_ID, ROW_ID));

                let mut x_selection = String::new();
                for prime in primes {
                    x_selection.push_str(&format!("{}.{} AS {}, ", table, prime, prime));
                }
                x_selection.push_str(&format!("MAX({}) AS {}", sort, sort));
                let x = self.compile_filtered(&x_selection);

                let mut y_columns = primes.clone();
                y_columns.push(sort.clone());
                let y = self.compile_flat(&y_columns);

                fragment.push_sql(&format!(
                    "({} GROUP BY {}) x JOIN ({}) y",
                    x.sql(),
                    prime_list,
                    y.sql()
                ));
                fragment.append_args(x);
                fragment.append_args(y);

                fragment.push_sql(&format!(" ON x.{} = y.{}", sort, sort));
                for prime in primes {
                    fragment.push_sql(&format!(" AND x.{} = y.{}", prime, prime));
                }
                fragment.push_sql(" GROUP BY ");
                for prime in primes {
                    fragment.push_sql(&format!("x.{}, ", prime));
                }
                fragment.push_sql(&format!("x.{}", sort));
            }
        }

        fragment.push_sql(&format!(") z ON d.{} = z.{}", ROW_ID, ROW_ID));

        fragment
    }

    /// Grouped aggregation over the filtered selection, one output row per
    /// distinct value of `column`. The aggregate lands in a column named `g`.
    pub fn compile_group(&self, column: &ColumnName, function: GroupFunction) -> SqlFragment {
        let function_sql = match function {
            GroupFunction::Count => format!("COUNT({})", column),
            GroupFunction::Average => format!("(SUM({}) / COUNT({}))", column, column),
            GroupFunction::Minimum => format!("MIN({})", column),
            GroupFunction::Maximum => format!("MAX({})", column),
            GroupFunction::Sum => format!("SUM({})", column),
        };

        let mut fragment = self.compile_filtered(&format!("{}, {} AS g", column, function_sql));
        fragment.push_sql(&format!(" GROUP BY {}", column));

        fragment
    }

    /// Row id first, then the projected columns, all table-qualified and
    /// aliased.
    fn compile_projected(&self, columns: &[ColumnName]) -> SqlFragment {
        let table = &self.table().db_name;

        let mut selection = format!("{}.{} AS {}", table, ROW_ID, ROW_ID);
        for column in columns {
            selection.push_str(&format!(", {}.{} AS {}", table, column, column));
        }

        self.compile_filtered(&selection)
    }

    /// The shared skeleton every compiled form goes through:
    /// `SELECT <selection> FROM <table> [joins] WHERE <not deleting>
    /// [constraints]`. Join arguments come before constraint arguments
    /// because their placeholders do.
    fn compile_filtered(&self, selection: &str) -> SqlFragment {
        let table = &self.table().db_name;

        let mut fragment = SqlFragment::new();
        fragment.push_sql(&format!("SELECT {} FROM {}", selection, table));

        for join in self.joins() {
            fragment.push_sql(" ");
            fragment.append(join.compile());
        }

        fragment.push_sql(&format!(
            " WHERE {}.{} != {}",
            table, SYNC_STATE, STATE_DELETING
        ));

        for constraint in self.constraints() {
            fragment.push_sql(&format!(" AND {}.{} = ?", table, constraint.column));
            fragment.push_arg(constraint.value.clone());
        }

        fragment
    }
}

impl Join<'_> {
    /// `JOIN (<nested flat selection>) ON local = remote [AND ...]`. The
    /// nested selection projects every column of the joined table.
    fn compile(&self) -> SqlFragment {
        let mut fragment = SqlFragment::new();

        fragment.push_sql("JOIN (");
        fragment.append(self.query.compile_flat(&self.table.column_order()));
        fragment.push_sql(") ON ");

        for (index, pair) in self.matches.iter().enumerate() {
            if index > 0 {
                fragment.push_sql(" AND ");
            }
            fragment.push_sql(&format!("{} = {}", pair.local, pair.remote));
        }

        fragment
    }
}
