//! The in-memory query model and the parse step that populates it.
//!
//! A Query belongs to one subject table and sees the whole catalog so join
//! targets can be resolved. Joins own a nested Query scoped to their target
//! table, which makes the model a tree; nothing in it is shared, so building
//! and compiling recursively needs no cleverness.
//!
//! Parsing favors graceful degradation. An ambiguous or half-broken join
//! token becomes a plain literal constraint instead of aborting the parse;
//! the only hard failures are a missing colon and a non-join key that does
//! not resolve to any column, because a filter on an unknown column has no
//! sensible fallback.

use crate::engine::schema::{Catalog, Column, ColumnName, Table};
use crate::engine::syntax::{scan, TokenKind};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug)]
pub struct Query<'a> {
    catalog: &'a Catalog,
    table: &'a Table,
    constraints: Vec<Constraint>,
    joins: Vec<Join<'a>>,
    order_by: Option<ColumnName>,
    sort_order: SortOrder,
}

/// One `column = value` filter. The column is always a resolved db
/// identifier; the parser guarantees it, and the compiler relies on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub column: ColumnName,
    pub value: String,
}

#[derive(Debug)]
pub struct Join<'a> {
    pub table: &'a Table,
    /// Filter on the joined table. Empty when no sub-query was given, or
    /// when the sub-query failed to parse and was dropped.
    pub query: Query<'a>,
    /// Never empty; a join that cannot produce at least one pair is rejected
    /// during parsing.
    pub matches: Vec<MatchPair>,
}

/// An equality pair in a join's ON clause. `local` belongs to the outer
/// table, `remote` to the joined one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPair {
    pub local: ColumnName,
    pub remote: ColumnName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl<'a> Query<'a> {
    pub fn new(catalog: &'a Catalog, table: &'a Table) -> Query<'a> {
        Query {
            catalog,
            table,
            constraints: Vec::new(),
            joins: Vec::new(),
            // Tables with a designated sort column get ordered output by
            // default.
            order_by: table.sort.clone(),
            sort_order: SortOrder::default(),
        }
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn joins(&self) -> &[Join<'a>] {
        &self.joins
    }

    pub(crate) fn order_by(&self) -> Option<(&ColumnName, SortOrder)> {
        self.order_by
            .as_ref()
            .map(|column| (column, self.sort_order))
    }

    pub fn clear(&mut self) {
        self.constraints.clear();
        self.joins.clear();
    }

    /// Appends a filter programmatically, outside of text parsing.
    pub fn add_constraint(&mut self, column: &Column, value: &str) {
        self.constraints.push(Constraint {
            column: column.db_name.clone(),
            value: value.to_string(),
        });
    }

    pub fn set_order_by(&mut self, column: &Column, order: SortOrder) {
        self.order_by = Some(column.db_name.clone());
        self.sort_order = order;
    }

    /// Attempts to parse a user query, appending to the constraint and join
    /// lists. A false return means the query is definitely malformed; true
    /// does not guarantee it was semantically valid. Callers should discard
    /// the Query on false, the lists may be partially populated.
    pub fn parse(&mut self, input: &str) -> bool {
        let tokens = match scan(input) {
            Some(tokens) => tokens,
            None => return false,
        };

        for token in tokens {
            let committed = match token.kind {
                TokenKind::Constraint => self.commit_constraint(token.key, token.value),
                // A join that cannot be decomposed falls back to a literal
                // constraint keyed by the raw "join" text, mirroring the
                // non-join path. In practice that key resolves to nothing
                // and the parse fails, but a table with a column actually
                // named "join" gets the literal filter.
                TokenKind::Join => {
                    self.commit_join(token.value) || self.commit_constraint(token.key, token.value)
                }
            };

            if !committed {
                return false;
            }
        }

        true
    }

    fn commit_constraint(&mut self, key: &str, value: &str) -> bool {
        match self.table.column_by_user_string(key) {
            Some(column) => {
                self.constraints.push(Constraint {
                    column: column.db_name.clone(),
                    value: value.to_string(),
                });
                true
            }
            None => false,
        }
    }

    fn commit_join(&mut self, value: &str) -> bool {
        let (table_name, sub_query, match_string) = match split_join_value(value) {
            Some(parts) => parts,
            None => return false,
        };

        let join_table = match self.catalog.table_by_user_string(table_name) {
            Some(table) => table,
            None => {
                debug!("join target {} not in catalog", table_name);
                return false;
            }
        };

        let matches = match self.resolve_match_pairs(join_table, match_string) {
            Some(matches) => matches,
            None => return false,
        };

        let mut nested = Query::new(self.catalog, join_table);
        if let Some(sub) = sub_query {
            if !nested.parse(sub) {
                // The join still commits, only the nested filter is dropped.
                debug!("discarding unparseable join sub-query: {}", sub);
                nested = Query::new(self.catalog, join_table);
            }
        }

        self.joins.push(Join {
            table: join_table,
            query: nested,
            matches,
        });

        true
    }

    fn resolve_match_pairs(
        &self,
        join_table: &Table,
        match_string: &str,
    ) -> Option<Vec<MatchPair>> {
        static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

        let mut pairs = Vec::new();
        for spec in WHITESPACE.split(match_string.trim()) {
            let (local, remote) = spec.split_once('/')?;
            let local = self.table.column_by_user_string(local)?;
            let remote = join_table.column_by_user_string(remote)?;

            pairs.push(MatchPair {
                local: local.db_name.clone(),
                remote: remote.db_name.clone(),
            });
        }

        // Splitting an empty match string yields nothing; a join needs at
        // least one pair.
        if pairs.is_empty() {
            return None;
        }

        Some(pairs)
    }

    /// The parser's inverse, for display. Best effort: whitespace is
    /// normalized and names come back as display names, so the result is
    /// re-parseable but not byte-identical to the original input.
    pub fn to_user_query(&self) -> String {
        let mut parts = Vec::new();

        for constraint in &self.constraints {
            parts.push(format!(
                "{}:{}",
                self.table.user_name_for(&constraint.column),
                constraint.value
            ));
        }

        for join in &self.joins {
            parts.push(self.join_to_user_query(join));
        }

        parts.join(" ")
    }

    fn join_to_user_query(&self, join: &Join) -> String {
        let mut out = format!("join:{}", join.table.display_name);

        let nested = join.query.to_user_query();
        if !nested.is_empty() {
            out.push_str(&format!(" ({})", nested));
        }

        for pair in &join.matches {
            out.push_str(&format!(
                " {}/{}",
                self.table.user_name_for(&pair.local),
                join.table.user_name_for(&pair.remote)
            ));
        }

        out
    }
}

/// Splits a join value into table name, optional parenthesized sub-query and
/// match string. Without parentheses the first space separates the table name
/// from the match string.
fn split_join_value(value: &str) -> Option<(&str, Option<&str>, &str)> {
    if let Some(open) = value.find('(') {
        let close = value.rfind(')')?;
        if close < open {
            return None;
        }

        Some((
            value[..open].trim(),
            Some(&value[open + 1..close]),
            &value[close + 1..],
        ))
    } else {
        let space = value.find(' ')?;

        Some((&value[..space], None, &value[space + 1..]))
    }
}
