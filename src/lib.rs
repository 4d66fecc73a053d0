mod engine;
mod error;

pub use engine::query::{Constraint, Join, MatchPair, Query, SortOrder};
pub use engine::sql::{GroupFunction, SqlFragment};
pub use engine::{compile, compile_overview};
pub use error::{Error, ErrorKind};

pub mod schema {
    pub use crate::engine::schema::*;
}
