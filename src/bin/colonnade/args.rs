use clap::Parser;
use std::path::PathBuf;

// The /// docs are converted into --help text.
/// Compiles a colon query against a saved table catalog and prints the
/// parameterized SQL together with its arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct ProgramArgs {
    /// Path to the catalog JSON file describing the available tables
    pub catalog: PathBuf,
    /// The table the query filters, by display name
    pub table: String,
    /// The query text, e.g. "name:john join:Households hh_id/household_ref"
    pub query: String,
    /// Collapse the result to one representative row per prime-column group
    #[arg(long)]
    pub overview: bool,
}
