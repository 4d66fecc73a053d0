mod args;

use args::ProgramArgs;
use clap::Parser;
use colonnade::schema::Catalog;
use colonnade::Error;
use std::fs;

fn main() -> Result<(), Error> {
    env_logger::init();

    let args = ProgramArgs::parse();

    let catalog: Catalog = serde_json::from_reader(fs::File::open(&args.catalog)?)?;

    let fragment = if args.overview {
        colonnade::compile_overview(&args.query, &catalog, &args.table)?
    } else {
        colonnade::compile(&args.query, &catalog, &args.table)?
    };

    let (sql, sql_args) = fragment.into_parts();
    println!("{}", sql);
    for arg in sql_args {
        println!("  ? = {}", arg);
    }

    Ok(())
}
