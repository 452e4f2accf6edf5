//! # Ocean Query
//!
//! Loads ARGO float observations from CSV into PostgreSQL and answers a
//! fixed set of queries over them: sample records, record count, records in
//! a latitude/longitude box, records in a date range, and a dataset summary.
//! Every query answers with the same JSON envelope.
//!
//! # Quick Start
//!
//! ```bash
//! # Check the connection
//! ocean-query check
//!
//! # Replace the table with a CSV file
//! ocean-query load ARGO_2019.csv --yes
//!
//! # Query
//! ocean-query sample --limit 5
//! ocean-query location --lat -10 10 --lon 60 80 --limit 5
//! ocean-query dates --start 2019-01-29 --end 2019-01-30 -f json
//! ocean-query summary
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded from (later wins):
//!
//! 1. Built-in defaults
//! 2. `~/.config/ocean-query/config.toml`
//! 3. `.ocean-query.toml` in current directory
//! 4. Environment variables (`DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`,
//!    `DB_PASSWORD`, `OCEAN_TABLE`), including a `.env` file
//! 5. `--table` on the command line
//!
//! ## Example Configuration
//!
//! ```toml
//! [database]
//! host = "localhost"
//! port = 5432
//! name = "ocean_db"
//! user = "sammy"
//! pool_size = 4
//!
//! [query]
//! table = "argo_data"
//!
//! [columns]
//! time = "datetime"
//! lat = "lat"
//! lon = "lon"
//! depth = "mld"
//! ```
//!
//! # Exit Codes
//!
//! - `0` - Success
//! - `1` - Query answered with `success = false`, failed connection check,
//!   failed self-test, or any other error

use std::process;

use clap::Parser;
use ocean_data_query::{app::run, cli::Cli, logging::init_logging};
use tokio::main;

#[main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
