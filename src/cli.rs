use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::service::{DEFAULT_FILTER_LIMIT, DEFAULT_SAMPLE_LIMIT};

/// Ocean Query - Load ARGO float data into PostgreSQL and query it
#[derive(Parser, Debug)]
#[command(name = "ocean-query")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Table to load into and query
    #[arg(long, global = true, env = "OCEAN_TABLE")]
    pub table: Option<String>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "text", global = true)]
    pub format: Format,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test the database connection
    Check,

    /// Load a CSV file into the table, replacing its contents
    Load {
        /// Path to the CSV file
        #[arg(default_value = "ARGO_2019.csv")]
        csv: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool
    },

    /// Show sample records ordered by time
    Sample {
        /// Number of records (1 to 1,000)
        #[arg(short, long, default_value_t = DEFAULT_SAMPLE_LIMIT, allow_negative_numbers = true)]
        limit: i64
    },

    /// Count records in the table
    Count,

    /// Records inside a latitude/longitude box
    Location {
        /// Latitude range
        #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], allow_negative_numbers = true, required = true)]
        lat: Vec<f64>,

        /// Longitude range
        #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], allow_negative_numbers = true, required = true)]
        lon: Vec<f64>,

        /// Maximum records (1 to 10,000)
        #[arg(short, long, default_value_t = DEFAULT_FILTER_LIMIT, allow_negative_numbers = true)]
        limit: i64
    },

    /// Records timed from start 00:00 up to and including end 00:00
    Dates {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD), matched at midnight
        #[arg(long)]
        end: String,

        /// Maximum records (1 to 10,000)
        #[arg(short, long, default_value_t = DEFAULT_FILTER_LIMIT, allow_negative_numbers = true)]
        limit: i64
    },

    /// Dataset statistics
    Summary,

    /// Run every query and its error paths against the database
    Selftest,

    /// Show the resolved connection settings
    Config
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
    Yaml
}

/// Two-element range argument as a tuple
pub fn range(values: &[f64]) -> (f64, f64) {
    match values {
        [min, max, ..] => (*min, *max),
        [only] => (*only, *only),
        [] => (f64::NAN, f64::NAN)
    }
}
