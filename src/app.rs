//! Application logic for the `ocean-query` CLI.
//!
//! Kept apart from the binary entry point so command dispatch and its
//! helpers can be tested.

mod commands;
mod convert;
mod helpers;
mod selftest;

pub use commands::{PREVIEW_ROWS, print_envelope, run_check, run_config, run_load, run_selftest_command};
pub use convert::{convert_format, create_output_options};
pub use helpers::{confirm, confirm_with, envelope_exit_code, is_affirmative, spinner};
pub use selftest::{CheckOutcome, SelfTestReport, format_selftest_report, run_selftest};

use crate::{
    cli::{Cli, Commands, range},
    config::Config,
    error::AppResult,
    service::OceanDataQuery
};

/// Run a parsed command line and return the process exit code
pub async fn run(cli: Cli) -> AppResult<i32> {
    let config = Config::load()?.with_table(cli.table.clone());
    let opts = create_output_options(cli.format, cli.no_color, cli.verbose);

    match cli.command {
        Commands::Check => run_check(&config, &opts).await,
        Commands::Load {
            csv,
            yes
        } => run_load(&config, &csv, yes, &opts).await,
        Commands::Config => Ok(run_config(&config, &opts)),
        Commands::Selftest => run_selftest_command(&config, &opts).await,
        Commands::Sample {
            limit
        } => {
            let service = OceanDataQuery::connect(&config).await?;
            let envelope = service.get_sample_data(limit).await;
            Ok(print_envelope("Sample data", &envelope, &opts))
        }
        Commands::Count => {
            let service = OceanDataQuery::connect(&config).await?;
            let envelope = service.get_data_count().await;
            Ok(print_envelope("Data count", &envelope, &opts))
        }
        Commands::Location {
            lat,
            lon,
            limit
        } => {
            let service = OceanDataQuery::connect(&config).await?;
            let envelope = service
                .query_by_location(range(&lat), range(&lon), limit)
                .await;
            Ok(print_envelope("Location query", &envelope, &opts))
        }
        Commands::Dates {
            start,
            end,
            limit
        } => {
            let service = OceanDataQuery::connect(&config).await?;
            let envelope = service.query_by_date_range(start, end, limit).await;
            Ok(print_envelope("Date range query", &envelope, &opts))
        }
        Commands::Summary => {
            let service = OceanDataQuery::connect(&config).await?;
            let envelope = service.get_data_summary().await;
            Ok(print_envelope("Data summary", &envelope, &opts))
        }
    }
}
