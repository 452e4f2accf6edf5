//! Subcommand handlers.
//!
//! Each handler prints its own output and returns the process exit code.

use std::path::Path;

use tracing::info;

use super::{
    helpers::{confirm, envelope_exit_code, spinner},
    selftest::{format_selftest_report, run_selftest}
};
use crate::{
    config::Config,
    db::check_connection,
    envelope::Envelope,
    error::{AppResult, file_read_error},
    loader::{CsvLoader, read_csv},
    output::{
        OutputOptions, banner, format_connection_help, format_connection_params,
        format_csv_preview, format_envelope, format_load_report, format_server_info
    },
    service::OceanDataQuery
};

/// Rows shown before the load prompt
pub const PREVIEW_ROWS: usize = 5;

/// Print an envelope and map its flag to an exit code
pub fn print_envelope<T: serde::Serialize>(title: &str, envelope: &Envelope<T>, opts: &OutputOptions) -> i32 {
    println!("{}", format_envelope(title, envelope, opts));
    envelope_exit_code(envelope.success)
}

/// `check`: connection over the URL and over the pool
pub async fn run_check(config: &Config, opts: &OutputOptions) -> AppResult<i32> {
    match check_connection(&config.database).await {
        Ok(server) => {
            println!("{}", format_server_info(&server, opts));
            Ok(0)
        }
        Err(e) => {
            eprintln!("{}", banner(false, &e.to_string(), opts.colored));
            eprintln!("{}", format_connection_help(opts));
            Ok(1)
        }
    }
}

/// `load`: preview, confirm, replace the table
pub async fn run_load(config: &Config, path: &Path, assume_yes: bool, opts: &OutputOptions) -> AppResult<i32> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(file_read_error(
            &display,
            std::io::Error::new(std::io::ErrorKind::NotFound, "CSV file not found")
        ));
    }

    let csv = read_csv(path)?;
    println!("{}", format_csv_preview(&display, &csv, PREVIEW_ROWS, opts));

    if !assume_yes && !confirm("Would you like to load this data into the database?")? {
        println!("Data loading cancelled.");
        return Ok(0);
    }

    let table = config.query.table.as_str();
    let loader = CsvLoader::new(config)?;
    let pb = spinner(&format!("Loading {} rows into '{}'...", csv.len(), table));
    let result = loader.load_table(&csv, table).await;
    pb.finish_and_clear();

    let report = result?;
    info!(table, rows = report.rows, "load finished");
    println!("{}", format_load_report(&report, opts));
    Ok(0)
}

/// `selftest`: every operation plus the error paths
pub async fn run_selftest_command(config: &Config, opts: &OutputOptions) -> AppResult<i32> {
    let service = OceanDataQuery::connect(config).await?;
    let report = run_selftest(&service).await;
    println!("{}", format_selftest_report(&report, opts));
    Ok(report.exit_code())
}

/// `config`: resolved settings with the password masked
pub fn run_config(config: &Config, opts: &OutputOptions) -> i32 {
    let params = config.database.connection_params().redacted();
    println!(
        "{}",
        format_connection_params(&params, &config.database.redacted_url(), opts)
    );
    0
}
