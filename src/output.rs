use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

use crate::{
    config::ConnectionParams,
    db::ServerInfo,
    envelope::Envelope,
    loader::{CsvTable, LoadReport}
};

/// Records shown in text mode unless verbose
const PREVIEW_RECORDS: usize = 2;

const SEPARATOR: &str = "==================================================";

/// Output format for results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool,
    pub verbose: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true,
            verbose: false
        }
    }
}

fn paint(text: &str, opts: &OutputOptions, style: fn(&str) -> colored::ColoredString) -> String {
    if opts.colored {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

fn serialized<T: Serialize>(value: &T, format: OutputFormat) -> Option<String> {
    match format {
        OutputFormat::Json => Some(serde_json::to_string_pretty(value).unwrap_or_default()),
        OutputFormat::Yaml => Some(serde_yaml::to_string(value).unwrap_or_default()),
        OutputFormat::Text => None
    }
}

/// `✓ text` or `✗ text`
pub fn banner(ok: bool, text: &str, colored: bool) -> String {
    match (ok, colored) {
        (true, true) => format!("{} {}", "✓".green().bold(), text),
        (false, true) => format!("{} {}", "✗".red().bold(), text),
        (true, false) => format!("✓ {}", text),
        (false, false) => format!("✗ {}", text)
    }
}

/// Section header used by the text formatter
pub fn heading(title: &str, opts: &OutputOptions) -> String {
    let line = paint(SEPARATOR, opts, |s| s.dimmed());
    format!("{}\n{}\n{}\n", line, paint(title, opts, |s| s.bold()), line)
}

/// Format an operation's envelope
pub fn format_envelope<T: Serialize>(title: &str, envelope: &Envelope<T>, opts: &OutputOptions) -> String {
    if let Some(out) = serialized(envelope, opts.format) {
        return out;
    }

    let mut output = heading(title, opts);
    let status = if envelope.success {
        paint("true", opts, |s| s.green())
    } else {
        paint("false", opts, |s| s.red())
    };
    output.push_str(&format!("Success: {}\n", status));
    output.push_str(&format!("Message: {}\n", envelope.message));

    if let Some(metadata) = &envelope.metadata
        && let Ok(Value::Object(fields)) = serde_json::to_value(metadata)
    {
        output.push_str("Metadata:\n");
        for (key, value) in &fields {
            output.push_str(&format!("  {}: {}\n", key, inline(value)));
        }
    }

    let data = serde_json::to_value(&envelope.data).unwrap_or(Value::Null);
    output.push_str(&format_data(&data, opts));
    output.push_str(&format!("Timestamp: {}\n", envelope.timestamp));
    output
}

fn inline(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string()
    }
}

fn format_data(data: &Value, opts: &OutputOptions) -> String {
    match data {
        Value::Array(items) if items.is_empty() => "Data: (no records)\n".to_string(),
        Value::Array(items) => {
            let shown = if opts.verbose {
                items.len()
            } else {
                items.len().min(PREVIEW_RECORDS)
            };
            let mut out = format!("Data: {} records\n", items.len());
            for (i, item) in items.iter().take(shown).enumerate() {
                let label = format!("  Record {}:", i + 1);
                out.push_str(&paint(&label, opts, |s| s.cyan()));
                out.push('\n');
                out.push_str(&indent(&serde_json::to_string_pretty(item).unwrap_or_default(), 4));
            }
            if shown < items.len() {
                out.push_str(&format!("  ... {} more (use -v to show all)\n", items.len() - shown));
            }
            out
        }
        Value::Object(fields) if fields.is_empty() => "Data: {}\n".to_string(),
        other => format!(
            "Data:\n{}",
            indent(&serde_json::to_string_pretty(other).unwrap_or_default(), 2)
        )
    }
}

fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines().map(|line| format!("{}{}\n", pad, line)).collect()
}

/// Format the header and first rows of a CSV file before loading
pub fn format_csv_preview(path: &str, csv: &CsvTable, shown: usize, opts: &OutputOptions) -> String {
    let mut output = heading(&format!("Preview of {}", path), opts);
    output.push_str(&format!("Rows: {}\n", csv.len()));
    output.push_str(&format!("Columns: {}\n\n", csv.headers.join(", ")));

    let rows: Vec<Vec<&str>> = csv
        .head(shown)
        .iter()
        .map(|row| row.iter().map(|c| c.as_deref().unwrap_or("NULL")).collect())
        .collect();
    let widths: Vec<usize> = csv
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |cells: &[&str]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
    };
    let header: Vec<&str> = csv.headers.iter().map(String::as_str).collect();
    output.push_str(&paint(render(header.as_slice()).trim_end(), opts, |s| s.bold()));
    output.push('\n');
    for row in &rows {
        output.push_str(render(row.as_slice()).trim_end());
        output.push('\n');
    }
    output
}

/// Format the outcome of a table load
pub fn format_load_report(report: &LoadReport, opts: &OutputOptions) -> String {
    if let Some(out) = serialized(report, opts.format) {
        return out;
    }
    let mut output = banner(
        true,
        &format!("Loaded {} rows into '{}'", report.rows, report.table),
        opts.colored
    );
    output.push('\n');
    for column in &report.columns {
        output.push_str(&format!("  {}: {}\n", column.name, column.column_type.sql_name()));
    }
    output
}

/// Format connection check results
pub fn format_server_info(info: &ServerInfo, opts: &OutputOptions) -> String {
    if let Some(out) = serialized(info, opts.format) {
        return out;
    }
    let mut output = banner(true, "Database connection successful", opts.colored);
    output.push('\n');
    output.push_str(&format!("  PostgreSQL version: {}\n", info.version));
    output.push_str(&format!("  Connected to database: {}\n", info.database));
    output.push_str(&format!("  Connected as user: {}\n", info.user));
    output
}

/// Likely causes printed after a failed connection check
pub fn format_connection_help(opts: &OutputOptions) -> String {
    let mut output = paint("Please check:", opts, |s| s.yellow());
    output.push('\n');
    for hint in [
        "PostgreSQL is running",
        "The database exists",
        "The user has the correct permissions",
        "The password is correct",
        "DB_HOST, DB_PORT, DB_NAME, DB_USER and DB_PASSWORD are set as intended"
    ] {
        output.push_str(&format!("  - {}\n", hint));
    }
    output
}

#[derive(Serialize)]
struct ResolvedConnection<'a> {
    params: &'a ConnectionParams,
    url:    &'a str
}

/// Format resolved connection parameters; callers pass redacted values
pub fn format_connection_params(params: &ConnectionParams, url: &str, opts: &OutputOptions) -> String {
    if let Some(out) = serialized(
        &ResolvedConnection {
            params,
            url
        },
        opts.format
    ) {
        return out;
    }
    let mut output = heading("Database configuration", opts);
    output.push_str(&format!("  host: {}\n", params.host));
    output.push_str(&format!("  port: {}\n", params.port));
    output.push_str(&format!("  database: {}\n", params.database));
    output.push_str(&format!("  user: {}\n", params.user));
    output.push_str(&format!("  password: {}\n", params.password));
    output.push_str(&format!("  url: {}\n", url));
    output
}
