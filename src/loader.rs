//! CSV to table loader.
//!
//! The whole file is read into memory, a SQL type is inferred for every
//! column and the target table is replaced: dropped, recreated from the
//! inferred schema and filled with a binary `COPY`. The three steps share one
//! transaction, so a failed load leaves the previous table untouched.
//!
//! # Type Inference
//!
//! Each column is inferred independently (in parallel, with [`rayon`]) over
//! its non-missing cells:
//!
//! | Every cell parses as | Column type |
//! |----------------------|-------------|
//! | integer | `BIGINT` |
//! | float | `DOUBLE PRECISION` |
//! | `true` / `false` | `BOOLEAN` |
//! | `YYYY-MM-DD[( \|T)HH:MM:SS[.f]]` | `TIMESTAMP` |
//! | anything else, or no cells at all | `TEXT` |
//!
//! Empty cells and the usual missing-value markers (`NA`, `NaN`, `null`, ...)
//! are stored as `NULL`. No range checks happen at load time.

use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    pin::pin
};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use deadpool_postgres::Pool;
use rayon::prelude::*;
use serde::Serialize;
use tokio_postgres::{
    binary_copy::BinaryCopyInWriter,
    types::{ToSql, Type}
};
use tracing::{error, info};

use crate::{
    config::Config,
    db::build_pool,
    error::{
        AppResult, QueryError, connection_error, csv_error, database_error, file_read_error,
        load_error
    },
    sql
};

/// Cells treated as missing values
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null"
];

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// SQL type chosen for a CSV column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    #[serde(rename = "BIGINT")]
    BigInt,
    #[serde(rename = "DOUBLE PRECISION")]
    Double,
    #[serde(rename = "BOOLEAN")]
    Boolean,
    #[serde(rename = "TIMESTAMP")]
    Timestamp,
    #[serde(rename = "TEXT")]
    Text
}

impl ColumnType {
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::BigInt => "BIGINT",
            Self::Double => "DOUBLE PRECISION",
            Self::Boolean => "BOOLEAN",
            Self::Timestamp => "TIMESTAMP",
            Self::Text => "TEXT"
        }
    }

    pub fn pg_type(self) -> Type {
        match self {
            Self::BigInt => Type::INT8,
            Self::Double => Type::FLOAT8,
            Self::Boolean => Type::BOOL,
            Self::Timestamp => Type::TIMESTAMP,
            Self::Text => Type::TEXT
        }
    }
}

/// Column name with its inferred type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name:        String,
    pub column_type: ColumnType
}

/// CSV file held in memory; `None` marks a missing cell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows:    Vec<Vec<Option<String>>>
}

impl CsvTable {
    /// First `n` rows
    pub fn head(&self, n: usize) -> &[Vec<Option<String>>] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of a successful load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub table:   String,
    pub rows:    u64,
    pub columns: Vec<ColumnSpec>
}

/// Whether a raw cell is a missing value
pub fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell)
}

fn parse_bool(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse a date or date-time cell
pub fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(cell, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Infer the narrowest type accepting every cell
pub fn infer_column<'a, I>(cells: I) -> ColumnType
where
    I: IntoIterator<Item = &'a str>
{
    let mut seen = false;
    let (mut int, mut float, mut boolean, mut timestamp) = (true, true, true, true);
    for cell in cells {
        seen = true;
        int = int && cell.parse::<i64>().is_ok();
        float = float && cell.parse::<f64>().is_ok();
        boolean = boolean && parse_bool(cell).is_some();
        timestamp = timestamp && parse_timestamp(cell).is_some();
        if !(int || float || boolean || timestamp) {
            return ColumnType::Text;
        }
    }
    match (seen, int, float, boolean, timestamp) {
        (false, ..) => ColumnType::Text,
        (_, true, ..) => ColumnType::BigInt,
        (_, _, true, ..) => ColumnType::Double,
        (_, _, _, true, _) => ColumnType::Boolean,
        (_, _, _, _, true) => ColumnType::Timestamp,
        _ => ColumnType::Text
    }
}

/// Infer every column of a table
pub fn infer_schema(table: &CsvTable) -> Vec<ColumnSpec> {
    (0..table.headers.len())
        .into_par_iter()
        .map(|idx| ColumnSpec {
            name:        table.headers[idx].clone(),
            column_type: infer_column(
                table
                    .rows
                    .iter()
                    .filter_map(|row| row.get(idx).and_then(|c| c.as_deref()))
            )
        })
        .collect()
}

/// Blank headers become `Unnamed: {i}`, repeats get a `.{n}` suffix
pub fn normalize_headers<'a, I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let base = if name.is_empty() {
                format!("Unnamed: {}", idx)
            } else {
                name.to_string()
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let unique = if *count == 0 {
                base
            } else {
                format!("{}.{}", base, count)
            };
            *count += 1;
            unique
        })
        .collect()
}

/// Read an entire CSV file
pub fn read_csv(path: &Path) -> AppResult<CsvTable> {
    let display = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(&display, e))?;
    let headers = normalize_headers(
        reader
            .headers()
            .map_err(|e| csv_error(&display, e))?
            .iter()
    );
    if headers.is_empty() {
        return Err(csv_error(
            &display,
            csv::Error::from(io::Error::new(
                io::ErrorKind::InvalidData,
                "file has no header row"
            ))
        ));
    }
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(&display, e))?;
        rows.push(
            record
                .iter()
                .map(|cell| (!is_missing(cell)).then(|| cell.to_string()))
                .collect()
        );
    }
    Ok(CsvTable {
        headers,
        rows
    })
}

/// Typed cell ready for the binary copy
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    BigInt(Option<i64>),
    Double(Option<f64>),
    Boolean(Option<bool>),
    Timestamp(Option<NaiveDateTime>),
    Text(Option<String>)
}

impl Cell {
    fn parse(column_type: ColumnType, raw: Option<&str>) -> Self {
        match column_type {
            ColumnType::BigInt => Self::BigInt(raw.and_then(|s| s.parse().ok())),
            ColumnType::Double => Self::Double(raw.and_then(|s| s.parse().ok())),
            ColumnType::Boolean => Self::Boolean(raw.and_then(parse_bool)),
            ColumnType::Timestamp => Self::Timestamp(raw.and_then(parse_timestamp)),
            ColumnType::Text => Self::Text(raw.map(str::to_string))
        }
    }

    fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            Self::BigInt(v) => v,
            Self::Double(v) => v,
            Self::Boolean(v) => v,
            Self::Timestamp(v) => v,
            Self::Text(v) => v
        }
    }
}

/// Loads CSV files into PostgreSQL tables
pub struct CsvLoader {
    pool: Pool
}

impl CsvLoader {
    /// Build the loader's pool; connects lazily on first use
    pub fn new(config: &Config) -> Result<Self, QueryError> {
        Ok(Self {
            pool: build_pool(&config.database)?
        })
    }

    /// Read `path` and replace `table` with its contents
    pub async fn load(&self, path: &Path, table: &str) -> AppResult<LoadReport> {
        let path_str = path.display().to_string();
        if !path.exists() {
            error!(path = %path_str, "CSV file not found");
            return Err(file_read_error(
                &path_str,
                io::Error::new(io::ErrorKind::NotFound, "CSV file not found")
            ));
        }
        info!(path = %path_str, "reading CSV");
        let csv = read_csv(path)?;
        info!(rows = csv.len(), columns = ?csv.headers, "parsed CSV");
        self.load_table(&csv, table).await
    }

    /// Replace `table` with an already parsed CSV
    pub async fn load_table(&self, csv: &CsvTable, table: &str) -> AppResult<LoadReport> {
        let columns = infer_schema(csv);
        let rows = self
            .replace_table(table, &columns, csv)
            .await
            .map_err(|e| load_error(table, e))?;
        info!(table, rows, "table replaced");
        Ok(LoadReport {
            table: table.to_string(),
            rows,
            columns
        })
    }

    async fn replace_table(
        &self,
        table: &str,
        columns: &[ColumnSpec],
        csv: &CsvTable
    ) -> Result<u64, QueryError> {
        let mut object = self.pool.get().await.map_err(connection_error)?;
        let client: &mut tokio_postgres::Client = &mut object;
        let tx = client.transaction().await.map_err(database_error)?;

        tx.batch_execute(&sql::drop_table(table))
            .await
            .map_err(database_error)?;
        let create = sql::create_table(
            table,
            columns
                .iter()
                .map(|c| (c.name.as_str(), c.column_type.sql_name()))
        );
        tx.batch_execute(&create).await.map_err(database_error)?;

        let copy = sql::copy_in(table, columns.iter().map(|c| c.name.as_str()));
        let sink = tx.copy_in(copy.as_str()).await.map_err(database_error)?;
        let types: Vec<Type> = columns.iter().map(|c| c.column_type.pg_type()).collect();
        let mut writer = pin!(BinaryCopyInWriter::new(sink, &types));
        for row in &csv.rows {
            let cells: Vec<Cell> = columns
                .iter()
                .enumerate()
                .map(|(idx, spec)| {
                    Cell::parse(spec.column_type, row.get(idx).and_then(|c| c.as_deref()))
                })
                .collect();
            let values: Vec<&(dyn ToSql + Sync)> = cells.iter().map(Cell::as_sql).collect();
            writer
                .as_mut()
                .write(&values)
                .await
                .map_err(database_error)?;
        }
        let written = writer.as_mut().finish().await.map_err(database_error)?;

        tx.commit().await.map_err(database_error)?;
        Ok(written)
    }

    /// Whether `table` exists in the `public` schema
    pub async fn table_exists(&self, table: &str) -> Result<bool, QueryError> {
        let client = self.pool.get().await.map_err(connection_error)?;
        let row = client
            .query_one(sql::TABLE_EXISTS, &[&table])
            .await
            .map_err(database_error)?;
        row.try_get(0).map_err(database_error)
    }
}

/// Load `csv_path` into `table`; logs and returns `false` on any failure
pub async fn load_argo_data(config: &Config, csv_path: impl Into<PathBuf>, table: &str) -> bool {
    let path = csv_path.into();
    let loader = match CsvLoader::new(config) {
        Ok(loader) => loader,
        Err(e) => {
            error!(error = %e, "could not prepare loader");
            return false;
        }
    };
    match loader.load(&path, table).await {
        Ok(report) => {
            info!(table = %report.table, rows = report.rows, "data successfully loaded");
            true
        }
        Err(e) => {
            error!(error = %e, path = %path.display(), "error loading data");
            false
        }
    }
}
