//! SQL statement builders.
//!
//! Identifiers (table and column names) come from configuration or CSV
//! headers, so they are always emitted as double-quoted identifiers through
//! [`sqlparser`]'s [`Ident`] rendering. Values are never interpolated: every
//! statement uses `$n` placeholders.
//!
//! # Example
//!
//! ```
//! use ocean_data_query::{config::ColumnMap, sql::Statements};
//!
//! let stmts = Statements::new("argo_data", &ColumnMap::default());
//! assert_eq!(
//!     stmts.sample(),
//!     r#"SELECT * FROM "argo_data" ORDER BY "datetime" LIMIT $1"#
//! );
//! ```

use sqlparser::ast::Ident;

use crate::config::ColumnMap;

/// Quote a single identifier with double quotes, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    Ident::with_quote('"', name).to_string()
}

/// Pre-quoted names for one table, producing each statement the query
/// service runs
#[derive(Debug, Clone)]
pub struct Statements {
    table: String,
    time:  String,
    lat:   String,
    lon:   String,
    depth: String
}

impl Statements {
    pub fn new(table: &str, columns: &ColumnMap) -> Self {
        Self {
            table: quote_ident(table),
            time:  quote_ident(&columns.time),
            lat:   quote_ident(&columns.lat),
            lon:   quote_ident(&columns.lon),
            depth: quote_ident(&columns.depth)
        }
    }

    /// `$1` = limit
    pub fn sample(&self) -> String {
        format!(
            "SELECT * FROM {} ORDER BY {} LIMIT $1",
            self.table, self.time
        )
    }

    pub fn count(&self) -> String {
        format!("SELECT COUNT(*) AS total_records FROM {}", self.table)
    }

    /// `$1..$2` = latitude bounds, `$3..$4` = longitude bounds, `$5` = limit
    pub fn location(&self) -> String {
        format!(
            "SELECT * FROM {table} \
             WHERE {lat} BETWEEN $1::float8 AND $2::float8 \
             AND {lon} BETWEEN $3::float8 AND $4::float8 \
             ORDER BY {time} LIMIT $5",
            table = self.table,
            lat = self.lat,
            lon = self.lon,
            time = self.time
        )
    }

    /// `$1` = start, `$2` = end, `$3` = limit; both bounds are midnight of
    /// their day, so `end` only matches `end 00:00:00`
    pub fn date_range(&self) -> String {
        format!(
            "SELECT * FROM {table} \
             WHERE {time}::timestamp BETWEEN $1::date AND $2::date \
             ORDER BY {time} LIMIT $3",
            table = self.table,
            time = self.time
        )
    }

    /// Single-row aggregate over the rows that have a depth value
    pub fn summary(&self) -> String {
        format!(
            "SELECT \
             COUNT(*) AS total_records, \
             MIN({lat})::float8 AS min_latitude, \
             MAX({lat})::float8 AS max_latitude, \
             MIN({lon})::float8 AS min_longitude, \
             MAX({lon})::float8 AS max_longitude, \
             MIN({time}::timestamp)::text AS earliest_date, \
             MAX({time}::timestamp)::text AS latest_date, \
             AVG({depth})::float8 AS avg_mixed_layer_depth, \
             MIN({depth})::float8 AS min_mixed_layer_depth, \
             MAX({depth})::float8 AS max_mixed_layer_depth, \
             COUNT(DISTINCT {time}) AS unique_dates \
             FROM {table} \
             WHERE {depth} IS NOT NULL",
            table = self.table,
            lat = self.lat,
            lon = self.lon,
            time = self.time,
            depth = self.depth
        )
    }

    /// Record counts per (year, month) over all rows, first twelve months in
    /// order; rows without a time are left out
    pub fn temporal_distribution(&self) -> String {
        format!(
            "SELECT \
             EXTRACT(YEAR FROM {time}::date)::int4 AS year, \
             EXTRACT(MONTH FROM {time}::date)::int4 AS month, \
             COUNT(*) AS record_count \
             FROM {table} \
             WHERE {time} IS NOT NULL \
             GROUP BY 1, 2 \
             ORDER BY 1, 2 \
             LIMIT 12",
            table = self.table,
            time = self.time
        )
    }
}

/// `$1` = table name
pub const TABLE_EXISTS: &str = "SELECT EXISTS (\
     SELECT 1 FROM information_schema.tables \
     WHERE table_schema = 'public' AND table_name = $1)";

/// Liveness probe run by the fail-fast constructor
pub const PING: &str = "SELECT 1";

pub const SERVER_VERSION: &str = "SELECT version()";

pub const SESSION_IDENTITY: &str = "SELECT current_database(), current_user::text";

/// `DROP TABLE IF EXISTS`
pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

/// `CREATE TABLE` from `(name, sql type)` pairs
pub fn create_table<'a, I>(table: &str, columns: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>
{
    let defs: Vec<String> = columns
        .into_iter()
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty))
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(table), defs.join(", "))
}

/// Binary `COPY ... FROM STDIN` for the listed columns
pub fn copy_in<'a, I>(table: &str, columns: I) -> String
where
    I: IntoIterator<Item = &'a str>
{
    let cols: Vec<String> = columns.into_iter().map(quote_ident).collect();
    format!(
        "COPY {} ({}) FROM STDIN (FORMAT binary)",
        quote_ident(table),
        cols.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use sqlparser::{dialect::PostgreSqlDialect, parser::Parser};

    use super::*;

    fn parses(sql: &str) -> bool {
        Parser::parse_sql(&PostgreSqlDialect {}, sql).is_ok()
    }

    fn stmts() -> Statements {
        Statements::new("argo_data", &ColumnMap::default())
    }

    #[test]
    fn test_quote_ident_plain_and_embedded_quote() {
        assert_eq!(quote_ident("argo_data"), "\"argo_data\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_row_queries_parse_as_postgres() {
        let s = stmts();
        for sql in [s.sample(), s.count(), s.location(), s.date_range()] {
            assert!(parses(&sql), "failed to parse: {}", sql);
        }
    }

    #[test]
    fn test_aggregate_queries_parse_as_postgres() {
        let s = stmts();
        assert!(parses(&s.summary()));
        assert!(parses(&s.temporal_distribution()));
        assert!(parses(TABLE_EXISTS));
    }

    #[test]
    fn test_row_queries_order_by_time() {
        let s = stmts();
        for sql in [s.sample(), s.location(), s.date_range()] {
            assert!(sql.contains("ORDER BY \"datetime\""));
        }
    }

    #[test]
    fn test_location_uses_placeholders_only() {
        let sql = stmts().location();
        assert!(sql.contains("\"lat\" BETWEEN $1::float8 AND $2::float8"));
        assert!(sql.contains("\"lon\" BETWEEN $3::float8 AND $4::float8"));
        assert!(sql.ends_with("LIMIT $5"));
    }

    #[test]
    fn test_date_range_bounds_are_inclusive_midnights() {
        let sql = stmts().date_range();
        assert!(sql.contains("\"datetime\"::timestamp BETWEEN $1::date AND $2::date"));
        assert!(!sql.contains("+ 1"));
        assert!(sql.ends_with("LIMIT $3"));
    }

    #[test]
    fn test_summary_covers_rows_with_depth() {
        let sql = stmts().summary();
        assert!(sql.ends_with("WHERE \"mld\" IS NOT NULL"));
        assert!(sql.contains("COUNT(DISTINCT \"datetime\") AS unique_dates"));
        assert!(!stmts().temporal_distribution().contains("mld"));
    }

    #[test]
    fn test_temporal_distribution_capped_at_twelve() {
        let sql = stmts().temporal_distribution();
        assert!(sql.contains("WHERE \"datetime\" IS NOT NULL"));
        assert!(sql.contains("ORDER BY 1, 2"));
        assert!(sql.ends_with("LIMIT 12"));
    }

    #[test]
    fn test_custom_columns_are_used() {
        let columns = ColumnMap {
            time:  "obs_time".into(),
            lat:   "latitude".into(),
            lon:   "longitude".into(),
            depth: "mixed_layer".into()
        };
        let s = Statements::new("floats", &columns);
        assert!(s.summary().contains("AVG(\"mixed_layer\")"));
        assert!(s.location().contains("\"latitude\" BETWEEN"));
        assert!(s.sample().contains("FROM \"floats\" ORDER BY \"obs_time\""));
    }

    #[test]
    fn test_ddl_builders() {
        assert_eq!(drop_table("argo_data"), "DROP TABLE IF EXISTS \"argo_data\"");
        let create = create_table("argo_data", [("lat", "DOUBLE PRECISION"), ("id", "BIGINT")]);
        assert_eq!(
            create,
            "CREATE TABLE \"argo_data\" (\"lat\" DOUBLE PRECISION, \"id\" BIGINT)"
        );
        assert!(parses(&create));
        assert_eq!(
            copy_in("argo_data", ["lat", "id"]),
            "COPY \"argo_data\" (\"lat\", \"id\") FROM STDIN (FORMAT binary)"
        );
    }
}
