//! Query service over the observations table.
//!
//! [`OceanDataQuery::connect`] fails fast: it checks out a connection and
//! runs `SELECT 1` before handing back an instance, so a caller never holds
//! a service bound to an unreachable database.
//!
//! The five public operations never return an error. Each one validates its
//! input, runs one parameterized statement (two for the summary) on a pooled
//! connection, normalizes the rows and wraps everything in an
//! [`Envelope`]. Any failure on the way becomes a `success = false`
//! envelope whose message carries the error text.
//!
//! # Example
//!
//! ```no_run
//! use ocean_data_query::{config::Config, service::OceanDataQuery};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let query = OceanDataQuery::connect(&Config::load()?).await?;
//! let indian_ocean = query
//!     .query_by_location((-10.0, 10.0), (60.0, 80.0), 5)
//!     .await;
//! println!("{}", indian_ocean.message);
//! # Ok(())
//! # }
//! ```

use deadpool_postgres::{Object, Pool};
use tokio_postgres::{Row, types::ToSql};
use tracing::{debug, error, info};

use crate::{
    config::{ColumnMap, Config},
    db::build_pool,
    envelope::{
        Bounds, CountData, DateFilters, DateSpan, DatasetOverview, DepthStats, Envelope,
        GeographicExtent, LocationFilters, Metadata, MonthlyCount, RecordsEnvelope,
        SummaryData, SummaryPayload, now_iso
    },
    error::{QueryError, connection_error, database_error},
    record::{result_columns, rows_to_records},
    sql::{PING, Statements},
    validate::{
        DateInput, FILTER_LIMIT_MAX, SAMPLE_LIMIT_MAX, group_thousands, validate_coordinates,
        validate_dates, validate_limit
    }
};

/// Default row count for `get_sample_data`
pub const DEFAULT_SAMPLE_LIMIT: i64 = 5;
/// Default row count for the filtered queries
pub const DEFAULT_FILTER_LIMIT: i64 = 100;

/// Read-only query service bound to one table
pub struct OceanDataQuery {
    pool:       Pool,
    table:      String,
    statements: Statements
}

impl OceanDataQuery {
    /// Build the pool and probe it; errors if the database is unreachable
    pub async fn connect(config: &Config) -> Result<Self, QueryError> {
        let pool = build_pool(&config.database)?;
        let service = Self::with_pool(pool, &config.query.table, &config.columns);
        let client = service.checkout().await?;
        client
            .simple_query(PING)
            .await
            .map_err(|e| connection_error(database_error(e)))?;
        info!(
            host = %config.database.host,
            database = %config.database.name,
            table = %service.table,
            "connected to database"
        );
        Ok(service)
    }

    /// Wrap an existing pool without probing it
    pub(crate) fn with_pool(pool: Pool, table: &str, columns: &ColumnMap) -> Self {
        Self {
            pool,
            table: table.to_string(),
            statements: Statements::new(table, columns)
        }
    }

    /// Table this service reads
    pub fn table_name(&self) -> &str {
        &self.table
    }

    async fn checkout(&self) -> Result<Object, QueryError> {
        self.pool.get().await.map_err(connection_error)
    }

    async fn fetch(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)]
    ) -> Result<Vec<Row>, QueryError> {
        debug!(%sql, params = params.len(), "executing query");
        let client = self.checkout().await?;
        client.query(sql, params).await.map_err(database_error)
    }

    async fn fetch_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)]
    ) -> Result<Row, QueryError> {
        debug!(%sql, params = params.len(), "executing query");
        let client = self.checkout().await?;
        client.query_one(sql, params).await.map_err(database_error)
    }

    /// Up to `limit` records ordered by time, `1 <= limit <= 1000`
    pub async fn get_sample_data(&self, limit: i64) -> RecordsEnvelope {
        match self.try_sample_data(limit).await {
            Ok(envelope) => envelope,
            Err(e) => fail(Vec::new(), "Error retrieving sample data", &e)
        }
    }

    async fn try_sample_data(&self, limit: i64) -> Result<RecordsEnvelope, QueryError> {
        validate_limit(limit, SAMPLE_LIMIT_MAX)?;
        let rows = self.fetch(&self.statements.sample(), &[&limit]).await?;
        let records = rows_to_records(&rows);
        let metadata = Metadata::SampleData {
            limit,
            returned_records: records.len(),
            columns: result_columns(&rows)
        };
        let message = format!("Retrieved {} sample records", records.len());
        Ok(Envelope::ok(records, message, metadata))
    }

    /// Total row count of the table
    pub async fn get_data_count(&self) -> Envelope<CountData> {
        match self.try_data_count().await {
            Ok(envelope) => envelope,
            Err(e) => fail(CountData::default(), "Error counting records", &e)
        }
    }

    async fn try_data_count(&self) -> Result<Envelope<CountData>, QueryError> {
        let row = self.fetch_one(&self.statements.count(), &[]).await?;
        let total_records: i64 = row.try_get(0).map_err(database_error)?;
        let metadata = Metadata::DataCount {
            table_name: self.table.clone()
        };
        let message = format!(
            "Total records in {}: {}",
            self.table,
            group_thousands(total_records)
        );
        Ok(Envelope::ok(
            CountData {
                total_records
            },
            message,
            metadata
        ))
    }

    /// Records inside a latitude/longitude box, ordered by time
    pub async fn query_by_location(
        &self,
        lat_range: (f64, f64),
        lon_range: (f64, f64),
        limit: i64
    ) -> RecordsEnvelope {
        match self.try_location(lat_range, lon_range, limit).await {
            Ok(envelope) => envelope,
            Err(e) => fail(Vec::new(), "Error querying by location", &e)
        }
    }

    async fn try_location(
        &self,
        lat_range: (f64, f64),
        lon_range: (f64, f64),
        limit: i64
    ) -> Result<RecordsEnvelope, QueryError> {
        validate_coordinates(lat_range, lon_range)?;
        validate_limit(limit, FILTER_LIMIT_MAX)?;
        let (min_lat, max_lat) = lat_range;
        let (min_lon, max_lon) = lon_range;
        let rows = self
            .fetch(
                &self.statements.location(),
                &[&min_lat, &max_lat, &min_lon, &max_lon, &limit]
            )
            .await?;
        let records = rows_to_records(&rows);
        let metadata = Metadata::LocationFilter {
            filters: LocationFilters {
                latitude_range:  lat_range,
                longitude_range: lon_range
            },
            limit,
            returned_records: records.len(),
            columns: result_columns(&rows)
        };
        let message = format!("Retrieved {} records for location query", records.len());
        Ok(Envelope::ok(records, message, metadata))
    }

    /// Records timed from `start 00:00` through `end 00:00`, ordered by time
    pub async fn query_by_date_range(
        &self,
        start: impl Into<DateInput>,
        end: impl Into<DateInput>,
        limit: i64
    ) -> RecordsEnvelope {
        let (start, end) = (start.into(), end.into());
        match self.try_date_range(&start, &end, limit).await {
            Ok(envelope) => envelope,
            Err(e) => fail(Vec::new(), "Error querying by date range", &e)
        }
    }

    async fn try_date_range(
        &self,
        start: &DateInput,
        end: &DateInput,
        limit: i64
    ) -> Result<RecordsEnvelope, QueryError> {
        let (start_date, end_date) = validate_dates(start, end)?;
        validate_limit(limit, FILTER_LIMIT_MAX)?;
        let rows = self
            .fetch(
                &self.statements.date_range(),
                &[&start_date, &end_date, &limit]
            )
            .await?;
        let records = rows_to_records(&rows);
        let start_str = start_date.format("%Y-%m-%d").to_string();
        let end_str = end_date.format("%Y-%m-%d").to_string();
        let message = format!(
            "Retrieved {} records for date range {} to {}",
            records.len(),
            start_str,
            end_str
        );
        let metadata = Metadata::DateRangeFilter {
            filters: DateFilters {
                start_date: start_str,
                end_date:   end_str
            },
            limit,
            returned_records: records.len(),
            columns: result_columns(&rows)
        };
        Ok(Envelope::ok(records, message, metadata))
    }

    /// Dataset overview: extent, depth statistics, monthly distribution
    pub async fn get_data_summary(&self) -> Envelope<SummaryPayload> {
        match self.try_summary().await {
            Ok(envelope) => envelope,
            Err(e) => fail(SummaryPayload::Empty {}, "Error generating data summary", &e)
        }
    }

    async fn try_summary(&self) -> Result<Envelope<SummaryPayload>, QueryError> {
        let client = self.checkout().await?;
        let summary_sql = self.statements.summary();
        debug!(sql = %summary_sql, "executing summary query");
        let row = client
            .query_one(summary_sql.as_str(), &[])
            .await
            .map_err(database_error)?;
        let temporal_sql = self.statements.temporal_distribution();
        debug!(sql = %temporal_sql, "executing temporal distribution query");
        let monthly = client
            .query(temporal_sql.as_str(), &[])
            .await
            .map_err(database_error)?;
        drop(client);

        let data = summarize(SummaryAggregates::from_row(&row)?, monthly_counts(&monthly)?);
        let metadata = Metadata::DataSummary {
            generated_at: now_iso(),
            table_name:   self.table.clone()
        };
        Ok(Envelope::ok(
            SummaryPayload::Summary(data),
            "Dataset summary generated successfully",
            metadata
        ))
    }
}

fn fail<T>(data: T, context: &str, err: &QueryError) -> Envelope<T> {
    if err.is_validation() {
        debug!(error = %err, "{}", context);
    } else {
        error!(error = %err, "{}", context);
    }
    Envelope::failure(data, format!("{}: {}", context, err))
}

/// At most this many months in `temporal_distribution`
pub const MAX_MONTHS: usize = 12;

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Plain values of the summary aggregate row
#[derive(Debug, Clone, Default, PartialEq)]
struct SummaryAggregates {
    total_records: i64,
    unique_dates:  i64,
    earliest:      Option<String>,
    latest:        Option<String>,
    min_latitude:  Option<f64>,
    max_latitude:  Option<f64>,
    min_longitude: Option<f64>,
    max_longitude: Option<f64>,
    avg_depth:     Option<f64>,
    min_depth:     Option<f64>,
    max_depth:     Option<f64>
}

impl SummaryAggregates {
    fn from_row(row: &Row) -> Result<Self, QueryError> {
        let float = |name: &str| row.try_get::<_, Option<f64>>(name).map_err(database_error);
        let text = |name: &str| row.try_get::<_, Option<String>>(name).map_err(database_error);
        Ok(Self {
            total_records: row.try_get("total_records").map_err(database_error)?,
            unique_dates:  row.try_get("unique_dates").map_err(database_error)?,
            earliest:      text("earliest_date")?,
            latest:        text("latest_date")?,
            min_latitude:  float("min_latitude")?,
            max_latitude:  float("max_latitude")?,
            min_longitude: float("min_longitude")?,
            max_longitude: float("max_longitude")?,
            avg_depth:     float("avg_mixed_layer_depth")?,
            min_depth:     float("min_mixed_layer_depth")?,
            max_depth:     float("max_mixed_layer_depth")?
        })
    }
}

fn monthly_counts(rows: &[Row]) -> Result<Vec<MonthlyCount>, QueryError> {
    rows.iter()
        .map(|r| {
            Ok(MonthlyCount {
                year:         r.try_get("year").map_err(database_error)?,
                month:        r.try_get("month").map_err(database_error)?,
                record_count: r.try_get("record_count").map_err(database_error)?
            })
        })
        .collect()
}

/// Earliest months first, capped at [`MAX_MONTHS`]
fn chronological(mut months: Vec<MonthlyCount>) -> Vec<MonthlyCount> {
    months.sort_by_key(|m| (m.year, m.month));
    months.truncate(MAX_MONTHS);
    months
}

fn summarize(agg: SummaryAggregates, months: Vec<MonthlyCount>) -> SummaryData {
    SummaryData {
        dataset_overview:        DatasetOverview {
            total_records: agg.total_records,
            unique_dates:  agg.unique_dates,
            date_range:    DateSpan {
                earliest: agg.earliest,
                latest:   agg.latest
            }
        },
        geographic_extent:       GeographicExtent {
            latitude_range:  Bounds {
                min: finite(agg.min_latitude),
                max: finite(agg.max_latitude)
            },
            longitude_range: Bounds {
                min: finite(agg.min_longitude),
                max: finite(agg.max_longitude)
            }
        },
        mixed_layer_depth_stats: DepthStats {
            average: finite(agg.avg_depth),
            minimum: finite(agg.min_depth),
            maximum: finite(agg.max_depth)
        },
        temporal_distribution:   chronological(months)
    }
}

/// One-shot `get_sample_data` on a fresh service
pub async fn get_sample_data(config: &Config, limit: i64) -> Result<RecordsEnvelope, QueryError> {
    Ok(OceanDataQuery::connect(config)
        .await?
        .get_sample_data(limit)
        .await)
}

/// One-shot `get_data_count` on a fresh service
pub async fn get_data_count(config: &Config) -> Result<Envelope<CountData>, QueryError> {
    Ok(OceanDataQuery::connect(config).await?.get_data_count().await)
}

/// One-shot `query_by_location` on a fresh service
pub async fn query_by_location(
    config: &Config,
    lat_range: (f64, f64),
    lon_range: (f64, f64),
    limit: i64
) -> Result<RecordsEnvelope, QueryError> {
    Ok(OceanDataQuery::connect(config)
        .await?
        .query_by_location(lat_range, lon_range, limit)
        .await)
}

/// One-shot `query_by_date_range` on a fresh service
pub async fn query_by_date_range(
    config: &Config,
    start: impl Into<DateInput>,
    end: impl Into<DateInput>,
    limit: i64
) -> Result<RecordsEnvelope, QueryError> {
    Ok(OceanDataQuery::connect(config)
        .await?
        .query_by_date_range(start, end, limit)
        .await)
}

/// One-shot `get_data_summary` on a fresh service
pub async fn get_data_summary(config: &Config) -> Result<Envelope<SummaryPayload>, QueryError> {
    Ok(OceanDataQuery::connect(config).await?.get_data_summary().await)
}
