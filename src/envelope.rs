//! Uniform response envelope.
//!
//! Every query operation answers with the same wire shape:
//!
//! ```json
//! {
//!   "success": true,
//!   "timestamp": "2025-09-12T10:04:11.482113",
//!   "message": "Retrieved 5 sample records",
//!   "data": [ ... ],
//!   "metadata": { "query_type": "sample_data", ... }
//! }
//! ```
//!
//! `data` is typed per operation and `metadata` is a tagged enum whose
//! `query_type` field names the operation. Failed operations carry zeroed
//! data and no metadata.

use chrono::Local;
use serde::Serialize;

use crate::record::Record;

/// Response wrapper shared by every query operation
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub success:   bool,
    pub timestamp: String,
    pub message:   String,
    pub data:      T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata:  Option<Metadata>
}

/// Build an envelope stamped with the current local time
pub fn format_response<T>(
    data: T,
    success: bool,
    message: impl Into<String>,
    metadata: Option<Metadata>
) -> Envelope<T> {
    Envelope {
        success,
        timestamp: now_iso(),
        message: message.into(),
        data,
        metadata
    }
}

/// Local time as `YYYY-MM-DDTHH:MM:SS.ffffff`
pub fn now_iso() -> String {
    Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

impl<T> Envelope<T> {
    pub fn ok(data: T, message: impl Into<String>, metadata: Metadata) -> Self {
        format_response(data, true, message, Some(metadata))
    }

    pub fn failure(data: T, message: impl Into<String>) -> Self {
        format_response(data, false, message, None)
    }
}

/// Query description attached to successful envelopes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "query_type", rename_all = "snake_case")]
pub enum Metadata {
    SampleData {
        limit:            i64,
        returned_records: usize,
        columns:          Vec<String>
    },
    DataCount {
        table_name: String
    },
    LocationFilter {
        filters:          LocationFilters,
        limit:            i64,
        returned_records: usize,
        columns:          Vec<String>
    },
    DateRangeFilter {
        filters:          DateFilters,
        limit:            i64,
        returned_records: usize,
        columns:          Vec<String>
    },
    DataSummary {
        generated_at: String,
        table_name:   String
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationFilters {
    pub latitude_range:  (f64, f64),
    pub longitude_range: (f64, f64)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateFilters {
    pub start_date: String,
    pub end_date:   String
}

/// Payload of `get_data_count`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CountData {
    pub total_records: i64
}

/// Payload of `get_data_summary`; the empty variant serializes as `{}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SummaryPayload {
    Summary(SummaryData),
    Empty {}
}

impl SummaryPayload {
    pub fn summary(&self) -> Option<&SummaryData> {
        match self {
            Self::Summary(data) => Some(data),
            Self::Empty {} => None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryData {
    pub dataset_overview:        DatasetOverview,
    pub geographic_extent:       GeographicExtent,
    pub mixed_layer_depth_stats: DepthStats,
    pub temporal_distribution:   Vec<MonthlyCount>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetOverview {
    pub total_records: i64,
    pub unique_dates:  i64,
    pub date_range:    DateSpan
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateSpan {
    pub earliest: Option<String>,
    pub latest:   Option<String>
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeographicExtent {
    pub latitude_range:  Bounds,
    pub longitude_range: Bounds
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepthStats {
    pub average: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MonthlyCount {
    pub year:         i32,
    pub month:        i32,
    pub record_count: i64
}

/// Envelope of the row-returning operations
pub type RecordsEnvelope = Envelope<Vec<Record>>;
