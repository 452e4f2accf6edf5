pub use masterror::{AppError, AppResult};
use masterror::Error;

/// Failure inside the query service.
///
/// Validation and database failures are folded into `success = false`
/// envelopes at the operation boundary. `Connection` is also what the
/// fail-fast constructor returns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Input outside its domain (limit, coordinates, dates)
    #[error("{0}")]
    Validation(String),
    /// Pool, connect or liveness probe failure
    #[error("Failed to connect to database: {0}")]
    Connection(String),
    /// Driver-level statement failure
    #[error("{0}")]
    Database(String)
}

impl QueryError {
    /// Whether the error came from input validation
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Validation(_) => AppError::bad_request(err.to_string()),
            QueryError::Connection(_) | QueryError::Database(_) => {
                AppError::service(err.to_string())
            }
        }
    }
}

/// Create validation error
pub fn validation_error(message: impl Into<String>) -> QueryError {
    QueryError::Validation(message.into())
}

/// Create connection error from any displayable source
pub fn connection_error(source: impl std::fmt::Display) -> QueryError {
    QueryError::Connection(source.to_string())
}

/// Create database error, preferring the server-side message when present
pub fn database_error(err: tokio_postgres::Error) -> QueryError {
    match err.as_db_error() {
        Some(db) => QueryError::Database(format!("{}: {}", db.severity(), db.message())),
        None => QueryError::Database(err.to_string())
    }
}

/// Create file read error
pub fn file_read_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to read file '{}': {}", path, source))
}

/// Create CSV parse error
pub fn csv_error(path: &str, source: csv::Error) -> AppError {
    let msg = match source.position() {
        Some(pos) => format!(
            "CSV parse error in '{}' at line {}: {}",
            path,
            pos.line(),
            source
        ),
        None => format!("CSV parse error in '{}': {}", path, source)
    };
    AppError::bad_request(msg)
}

/// Create table load error
pub fn load_error(table: &str, message: impl std::fmt::Display) -> AppError {
    AppError::service(format!("Failed to load table '{}': {}", table, message))
}

/// Create config error
pub fn config_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_is_bare_message() {
        let err = validation_error("Limit must be between 1 and 1000");
        assert_eq!(err.to_string(), "Limit must be between 1 and 1000");
        assert!(err.is_validation());
    }

    #[test]
    fn test_connection_error_display_has_prefix() {
        let err = connection_error("connection refused");
        assert_eq!(
            err.to_string(),
            "Failed to connect to database: connection refused"
        );
        assert!(!err.is_validation());
    }

    #[test]
    fn test_query_error_converts_to_app_error() {
        let app: AppError = validation_error("bad").into();
        assert!(!app.to_string().is_empty());
        let app: AppError = QueryError::Database("boom".into()).into();
        assert!(!app.to_string().is_empty());
    }
}
