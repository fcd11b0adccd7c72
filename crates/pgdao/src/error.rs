//! Error types for pgdao

use thiserror::Error;

/// Result type alias for pgdao operations
pub type OrmResult<T> = Result<T, OrmError>;

/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Entity metadata could not be built (reported on first resolution and cached)
    #[error("Entity configuration error: {0}")]
    Config(String),

    /// A key-based operation could not resolve a complete, non-null key
    #[error("Null key value: {0}")]
    NullKeyValue(String),

    /// Malformed caller input, rejected before anything is sent to the database
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error reported by the driver
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Query execution error, with the generated statement attached
    #[error("Execution failed: {source} [sql: {sql}]")]
    Execution {
        sql: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a key-value error
    pub fn null_key(message: impl Into<String>) -> Self {
        Self::NullKeyValue(message.into())
    }

    /// Create a precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Attach the statement that produced a driver error.
    ///
    /// Errors that did not come from the driver are returned untouched.
    pub fn with_statement(self, sql: &str) -> Self {
        match self {
            Self::Query(source) => Self::Execution {
                sql: sql.to_string(),
                source,
            },
            other => other,
        }
    }

    /// Check if this is a key-value error
    pub fn is_null_key_value(&self) -> bool {
        matches!(self, Self::NullKeyValue(_))
    }

    /// Check if this is a precondition violation
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// The underlying driver error, if any.
    pub fn db_error(&self) -> Option<&tokio_postgres::Error> {
        match self {
            Self::Query(e) | Self::Execution { source: e, .. } => Some(e),
            _ => None,
        }
    }

    /// Check if the database rejected the statement with a unique violation.
    ///
    /// The driver error itself is kept as-is; this only inspects its SQLSTATE.
    pub fn is_unique_violation(&self) -> bool {
        self.db_error()
            .and_then(|e| e.as_db_error())
            .is_some_and(|db| db.code().code() == UNIQUE_VIOLATION)
    }

    /// The generated statement attached to an execution failure.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Execution { sql, .. } => Some(sql),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_statement_leaves_non_driver_errors_alone() {
        let err = OrmError::precondition("empty batch").with_statement("INSERT INTO t");
        assert!(err.is_precondition());
        assert_eq!(err.sql(), None);
    }

    #[test]
    fn display_includes_category() {
        assert_eq!(
            OrmError::null_key("users.id is null").to_string(),
            "Null key value: users.id is null"
        );
        assert_eq!(
            OrmError::config("no table").to_string(),
            "Entity configuration error: no table"
        );
    }

    #[test]
    fn non_driver_errors_are_not_unique_violations() {
        assert!(!OrmError::Other("x".into()).is_unique_violation());
        assert!(OrmError::Other("x".into()).db_error().is_none());
    }
}
