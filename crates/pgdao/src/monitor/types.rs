use crate::sql::strip_leading_keyword;
use std::fmt;
use std::time::Duration;

/// The type of SQL operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// SELECT query
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// Other SQL (e.g., DDL, custom)
    Other,
}

impl QueryType {
    /// Detect query type from the leading keyword of a SQL string.
    ///
    /// `WITH ...` is reported as a select; generated statements never start with a CTE.
    pub fn from_sql(sql: &str) -> Self {
        let is = |kw: &str| strip_leading_keyword(sql, kw).is_some();
        if is("SELECT") || is("WITH") {
            QueryType::Select
        } else if is("INSERT") {
            QueryType::Insert
        } else if is("UPDATE") {
            QueryType::Update
        } else if is("DELETE") {
            QueryType::Delete
        } else {
            QueryType::Other
        }
    }
}

/// Context information about the statement being executed.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// The SQL sent to Postgres.
    pub sql: String,
    /// Number of parameters.
    pub param_count: usize,
    /// Detected query type.
    pub query_type: QueryType,
    /// Public operation that issued the statement (`"insert"`, `"get_page"`, ...).
    pub operation: &'static str,
}

impl QueryContext {
    /// Create a new query context.
    pub fn new(operation: &'static str, sql: &str, param_count: usize) -> Self {
        Self {
            sql: sql.to_string(),
            param_count,
            query_type: QueryType::from_sql(sql),
            operation,
        }
    }
}

/// Maximum length for error messages in `QueryResult::Error`.
const MAX_ERROR_LEN: usize = 512;

/// Outcome of a statement, for monitoring purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    /// Query returned rows.
    Rows(usize),
    /// Statement affected rows (for mutations).
    Affected(u64),
    /// Statement failed (message truncated to 512 bytes).
    Error(String),
}

impl QueryResult {
    /// Create an error result, truncating the message.
    pub fn error(msg: String) -> Self {
        if msg.len() > MAX_ERROR_LEN {
            Self::Error(format!("{}...", super::truncate_sql_bytes(&msg, MAX_ERROR_LEN)))
        } else {
            Self::Error(msg)
        }
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Rows(n) => write!(f, "{n} rows"),
            QueryResult::Affected(n) => write!(f, "{n} affected"),
            QueryResult::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Trait for observing statement execution.
///
/// Monitors only observe; nothing they do changes how a statement runs.
pub trait QueryMonitor: Send + Sync {
    /// Called after a statement completes (success or failure).
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult);

    /// Called when a statement took longer than the slow-statement threshold.
    ///
    /// Default implementation does nothing.
    fn on_slow_query(&self, _ctx: &QueryContext, _duration: Duration) {}
}
