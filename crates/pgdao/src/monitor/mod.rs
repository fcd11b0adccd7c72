//! Statement monitoring and the slow-statement warning.
//!
//! Every statement a [`DbHelper`](crate::DbHelper) runs is timed and reported to a
//! [`QueryMonitor`]. The default [`TracingMonitor`] writes `tracing` events; statements that
//! exceed the configured threshold are reported again through `on_slow_query`.
//!
//! # Example
//!
//! ```rust,ignore
//! use pgdao::monitor::{QueryContext, QueryMonitor, QueryResult};
//! use std::time::Duration;
//!
//! struct Printer;
//!
//! impl QueryMonitor for Printer {
//!     fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
//!         println!("[{:?}] {} - {}", duration, ctx.sql, result);
//!     }
//! }
//!
//! let helper = pgdao::DbHelper::new().with_monitor(Printer);
//! ```

mod config;
mod monitors;
mod types;

#[cfg(test)]
mod tests;

pub use config::{DEFAULT_SLOW_STATEMENT_THRESHOLD, HelperConfig};
pub use monitors::{CompositeMonitor, NoopMonitor, TracingMonitor};
pub use types::{QueryContext, QueryMonitor, QueryResult, QueryType};

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
