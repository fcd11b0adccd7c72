use super::truncate_sql_bytes;
use super::types::{QueryContext, QueryMonitor, QueryResult};
use std::sync::Arc;
use std::time::Duration;

/// A no-op monitor that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl QueryMonitor for NoopMonitor {
    fn on_query_complete(&self, _ctx: &QueryContext, _duration: Duration, _result: &QueryResult) {}
}

/// The default monitor: completed statements at `DEBUG`, slow ones at `WARN`.
///
/// Events use the `pgdao.sql` target.
#[derive(Debug, Clone)]
pub struct TracingMonitor {
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingMonitor {
    fn default() -> Self {
        Self {
            max_sql_length: Some(200),
        }
    }
}

impl TracingMonitor {
    /// Create a new monitor with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

impl QueryMonitor for TracingMonitor {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        let sql = self.truncate_sql(&ctx.sql);
        match result {
            QueryResult::Error(error) => tracing::debug!(
                target: "pgdao.sql",
                operation = ctx.operation,
                query_type = ?ctx.query_type,
                params = ctx.param_count,
                elapsed_ms = duration.as_millis() as u64,
                error = %error,
                sql = %sql,
                "statement failed"
            ),
            _ => tracing::debug!(
                target: "pgdao.sql",
                operation = ctx.operation,
                query_type = ?ctx.query_type,
                params = ctx.param_count,
                elapsed_ms = duration.as_millis() as u64,
                result = %result,
                sql = %sql,
                "statement completed"
            ),
        }
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        tracing::warn!(
            target: "pgdao.sql",
            operation = ctx.operation,
            query_type = ?ctx.query_type,
            elapsed_ms = duration.as_millis() as u64,
            sql = %self.truncate_sql(&ctx.sql),
            "slow statement"
        );
    }
}

/// Fan events out to several monitors, in order.
#[derive(Clone, Default)]
pub struct CompositeMonitor {
    monitors: Vec<Arc<dyn QueryMonitor>>,
}

impl CompositeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a monitor (chainable).
    pub fn add<M: QueryMonitor + 'static>(mut self, monitor: M) -> Self {
        self.monitors.push(Arc::new(monitor));
        self
    }

    pub fn add_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitors.push(monitor);
        self
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl std::fmt::Debug for CompositeMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeMonitor")
            .field("monitors", &self.monitors.len())
            .finish()
    }
}

impl QueryMonitor for CompositeMonitor {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        for m in &self.monitors {
            m.on_query_complete(ctx, duration, result);
        }
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        for m in &self.monitors {
            m.on_slow_query(ctx, duration);
        }
    }
}
