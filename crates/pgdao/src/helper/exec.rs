//! Execution adapter: runs statements on the caller's client, timed and reported.

use super::DbHelper;
use crate::client::GenericClient;
use crate::error::OrmResult;
use crate::monitor::{QueryContext, QueryResult};
use crate::sql::Statement;
use std::time::{Duration, Instant};
use tokio_postgres::Row;

impl DbHelper {
    /// Run a statement that returns rows.
    pub(crate) async fn run_query<C: GenericClient>(
        &self,
        conn: &C,
        operation: &'static str,
        stmt: &Statement,
    ) -> OrmResult<Vec<Row>> {
        let start = Instant::now();
        let result = conn
            .query(stmt.sql(), &stmt.params_ref())
            .await
            .map_err(|e| e.with_statement(stmt.sql()));
        let outcome = match &result {
            Ok(rows) => QueryResult::Rows(rows.len()),
            Err(e) => QueryResult::error(e.to_string()),
        };
        self.report(operation, stmt, start.elapsed(), &outcome);
        result
    }

    /// Run a statement and return its affected-row count.
    pub(crate) async fn run_execute<C: GenericClient>(
        &self,
        conn: &C,
        operation: &'static str,
        stmt: &Statement,
    ) -> OrmResult<u64> {
        let start = Instant::now();
        let result = conn
            .execute(stmt.sql(), &stmt.params_ref())
            .await
            .map_err(|e| e.with_statement(stmt.sql()));
        let outcome = match &result {
            Ok(n) => QueryResult::Affected(*n),
            Err(e) => QueryResult::error(e.to_string()),
        };
        self.report(operation, stmt, start.elapsed(), &outcome);
        result
    }

    fn report(
        &self,
        operation: &'static str,
        stmt: &Statement,
        duration: Duration,
        outcome: &QueryResult,
    ) {
        if !self.monitoring_enabled {
            return;
        }
        let ctx = QueryContext::new(operation, stmt.sql(), stmt.params().len());
        self.monitor.on_query_complete(&ctx, duration, outcome);
        if duration > self.timeout_warning_valve() {
            self.monitor.on_slow_query(&ctx, duration);
        }
    }
}
