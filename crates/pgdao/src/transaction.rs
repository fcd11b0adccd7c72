//! Transaction context with a rollback-only mark.
//!
//! pgdao never owns transactions; callers open one and pass it to every operation. A
//! [`TxContext`] adds the one thing the helper needs from it: a flag that
//! [`DbHelper::rollback`](crate::DbHelper::rollback) can set from inside the unit of work, so
//! that finishing the context rolls back instead of committing.
//!
//! # Example
//!
//! ```ignore
//! use pgdao::{DbHelper, OrmResult};
//!
//! # async fn demo(client: &mut tokio_postgres::Client, helper: &DbHelper) -> OrmResult<()> {
//! pgdao::transaction!(client, tx, {
//!     let moved = helper.update(&tx, &account).await?;
//!     if moved == 0 {
//!         helper.rollback(&tx)?;
//!     }
//!     Ok(())
//! })?;
//! # Ok(()) }
//! ```

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Runs the given block inside a [`TxContext`].
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`, unless the context was marked rollback-only.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `pgdao::OrmResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let $tx = $crate::TxContext::begin($client).await?;

        let __pgdao_tx_body_result = async { $body }.await;
        match __pgdao_tx_body_result {
            Ok(value) => $tx.finish().await.map(|_| value),
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::OrmError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}

/// How a [`TxContext`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Committed,
    RolledBack,
}

/// A driver transaction plus a rollback-only flag.
pub struct TxContext<'a> {
    tx: tokio_postgres::Transaction<'a>,
    rollback_only: AtomicBool,
}

impl<'a> TxContext<'a> {
    /// Begin a transaction on `client`.
    pub async fn begin(client: &'a mut tokio_postgres::Client) -> OrmResult<Self> {
        let tx = client.transaction().await.map_err(OrmError::Query)?;
        tracing::debug!(target: "pgdao.tx", "transaction started");
        Ok(Self::new(tx))
    }

    /// Wrap an already open transaction.
    pub fn new(tx: tokio_postgres::Transaction<'a>) -> Self {
        Self {
            tx,
            rollback_only: AtomicBool::new(false),
        }
    }

    /// Mark the context so that [`finish`](Self::finish) rolls back.
    pub fn mark_rollback_only(&self) {
        if !self.rollback_only.swap(true, Ordering::AcqRel) {
            tracing::debug!(target: "pgdao.tx", "transaction marked rollback-only");
        }
    }

    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only.load(Ordering::Acquire)
    }

    /// The wrapped driver transaction.
    pub fn transaction(&self) -> &tokio_postgres::Transaction<'a> {
        &self.tx
    }

    /// Commit, or roll back when marked rollback-only.
    pub async fn finish(self) -> OrmResult<TxOutcome> {
        if self.is_rollback_only() {
            self.rollback().await?;
            Ok(TxOutcome::RolledBack)
        } else {
            self.tx.commit().await.map_err(OrmError::Query)?;
            tracing::debug!(target: "pgdao.tx", "transaction committed");
            Ok(TxOutcome::Committed)
        }
    }

    /// Roll back unconditionally.
    pub async fn rollback(self) -> OrmResult<()> {
        self.tx.rollback().await.map_err(OrmError::Query)?;
        tracing::debug!(target: "pgdao.tx", "transaction rolled back");
        Ok(())
    }
}

impl std::fmt::Debug for TxContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxContext")
            .field("rollback_only", &self.is_rollback_only())
            .finish_non_exhaustive()
    }
}

impl GenericClient for TxContext<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        GenericClient::query(&self.tx, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        GenericClient::execute(&self.tx, sql, params).await
    }

    fn set_rollback_only(&self) -> OrmResult<()> {
        self.mark_rollback_only();
        Ok(())
    }
}
