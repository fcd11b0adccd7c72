//! The public operation surface.
//!
//! [`DbHelper`] holds no connection. Each operation takes the client to run on, resolves the
//! entity's cached metadata, builds a fresh [`Statement`](crate::Statement) and awaits it.
//! Statements of one operation run one after another on the caller's task.
//!
//! ```ignore
//! use pgdao::{fragment, DbHelper, PageRequest};
//!
//! let helper = DbHelper::new();
//!
//! let mut user = User { id: None, name: Some("A".into()), age: None };
//! helper.insert(&client, &mut user).await?; // user.id is now set
//!
//! let adults = helper
//!     .get_page::<User, _>(&client, &PageRequest::new(1, 20).filter(fragment!("WHERE age >= ? ORDER BY id", 18)))
//!     .await?;
//! ```

mod exec;
mod passthrough;
mod read;
mod write;

use crate::client::GenericClient;
use crate::error::OrmResult;
use crate::monitor::{HelperConfig, NoopMonitor, QueryMonitor, TracingMonitor};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metadata-driven CRUD and paging over any [`GenericClient`].
pub struct DbHelper {
    monitor: Arc<dyn QueryMonitor>,
    monitoring_enabled: bool,
    slow_threshold_ms: AtomicU64,
}

impl DbHelper {
    /// A helper with the default configuration.
    pub fn new() -> Self {
        Self::with_config(HelperConfig::default())
    }

    /// A helper reporting through a [`TracingMonitor`] configured from `config`.
    pub fn with_config(config: HelperConfig) -> Self {
        let monitor = TracingMonitor {
            max_sql_length: config.max_sql_log_length,
        };
        Self {
            monitor: Arc::new(monitor),
            monitoring_enabled: config.monitoring_enabled,
            slow_threshold_ms: AtomicU64::new(duration_ms(config.slow_statement_threshold)),
        }
    }

    /// Replace the monitor.
    pub fn with_monitor<M: QueryMonitor + 'static>(self, monitor: M) -> Self {
        self.with_monitor_arc(Arc::new(monitor))
    }

    pub fn with_monitor_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    /// Stop reporting statements altogether.
    pub fn without_monitoring(mut self) -> Self {
        self.monitor = Arc::new(NoopMonitor);
        self.monitoring_enabled = false;
        self
    }

    /// Set the duration after which an executed statement is reported as slow.
    ///
    /// Purely observational: statements are never cancelled.
    pub fn set_timeout_warning_valve(&self, threshold: Duration) {
        self.slow_threshold_ms
            .store(duration_ms(threshold), Ordering::Relaxed);
        tracing::debug!(threshold_ms = duration_ms(threshold), "slow statement threshold updated");
    }

    /// The current slow-statement threshold.
    pub fn timeout_warning_valve(&self) -> Duration {
        Duration::from_millis(self.slow_threshold_ms.load(Ordering::Relaxed))
    }

    /// Mark the transaction context `conn` belongs to as rollback-only.
    ///
    /// Fails with a precondition error when `conn` is not a transaction context.
    pub fn rollback<C: GenericClient>(&self, conn: &C) -> OrmResult<()> {
        conn.set_rollback_only()?;
        tracing::debug!("rollback requested");
        Ok(())
    }
}

impl Default for DbHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DbHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbHelper")
            .field("monitoring_enabled", &self.monitoring_enabled)
            .field("slow_threshold", &self.timeout_warning_valve())
            .finish_non_exhaustive()
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
