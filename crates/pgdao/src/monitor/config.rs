use std::time::Duration;

/// Default slow-statement threshold.
pub const DEFAULT_SLOW_STATEMENT_THRESHOLD: Duration = Duration::from_secs(1);

/// Configuration for a [`DbHelper`](crate::DbHelper).
///
/// Monitoring is enabled by default and reports through [`TracingMonitor`](super::TracingMonitor).
#[derive(Debug, Clone)]
pub struct HelperConfig {
    /// Statements running longer than this trigger `on_slow_query`. Never aborts a statement.
    pub slow_statement_threshold: Duration,
    /// Truncate logged SQL to this many bytes. `None` logs it whole.
    pub max_sql_log_length: Option<usize>,
    /// Whether monitors receive events at all.
    pub monitoring_enabled: bool,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            slow_statement_threshold: DEFAULT_SLOW_STATEMENT_THRESHOLD,
            max_sql_log_length: Some(200),
            monitoring_enabled: true,
        }
    }
}

impl HelperConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slow-statement threshold.
    pub fn with_slow_statement_threshold(mut self, threshold: Duration) -> Self {
        self.slow_statement_threshold = threshold;
        self
    }

    /// Set maximum SQL length for log output.
    pub fn with_max_sql_log_length(mut self, len: usize) -> Self {
        self.max_sql_log_length = Some(len);
        self
    }

    /// Log SQL without truncation.
    pub fn no_sql_truncation(mut self) -> Self {
        self.max_sql_log_length = None;
        self
    }

    /// Enable monitoring.
    pub fn enable_monitoring(mut self) -> Self {
        self.monitoring_enabled = true;
        self
    }

    /// Disable monitoring.
    pub fn disable_monitoring(mut self) -> Self {
        self.monitoring_enabled = false;
        self
    }
}
