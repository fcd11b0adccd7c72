use super::*;
use std::sync::Mutex;
use std::time::Duration;

#[test]
fn test_query_type_detection() {
    assert_eq!(QueryType::from_sql("SELECT * FROM users"), QueryType::Select);
    assert_eq!(QueryType::from_sql("  select id FROM users"), QueryType::Select);
    assert_eq!(
        QueryType::from_sql("WITH cte AS (SELECT 1) SELECT * FROM cte"),
        QueryType::Select
    );
    assert_eq!(
        QueryType::from_sql("INSERT INTO users (name) VALUES ($1)"),
        QueryType::Insert
    );
    assert_eq!(
        QueryType::from_sql("/* hint */ UPDATE users SET name = $1"),
        QueryType::Update
    );
    assert_eq!(
        QueryType::from_sql("DELETE FROM users WHERE id = $1"),
        QueryType::Delete
    );
    assert_eq!(QueryType::from_sql("CREATE TABLE t (id INT)"), QueryType::Other);
}

#[test]
fn test_tracing_monitor_truncation() {
    let monitor = TracingMonitor::new().max_sql_length(10);
    assert_eq!(monitor.truncate_sql("SELECT * FROM users"), "SELECT * F...");
    assert_eq!(monitor.truncate_sql("SELECT 1"), "SELECT 1");
    assert_eq!(
        TracingMonitor::new().no_truncate().truncate_sql(&"x".repeat(500)).len(),
        500
    );
}

#[test]
fn test_truncate_respects_char_boundaries() {
    assert_eq!(truncate_sql_bytes("héllo", 2), "h");
    assert_eq!(truncate_sql_bytes("abc", 10), "abc");
}

#[test]
fn test_error_result_is_truncated() {
    let QueryResult::Error(msg) = QueryResult::error("e".repeat(2000)) else {
        panic!("expected error variant");
    };
    assert_eq!(msg.len(), 515);
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl QueryMonitor for Recorder {
    fn on_query_complete(&self, ctx: &QueryContext, _duration: Duration, result: &QueryResult) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{}:{}", ctx.operation, result));
    }

    fn on_slow_query(&self, ctx: &QueryContext, _duration: Duration) {
        self.events.lock().unwrap().push(format!("slow:{}", ctx.operation));
    }
}

#[test]
fn test_composite_monitor_fans_out() {
    let a = std::sync::Arc::new(Recorder::default());
    let b = std::sync::Arc::new(Recorder::default());
    let composite = CompositeMonitor::new().add_arc(a.clone()).add_arc(b.clone());
    assert_eq!(composite.len(), 2);

    let ctx = QueryContext::new("get_all", "SELECT id FROM users", 0);
    composite.on_query_complete(&ctx, Duration::from_millis(1), &QueryResult::Rows(2));
    composite.on_slow_query(&ctx, Duration::from_secs(2));

    for r in [a, b] {
        assert_eq!(
            *r.events.lock().unwrap(),
            vec!["get_all:2 rows".to_string(), "slow:get_all".to_string()]
        );
    }
}

#[test]
fn test_helper_config_defaults() {
    let cfg = HelperConfig::default();
    assert_eq!(cfg.slow_statement_threshold, Duration::from_secs(1));
    assert_eq!(cfg.max_sql_log_length, Some(200));
    assert!(cfg.monitoring_enabled);

    let cfg = HelperConfig::new()
        .with_slow_statement_threshold(Duration::from_millis(50))
        .no_sql_truncation()
        .disable_monitoring();
    assert_eq!(cfg.slow_statement_threshold, Duration::from_millis(50));
    assert_eq!(cfg.max_sql_log_length, None);
    assert!(!cfg.monitoring_enabled);
}
