//! Metrics 模块
//!
//! 提供 Prometheus metrics 导出

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tracing::debug;

/// Metrics 记录器
pub struct MetricsRecorder {
    handle: PrometheusHandle,
}

impl MetricsRecorder {
    /// 创建新的 Metrics 记录器
    pub fn new() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("Failed to install Prometheus recorder");

        Self { handle }
    }

    /// 获取 Prometheus 格式的 metrics
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// 记录 gRPC 请求
pub fn record_grpc_request(method: &str, status: &str, duration_ms: f64) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];

    counter!("grpc_requests_total", &labels).increment(1);
    histogram!("grpc_request_duration_ms", &labels).record(duration_ms);
}

/// 记录数据库查询
pub fn record_db_query(query_type: &str, success: bool, duration_ms: f64) {
    let labels = [
        ("query_type", query_type.to_string()),
        ("success", success.to_string()),
    ];

    counter!("db_queries_total", &labels).increment(1);
    histogram!("db_query_duration_ms", &labels).record(duration_ms);
}

/// 记录关注关系操作
pub fn record_relation_operation(operation: &str, success: bool) {
    let labels = [
        ("operation", operation.to_string()),
        ("success", success.to_string()),
    ];

    counter!("relation_operations_total", &labels).increment(1);
}

/// 记录 Kafka 消息
pub fn record_kafka_message(topic: &str, operation: &str, success: bool) {
    let labels = [
        ("topic", topic.to_string()),
        ("operation", operation.to_string()),
        ("success", success.to_string()),
    ];

    counter!("kafka_messages_total", &labels).increment(1);
}

/// 记录 Outbox 操作
pub fn record_outbox_operation(operation: &str, success: bool) {
    let labels = [
        ("operation", operation.to_string()),
        ("success", success.to_string()),
    ];

    counter!("outbox_operations_total", &labels).increment(1);
}

/// 设置活跃连接数
pub fn set_active_connections(count: usize) {
    gauge!("active_connections").set(count as f64);
}

/// 设置服务健康状态
pub fn set_service_health(healthy: bool) {
    gauge!("service_health").set(if healthy { 1.0 } else { 0.0 });
}

/// gRPC 请求计时器
pub struct RequestTimer {
    start: Instant,
    method: String,
}

impl RequestTimer {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            method: method.into(),
        }
    }

    pub fn finish(self, status: &str) {
        let duration = self.start.elapsed().as_secs_f64() * 1000.0;
        record_grpc_request(&self.method, status, duration);
    }
}

/// 数据库查询计时器
pub struct DbQueryTimer {
    start: Instant,
    query_type: String,
}

impl DbQueryTimer {
    pub fn new(query_type: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            query_type: query_type.into(),
        }
    }

    pub fn finish(self, success: bool) {
        let duration = self.start.elapsed().as_secs_f64() * 1000.0;
        record_db_query(&self.query_type, success, duration);
    }
}

/// 连接池 Metrics 采集器
///
/// 定期采集 PostgreSQL 连接池状态
pub fn spawn_pool_metrics_collector(
    pool: PgPool,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            let status = weave_adapter_postgres::pool_status(&pool);
            set_active_connections(status.active);

            debug!(
                pool_size = status.size,
                pool_idle = status.idle,
                pool_active = status.active,
                "Pool metrics collected"
            );
        }
    })
}
