//! 管理端点模块
//!
//! 在独立地址上提供 /health、/ready 和 /metrics 端点

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::metrics::MetricsRecorder;

/// 健康检查状态
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub checks: Vec<ComponentHealth>,
}

/// 组件健康状态
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            checks: vec![],
        }
    }

    pub fn add_check(&mut self, check: ComponentHealth) {
        if check.status != "healthy" {
            self.status = "unhealthy".to_string();
        }
        self.checks.push(check);
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "healthy".to_string(),
            message: None,
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "unhealthy".to_string(),
            message: Some(message.into()),
        }
    }
}

/// 管理 HTTP 服务器状态
#[derive(Clone)]
struct AdminServerState {
    pool: PgPool,
    metrics: Arc<MetricsRecorder>,
}

/// 管理 HTTP 服务器
///
/// 与 gRPC 服务分开绑定，供 Prometheus 抓取与探针使用
pub struct AdminServer {
    pool: PgPool,
    metrics: Arc<MetricsRecorder>,
    addr: SocketAddr,
}

impl AdminServer {
    pub fn new(pool: PgPool, metrics: Arc<MetricsRecorder>, addr: SocketAddr) -> Self {
        Self {
            pool,
            metrics,
            addr,
        }
    }

    /// 启动 HTTP 服务器
    pub async fn serve(self) -> Result<(), std::io::Error> {
        let state = AdminServerState {
            pool: self.pool,
            metrics: self.metrics,
        };

        let app = Router::new()
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state);

        info!(addr = %self.addr, "Admin HTTP server starting");

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, app).await
    }
}

/// Liveness 端点处理器
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthStatus::healthy()))
}

/// Readiness 端点处理器
async fn ready_handler(State(state): State<AdminServerState>) -> impl IntoResponse {
    let mut status = HealthStatus::healthy();

    match weave_adapter_postgres::check_connection(&state.pool).await {
        Ok(_) => status.add_check(ComponentHealth::healthy("postgres")),
        Err(e) => status.add_check(ComponentHealth::unhealthy("postgres", e.to_string())),
    }

    crate::metrics::set_service_health(status.is_healthy());

    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

/// Metrics 端点处理器
async fn metrics_handler(State(state): State<AdminServerState>) -> impl IntoResponse {
    let metrics = state.metrics.render();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        metrics,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_aggregation() {
        let mut status = HealthStatus::healthy();
        status.add_check(ComponentHealth::healthy("postgres"));
        assert!(status.is_healthy());

        status.add_check(ComponentHealth::unhealthy("postgres", "connection refused"));
        assert!(!status.is_healthy());
        assert_eq!(status.checks.len(), 2);
    }
}
