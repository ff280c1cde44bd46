//! weave-bootstrap - 统一服务启动骨架
//!
//! 服务复用的启动逻辑，包括：
//! - 运行时初始化（日志、追踪）
//! - Metrics 导出（Prometheus）
//! - 管理端点（/health, /ready, /metrics）
//! - Graceful shutdown 信号

mod health;
mod metrics;
mod runtime;

pub use health::*;
pub use metrics::*;
pub use runtime::*;
