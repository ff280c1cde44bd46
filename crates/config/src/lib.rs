//! weave-config - 配置加载库
//!
//! YAML 配置文件 + 环境变量回退

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::Deserialize;
use thiserror::Error;

use secrecy::Secret;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// gRPC 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    50054
}

/// 管理端点配置（/health /ready /metrics）
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    9054
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    // 根据环境自动调整连接池大小
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

/// 上游用户服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct UserServiceConfig {
    #[serde(default = "default_user_service_address")]
    pub address: String,
}

fn default_user_service_address() -> String {
    "http://user-service:50051".to_string()
}

/// Kafka 配置
///
/// 投递可靠性与批量参数与 broker 端配置键一一对应
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_kafka_topic")]
    pub topic: String,
    #[serde(default = "default_kafka_acks")]
    pub acks: String,
    #[serde(default = "default_kafka_retries")]
    pub retries: u32,
    #[serde(default = "default_kafka_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_kafka_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,
    #[serde(default = "default_kafka_queue_buffering_max_messages")]
    pub queue_buffering_max_messages: u64,
    #[serde(default = "default_kafka_queue_buffering_max_ms")]
    pub queue_buffering_max_ms: u64,
    #[serde(default = "default_kafka_compression_type")]
    pub compression_type: String,
    #[serde(default = "default_kafka_batch_size")]
    pub batch_size: u64,
    #[serde(default = "default_kafka_linger_ms")]
    pub linger_ms: u64,
}

fn default_kafka_topic() -> String {
    "relation_events".to_string()
}

fn default_kafka_acks() -> String {
    "all".to_string()
}

fn default_kafka_retries() -> u32 {
    3
}

fn default_kafka_retry_backoff_ms() -> u64 {
    500
}

fn default_kafka_delivery_timeout_ms() -> u64 {
    5000
}

fn default_kafka_queue_buffering_max_messages() -> u64 {
    100000
}

fn default_kafka_queue_buffering_max_ms() -> u64 {
    5
}

fn default_kafka_compression_type() -> String {
    "snappy".to_string()
}

fn default_kafka_batch_size() -> u64 {
    16384
}

fn default_kafka_linger_ms() -> u64 {
    5
}

/// Outbox 中继配置
#[derive(Debug, Clone, Deserialize)]
pub struct OutboxConfig {
    #[serde(default = "default_outbox_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_outbox_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_outbox_batch_size")]
    pub batch_size: i64,
}

impl OutboxConfig {
    /// 轮询间隔
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }
}

fn default_outbox_concurrency() -> usize {
    10
}

fn default_outbox_tick_interval_ms() -> u64 {
    2000
}

fn default_outbox_batch_size() -> i64 {
    100
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub database: DatabaseConfig,
    pub user_service: UserServiceConfig,
    pub kafka: KafkaConfig,
    pub outbox: OutboxConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_app_name() -> String {
    "relation-service".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Yaml::file(format!("{}/default.yaml", config_dir)))
            .merge(Yaml::file(format!("{}/{}.yaml", config_dir, env)))
            .merge(Env::prefixed("").split("_"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

#[cfg(test)]
mod tests;
