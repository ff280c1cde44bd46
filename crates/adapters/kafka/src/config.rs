//! Kafka Producer 配置
//!
//! 投递可靠性与批量参数到 librdkafka 配置键的映射

use std::time::Duration;

/// Producer 配置
#[derive(Debug, Clone)]
pub struct ProducerSettings {
    /// Broker 地址列表
    pub brokers: String,
    /// 确认模式：0 / 1 / all
    pub acks: String,
    /// 重试次数
    pub retries: u32,
    /// 重试退避
    pub retry_backoff: Duration,
    /// 投递超时（入队到 broker 确认的总时长上限）
    pub delivery_timeout: Duration,
    /// 本地缓冲队列最大消息数
    pub queue_buffering_max_messages: u64,
    /// 本地缓冲最长等待时间（毫秒）
    pub queue_buffering_max_ms: u64,
    /// 压缩类型
    pub compression_type: String,
    /// 批量大小（字节）
    pub batch_size: u64,
    /// 延迟发送时间（用于批量）
    pub linger_ms: u64,
}

impl ProducerSettings {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            acks: "all".to_string(),
            retries: 3,
            retry_backoff: Duration::from_millis(500),
            delivery_timeout: Duration::from_millis(5000),
            queue_buffering_max_messages: 100000,
            queue_buffering_max_ms: 5,
            compression_type: "snappy".to_string(),
            batch_size: 16384,
            linger_ms: 5,
        }
    }

    pub fn with_acks(mut self, acks: impl Into<String>) -> Self {
        self.acks = acks.into();
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    pub fn with_compression(mut self, compression: impl Into<String>) -> Self {
        self.compression_type = compression.into();
        self
    }

    /// 转换为 rdkafka ClientConfig 的配置项
    pub fn to_client_config_entries(&self) -> Vec<(String, String)> {
        vec![
            ("bootstrap.servers".to_string(), self.brokers.clone()),
            ("acks".to_string(), self.acks.clone()),
            ("retries".to_string(), self.retries.to_string()),
            (
                "retry.backoff.ms".to_string(),
                self.retry_backoff.as_millis().to_string(),
            ),
            (
                "delivery.timeout.ms".to_string(),
                self.delivery_timeout.as_millis().to_string(),
            ),
            (
                "queue.buffering.max.messages".to_string(),
                self.queue_buffering_max_messages.to_string(),
            ),
            (
                "queue.buffering.max.ms".to_string(),
                self.queue_buffering_max_ms.to_string(),
            ),
            (
                "compression.type".to_string(),
                self.compression_type.clone(),
            ),
            ("batch.size".to_string(), self.batch_size.to_string()),
            ("linger.ms".to_string(), self.linger_ms.to_string()),
        ]
    }
}
