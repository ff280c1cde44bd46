//! Kafka Producer 构建

use rdkafka::config::ClientConfig;
use rdkafka::producer::FutureProducer;
use weave_errors::{AppError, AppResult};

use crate::config::ProducerSettings;

/// 按配置创建 FutureProducer
pub fn create_future_producer(settings: &ProducerSettings) -> AppResult<FutureProducer> {
    let mut client_config = ClientConfig::new();

    for (key, value) in settings.to_client_config_entries() {
        client_config.set(&key, &value);
    }

    client_config
        .create()
        .map_err(|e| AppError::internal(format!("Failed to create Kafka producer: {}", e)))
}
