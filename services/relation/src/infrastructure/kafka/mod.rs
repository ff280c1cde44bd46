mod producer;

pub use producer::KafkaProducer;

use weave_adapter_kafka::ProducerSettings;
use weave_config::KafkaConfig;

/// 由应用配置构建 Producer 设置
pub fn producer_settings(config: &KafkaConfig) -> ProducerSettings {
    let mut settings = ProducerSettings::new(&config.brokers)
        .with_acks(&config.acks)
        .with_retries(config.retries)
        .with_retry_backoff(std::time::Duration::from_millis(config.retry_backoff_ms))
        .with_delivery_timeout(std::time::Duration::from_millis(config.delivery_timeout_ms))
        .with_compression(&config.compression_type);

    settings.queue_buffering_max_messages = config.queue_buffering_max_messages;
    settings.queue_buffering_max_ms = config.queue_buffering_max_ms;
    settings.batch_size = config.batch_size;
    settings.linger_ms = config.linger_ms;
    settings
}
