//! Kafka Producer
//!
//! 每条消息等待 broker 的逐条投递确认，结果经一次性通道交回中继

use std::time::Duration;

use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use weave_adapter_kafka::{create_future_producer, ProducerSettings};
use weave_bootstrap::record_kafka_message;
use weave_errors::AppResult;

use crate::domain::models::OutboxEvent;
use crate::domain::producer::{EventProducer, SendResult};
use crate::error::RelationError;

pub struct KafkaProducer {
    producer: FutureProducer,
    topic: String,
    queue_timeout: Duration,
}

impl KafkaProducer {
    pub fn new(settings: &ProducerSettings, topic: impl Into<String>) -> AppResult<Self> {
        let producer = create_future_producer(settings)?;
        let topic = topic.into();

        info!(
            brokers = %settings.brokers,
            topic = %topic,
            "Kafka producer created successfully"
        );

        Ok(Self {
            producer,
            topic,
            queue_timeout: settings.delivery_timeout,
        })
    }

    /// 关闭 Producer：冲刷待发送消息，最长等待 10 秒，并报告残留
    pub fn close(&self) {
        if let Err(e) = self.producer.flush(Timeout::After(Duration::from_secs(10))) {
            let remaining = self.producer.in_flight_count();
            warn!(
                error = %e,
                count = remaining,
                "Producer closed with pending messages"
            );
            return;
        }

        info!("Kafka producer closed");
    }
}

impl EventProducer for KafkaProducer {
    fn send_message(
        &self,
        cancel: CancellationToken,
        event: &OutboxEvent,
    ) -> oneshot::Receiver<SendResult> {
        let (result_tx, result_rx) = oneshot::channel();

        let producer = self.producer.clone();
        let topic = self.topic.clone();
        let queue_timeout = self.queue_timeout;
        let event_id = event.id;
        let event_type = event.event_type.as_str();
        let created_at = event.created_at.to_string();
        let payload = serde_json::to_vec(&event.payload);

        tokio::spawn(async move {
            let payload = match payload {
                Ok(payload) => payload,
                Err(e) => {
                    error!(event_id, error = %e, "Failed to serialize event payload");
                    record_kafka_message(&topic, "send", false);
                    let _ = result_tx.send(SendResult::err(
                        event_id,
                        RelationError::Internal(e.to_string()),
                    ));
                    return;
                }
            };

            let event_id_header = event_id.to_string();
            let headers = OwnedHeaders::new()
                .insert(Header {
                    key: "event_id",
                    value: Some(event_id_header.as_str()),
                })
                .insert(Header {
                    key: "event_type",
                    value: Some(event_type),
                })
                .insert(Header {
                    key: "created_at",
                    value: Some(created_at.as_str()),
                });

            // 同类型事件共用分区 key，单 producer 下保持每类型顺序
            let record = FutureRecord::to(&topic)
                .key(event_type)
                .payload(&payload)
                .headers(headers);

            let delivery = producer.send(record, Timeout::After(queue_timeout));

            tokio::select! {
                _ = cancel.cancelled() => {
                    record_kafka_message(&topic, "send", false);
                    let _ = result_tx.send(SendResult::err(event_id, RelationError::Cancelled));
                }
                result = delivery => {
                    match result {
                        Ok((partition, offset)) => {
                            info!(
                                event_id,
                                topic = %topic,
                                partition,
                                offset,
                                "Message delivered successfully"
                            );
                            record_kafka_message(&topic, "send", true);
                            let _ = result_tx.send(SendResult::ok(event_id));
                        }
                        Err((e, _)) => {
                            error!(event_id, error = %e, "Message delivery failed");
                            record_kafka_message(&topic, "send", false);
                            let _ = result_tx.send(SendResult::err(
                                event_id,
                                RelationError::Publish(e.to_string()),
                            ));
                        }
                    }
                }
            }
        });

        result_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::domain::models::{EventType, OutboxStatus};

    #[tokio::test]
    #[ignore] // 需要 Kafka 实例
    async fn test_send_message_against_local_broker() {
        let settings = ProducerSettings::new("localhost:9092");
        let producer = KafkaProducer::new(&settings, "relation_events_test").unwrap();

        let event = OutboxEvent {
            id: 1,
            aggregate_id: 10,
            event_type: EventType::FollowCreated,
            payload: serde_json::json!({
                "follower_id": 1,
                "followee_id": 2,
                "timestamptz": "2025-01-15T10:30:00Z",
            }),
            status: OutboxStatus::New,
            created_at: Utc::now(),
            sent_at: None,
        };

        let result = producer
            .send_message(CancellationToken::new(), &event)
            .await
            .unwrap();
        assert_eq!(result.event_id, 1);
        assert!(result.error.is_none());

        producer.close();
    }
}
