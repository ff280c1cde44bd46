//! Outbox 中继工作池
//!
//! 单写者、有界并发地排空 outbox：按节拍批量取 new 事件，
//! 逐条标记 pending、发布、写回终态。部署假设为单个中继实例。

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};
use weave_config::OutboxConfig;

use crate::domain::models::{OutboxEvent, OutboxStatus};
use crate::domain::producer::{EventProducer, SendResult};
use crate::domain::repository::OutboxRepository;
use crate::error::RelationError;

pub struct OutboxWorker {
    repo: Arc<dyn OutboxRepository>,
    producer: Arc<dyn EventProducer>,
    config: OutboxConfig,
    tracker: TaskTracker,
    semaphore: Arc<Semaphore>,
    stop: CancellationToken,
}

impl OutboxWorker {
    pub fn new(
        repo: Arc<dyn OutboxRepository>,
        producer: Arc<dyn EventProducer>,
        config: OutboxConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.concurrency));

        Self {
            repo,
            producer,
            config,
            tracker: TaskTracker::new(),
            semaphore,
            stop: CancellationToken::new(),
        }
    }

    /// 启动调度循环
    ///
    /// 循环等待节拍、停止信号或进程关闭信号，先到者生效
    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        info!(
            concurrency = self.config.concurrency,
            batch_size = self.config.batch_size,
            tick_interval_ms = self.config.tick_interval_ms,
            "Starting outbox worker pool"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.tick_interval());

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.clone().process_batch(shutdown.clone()).await;
                    }
                    _ = self.stop.cancelled() => {
                        info!("Worker pool stopping due to stop signal");
                        return;
                    }
                    _ = shutdown.cancelled() => {
                        info!("Worker pool stopping due to shutdown signal");
                        return;
                    }
                }
            }
        })
    }

    /// 停止工作池：停止取批并等待在途 worker 排空
    ///
    /// 不取消在途 worker，让它们完成当前发布
    pub async fn stop(&self) {
        info!("Stopping outbox worker pool");
        self.stop.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("Outbox worker pool stopped");
    }

    async fn process_batch(self: Arc<Self>, shutdown: CancellationToken) {
        debug!(batch_size = self.config.batch_size, "Processing outbox batch");

        let events = match self.repo.get_events_for_processing(self.config.batch_size).await {
            Ok(events) => events,
            Err(e) => {
                error!(error = %e, "Failed to get events for processing");
                return;
            }
        };

        if events.is_empty() {
            debug!("No events to process");
            return;
        }

        info!(count = events.len(), "Found events to process");

        for event in events {
            let worker = self.clone();
            let shutdown = shutdown.clone();
            self.tracker.spawn(async move {
                worker.worker(shutdown, event).await;
            });
        }
    }

    async fn worker(&self, shutdown: CancellationToken, event: OutboxEvent) {
        // 取消时不占用并发票直接退出；事件保持 new，下个节拍重试
        if shutdown.is_cancelled() {
            debug!(
                event_id = event.id,
                "Skipping event processing due to cancellation"
            );
            return;
        }

        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        self.process_event(shutdown, event).await;
    }

    async fn process_event(&self, cancel: CancellationToken, event: OutboxEvent) {
        if let Err(e) = self.repo.mark_event_as_pending(event.id).await {
            error!(event_id = event.id, error = %e, "Failed to mark event as pending");
            return;
        }

        let result_rx = self.producer.send_message(cancel, &event);
        let result = match result_rx.await {
            Ok(result) => result,
            // 通道未产出结果就被关闭
            Err(_) => SendResult::err(event.id, RelationError::UnexpectedEventType),
        };

        if let Some(send_err) = result.error {
            error!(
                event_id = event.id,
                error = %send_err,
                "Failed to send event to Kafka"
            );

            if let Err(e) = self
                .repo
                .update_event_status(event.id, OutboxStatus::Error, None)
                .await
            {
                error!(
                    event_id = event.id,
                    error = %e,
                    "Failed to update event status to error"
                );
            }
            return;
        }

        if let Err(e) = self
            .repo
            .update_event_status(event.id, OutboxStatus::Sent, Some(Utc::now()))
            .await
        {
            error!(
                event_id = event.id,
                error = %e,
                "Failed to update event status to sent"
            );
            return;
        }

        info!(event_id = event.id, "Event successfully processed and sent");
    }
}
