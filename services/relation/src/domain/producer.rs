//! 事件发布接口

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::domain::models::OutboxEvent;
use crate::error::RelationError;

/// 单条消息的投递结果
#[derive(Debug)]
pub struct SendResult {
    pub event_id: i64,
    pub error: Option<RelationError>,
}

impl SendResult {
    pub fn ok(event_id: i64) -> Self {
        Self {
            event_id,
            error: None,
        }
    }

    pub fn err(event_id: i64, error: RelationError) -> Self {
        Self {
            event_id,
            error: Some(error),
        }
    }
}

/// 事件生产者
///
/// send_message 立即返回一次性结果通道；通道恰好产出一个值。
/// 只有收到 broker 的逐条投递确认后才会发布结果；等待期间
/// 取消令牌被触发时产出取消错误（消息仍可能已被投递，最坏情形
/// 是下个轮询周期的重复投递）
pub trait EventProducer: Send + Sync {
    fn send_message(
        &self,
        cancel: CancellationToken,
        event: &OutboxEvent,
    ) -> oneshot::Receiver<SendResult>;
}
