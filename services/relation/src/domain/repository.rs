//! 仓储接口

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::models::{EventType, Follower, OutboxEvent, OutboxStatus};
use crate::error::RelationResult;

/// 关注关系仓储
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// 创建关注边，返回带服务端生成 id 与时间戳的记录
    async fn create(&self, follower_id: i64, followee_id: i64) -> RelationResult<Follower>;

    /// 删除关注边，区分"边不存在"与删除失败
    async fn delete(&self, follower_id: i64, followee_id: i64) -> RelationResult<()>;

    /// 检查关注边是否存在
    async fn exists(&self, follower_id: i64, followee_id: i64) -> RelationResult<bool>;

    /// 分页查询粉丝 id 列表（created_at 降序），返回 (ids, total)
    async fn get_followers(
        &self,
        followee_id: i64,
        limit: i32,
        offset: i32,
    ) -> RelationResult<(Vec<i64>, i64)>;

    /// 分页查询关注对象 id 列表（created_at 降序），返回 (ids, total)
    async fn get_followees(
        &self,
        follower_id: i64,
        limit: i32,
        offset: i32,
    ) -> RelationResult<(Vec<i64>, i64)>;
}

/// Outbox 仓储
///
/// status 列只由中继修改
#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// 写入新事件（status=new，id 与 created_at 由数据库生成）
    async fn add_event(
        &self,
        aggregate_id: i64,
        event_type: EventType,
        payload: &serde_json::Value,
    ) -> RelationResult<()>;

    /// 取待处理事件：status='new'，created_at 升序，不加行锁
    /// （单实例部署假设；多实例需 FOR UPDATE SKIP LOCKED）
    async fn get_events_for_processing(&self, limit: i64) -> RelationResult<Vec<OutboxEvent>>;

    /// 标记事件为 pending
    async fn mark_event_as_pending(&self, event_id: i64) -> RelationResult<()>;

    /// 终态写回：sent 必须携带 sent_at，其余状态不允许携带
    async fn update_event_status(
        &self,
        event_id: i64,
        status: OutboxStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> RelationResult<()>;
}
