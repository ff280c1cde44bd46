//! Unit of Work 模式
//!
//! 提供跨多个 Repository 的事务协调能力，确保操作的原子性。

use async_trait::async_trait;

use crate::domain::repository::{FollowRepository, OutboxRepository};
use crate::error::RelationResult;

/// Unit of Work trait
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// 开始新的事务
    async fn begin(&self) -> RelationResult<Box<dyn RelationTransaction>>;
}

/// 事务作用域
///
/// 返回的两个仓储共享同一个事务句柄，经由它们发出的写入一起提交或回滚
#[async_trait]
pub trait RelationTransaction: Send + Sync {
    /// 获取事务作用域的关注关系 Repository
    fn follow_repository(&self) -> &dyn FollowRepository;

    /// 获取事务作用域的 Outbox Repository
    fn outbox_repository(&self) -> &dyn OutboxRepository;

    /// 提交事务
    async fn commit(self: Box<Self>) -> RelationResult<()>;

    /// 回滚事务
    async fn rollback(self: Box<Self>) -> RelationResult<()>;
}
