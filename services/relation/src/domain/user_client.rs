//! 上游用户服务接口

use async_trait::async_trait;

use crate::domain::models::User;
use crate::error::RelationResult;

/// 用户服务客户端
#[async_trait]
pub trait UserClient: Send + Sync {
    /// 按 id 查询用户；不存在返回 UserNotFound，其他失败返回 ExternalService
    async fn get_user(&self, id: i64) -> RelationResult<User>;
}
