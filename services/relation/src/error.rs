//! 关注关系服务错误分类

use thiserror::Error;
use weave_errors::AppError;

/// 领域错误
///
/// 基础设施类错误携带原始类别向上传播，业务规则返回具体类别；
/// 中继层从不向调用方抛错，只落库为 error 状态并记日志
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelationError {
    #[error("validation failed")]
    ValidationFailed,
    #[error("cannot follow yourself")]
    SelfFollow,
    #[error("cannot unfollow yourself")]
    SelfUnfollow,
    #[error("user not found")]
    UserNotFound,
    #[error("follow relation not found")]
    FollowRelationNotFound,
    #[error("already following this user")]
    AlreadyFollowing,
    #[error("database query error")]
    DatabaseQuery,
    #[error("failed to create follow relation")]
    FollowRelationCreateFail,
    #[error("failed to delete follow relation")]
    FollowRelationDeleteFail,
    #[error("external service error")]
    ExternalService,
    #[error("unexpected event on delivery channel")]
    UnexpectedEventType,
    #[error("failed to deliver message: {0}")]
    Publish(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("internal service error: {0}")]
    Internal(String),
}

impl From<RelationError> for AppError {
    fn from(error: RelationError) -> Self {
        match error {
            RelationError::ValidationFailed
            | RelationError::SelfFollow
            | RelationError::SelfUnfollow => AppError::validation(error.to_string()),
            RelationError::UserNotFound | RelationError::FollowRelationNotFound => {
                AppError::not_found(error.to_string())
            }
            RelationError::AlreadyFollowing => AppError::conflict(error.to_string()),
            RelationError::DatabaseQuery
            | RelationError::FollowRelationCreateFail
            | RelationError::FollowRelationDeleteFail => AppError::database(error.to_string()),
            RelationError::ExternalService => AppError::external_service(error.to_string()),
            RelationError::UnexpectedEventType
            | RelationError::Publish(_)
            | RelationError::Cancelled
            | RelationError::Internal(_) => AppError::internal(error.to_string()),
        }
    }
}

/// Result 类型别名
pub type RelationResult<T> = Result<T, RelationError>;
