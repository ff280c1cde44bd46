//! 数据库错误映射工具

use crate::error::RelationError;

/// 将 SQLx 错误转换为领域错误
pub fn map_sqlx_error(e: sqlx::Error) -> RelationError {
    match e {
        sqlx::Error::RowNotFound => RelationError::FollowRelationNotFound,
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // 唯一约束冲突：并发下重复关注
            Some("23505") => RelationError::AlreadyFollowing,
            _ => RelationError::DatabaseQuery,
        },
        _ => RelationError::DatabaseQuery,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found() {
        let err = map_sqlx_error(sqlx::Error::RowNotFound);
        assert_eq!(err, RelationError::FollowRelationNotFound);
    }

    #[test]
    fn test_pool_timeout_is_database_query() {
        let err = map_sqlx_error(sqlx::Error::PoolTimedOut);
        assert_eq!(err, RelationError::DatabaseQuery);
    }
}
