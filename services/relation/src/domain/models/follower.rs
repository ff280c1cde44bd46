use chrono::{DateTime, Utc};

/// 关注关系边
///
/// 由 Follow 创建、Unfollow 销毁，从不更新
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Follower {
    pub id: i64,
    pub follower_id: i64,
    pub followee_id: i64,
    pub created_at: DateTime<Utc>,
}
