//! 关注关系仓储 PostgreSQL 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};
use weave_bootstrap::DbQueryTimer;

use super::{run_query, PgDb};
use crate::domain::models::Follower;
use crate::domain::repository::FollowRepository;
use crate::error::{RelationError, RelationResult};

pub struct PostgresFollowRepository {
    db: PgDb,
}

impl PostgresFollowRepository {
    pub fn new(db: PgDb) -> Self {
        Self { db }
    }
}

#[derive(sqlx::FromRow)]
struct FollowerRow {
    id: i64,
    follower_id: i64,
    followee_id: i64,
    created_at: DateTime<Utc>,
}

impl From<FollowerRow> for Follower {
    fn from(row: FollowerRow) -> Self {
        Self {
            id: row.id,
            follower_id: row.follower_id,
            followee_id: row.followee_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl FollowRepository for PostgresFollowRepository {
    async fn create(&self, follower_id: i64, followee_id: i64) -> RelationResult<Follower> {
        let timer = DbQueryTimer::new("create_follow_relation");

        if follower_id == followee_id {
            error!(user_id = follower_id, "Attempt to follow yourself");
            timer.finish(false);
            return Err(RelationError::SelfFollow);
        }

        // 冲突行不返回任何行，重复判定由服务层的 exists 预检负责
        let query = sqlx::query_as::<_, FollowerRow>(
            r#"
            INSERT INTO followers (follower_id, followee_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (follower_id, followee_id) DO NOTHING
            RETURNING id, follower_id, followee_id, created_at
            "#,
        )
        .bind(follower_id)
        .bind(followee_id);

        let row = match run_query!(&self.db, query, fetch_optional) {
            Ok(row) => row,
            Err(e) => {
                error!(
                    follower_id,
                    followee_id,
                    error = %e,
                    "Failed to create follow relation"
                );
                timer.finish(false);
                return Err(RelationError::FollowRelationCreateFail);
            }
        };

        let Some(row) = row else {
            timer.finish(false);
            return Err(RelationError::FollowRelationCreateFail);
        };

        info!(follower_id, followee_id, "Follow relation created successfully");
        timer.finish(true);
        Ok(row.into())
    }

    async fn delete(&self, follower_id: i64, followee_id: i64) -> RelationResult<()> {
        let timer = DbQueryTimer::new("delete_follow_relation");

        let query = sqlx::query(
            r#"
            DELETE FROM followers
            WHERE follower_id = $1 AND followee_id = $2
            "#,
        )
        .bind(follower_id)
        .bind(followee_id);

        let result = match run_query!(&self.db, query, execute) {
            Ok(result) => result,
            Err(e) => {
                error!(
                    follower_id,
                    followee_id,
                    error = %e,
                    "Failed to delete follow relation"
                );
                timer.finish(false);
                return Err(RelationError::FollowRelationDeleteFail);
            }
        };

        if result.rows_affected() == 0 {
            debug!(follower_id, followee_id, "Follow relation not found");
            timer.finish(false);
            return Err(RelationError::FollowRelationNotFound);
        }

        info!(follower_id, followee_id, "Follow relation deleted successfully");
        timer.finish(true);
        Ok(())
    }

    async fn exists(&self, follower_id: i64, followee_id: i64) -> RelationResult<bool> {
        let timer = DbQueryTimer::new("check_follow_relation_exists");

        let query = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM followers
                WHERE follower_id = $1 AND followee_id = $2
            )
            "#,
        )
        .bind(follower_id)
        .bind(followee_id);

        match run_query!(&self.db, query, fetch_one) {
            Ok(exists) => {
                debug!(follower_id, followee_id, exists, "Follow relation check completed");
                timer.finish(true);
                Ok(exists)
            }
            Err(e) => {
                error!(
                    follower_id,
                    followee_id,
                    error = %e,
                    "Failed to check follow relation existence"
                );
                timer.finish(false);
                Err(RelationError::DatabaseQuery)
            }
        }
    }

    async fn get_followers(
        &self,
        followee_id: i64,
        limit: i32,
        offset: i32,
    ) -> RelationResult<(Vec<i64>, i64)> {
        let timer = DbQueryTimer::new("get_followers");

        let query = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                follower_id,
                COUNT(*) OVER() AS total_count
            FROM followers
            WHERE followee_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(followee_id)
        .bind(limit)
        .bind(offset);

        let rows = match run_query!(&self.db, query, fetch_all) {
            Ok(rows) => rows,
            Err(e) => {
                error!(followee_id, error = %e, "Failed to query followers");
                timer.finish(false);
                return Err(RelationError::DatabaseQuery);
            }
        };

        let mut total = rows.first().map(|(_, total)| *total).unwrap_or(0);
        let followers: Vec<i64> = rows.into_iter().map(|(id, _)| id).collect();

        // 越界页返回空集，窗口函数无行可用，改用单独 COUNT 求总数
        if followers.is_empty() {
            let count_query =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM followers WHERE followee_id = $1")
                    .bind(followee_id);

            total = match run_query!(&self.db, count_query, fetch_one) {
                Ok(count) => count,
                Err(e) => {
                    error!(followee_id, error = %e, "Failed to count followers for empty result");
                    timer.finish(false);
                    return Err(RelationError::DatabaseQuery);
                }
            };
        }

        info!(
            followee_id,
            count = followers.len(),
            total,
            "Successfully retrieved followers"
        );
        timer.finish(true);
        Ok((followers, total))
    }

    async fn get_followees(
        &self,
        follower_id: i64,
        limit: i32,
        offset: i32,
    ) -> RelationResult<(Vec<i64>, i64)> {
        let timer = DbQueryTimer::new("get_followees");

        let query = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                followee_id,
                COUNT(*) OVER() AS total_count
            FROM followers
            WHERE follower_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(follower_id)
        .bind(limit)
        .bind(offset);

        let rows = match run_query!(&self.db, query, fetch_all) {
            Ok(rows) => rows,
            Err(e) => {
                error!(follower_id, error = %e, "Failed to query followees");
                timer.finish(false);
                return Err(RelationError::DatabaseQuery);
            }
        };

        let mut total = rows.first().map(|(_, total)| *total).unwrap_or(0);
        let followees: Vec<i64> = rows.into_iter().map(|(id, _)| id).collect();

        if followees.is_empty() {
            let count_query =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM followers WHERE follower_id = $1")
                    .bind(follower_id);

            total = match run_query!(&self.db, count_query, fetch_one) {
                Ok(count) => count,
                Err(e) => {
                    error!(follower_id, error = %e, "Failed to count followees for empty result");
                    timer.finish(false);
                    return Err(RelationError::DatabaseQuery);
                }
            };
        }

        info!(
            follower_id,
            count = followees.len(),
            total,
            "Successfully retrieved followees"
        );
        timer.finish(true);
        Ok((followees, total))
    }
}
