//! 关注关系应用服务
//!
//! 业务规则（自关注、重复关注）与 UoW + 事件发射的编排

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info};
use weave_bootstrap::record_relation_operation;

use crate::application::pagination::set_pagination_defaults;
use crate::domain::models::{EventType, FollowCreatedPayload, User};
use crate::domain::repository::FollowRepository;
use crate::domain::unit_of_work::{RelationTransaction, UnitOfWork};
use crate::domain::user_client::UserClient;
use crate::error::{RelationError, RelationResult};

/// 关注关系用例
#[async_trait]
pub trait RelationUseCase: Send + Sync {
    async fn follow(&self, follower_id: i64, followee_id: i64) -> RelationResult<()>;

    async fn unfollow(&self, follower_id: i64, followee_id: i64) -> RelationResult<()>;

    async fn get_followers(
        &self,
        followee_id: i64,
        limit: i32,
        page: i32,
    ) -> RelationResult<(Vec<User>, i64)>;

    async fn get_followees(
        &self,
        follower_id: i64,
        limit: i32,
        page: i32,
    ) -> RelationResult<(Vec<User>, i64)>;
}

pub struct FollowService {
    follow_repo: Arc<dyn FollowRepository>,
    uow: Arc<dyn UnitOfWork>,
    user_client: Arc<dyn UserClient>,
}

impl FollowService {
    pub fn new(
        follow_repo: Arc<dyn FollowRepository>,
        uow: Arc<dyn UnitOfWork>,
        user_client: Arc<dyn UserClient>,
    ) -> Self {
        Self {
            follow_repo,
            uow,
            user_client,
        }
    }

    /// 校验目标用户存在
    async fn ensure_user_exists(&self, user_id: i64) -> RelationResult<()> {
        match self.user_client.get_user(user_id).await {
            Ok(_) => Ok(()),
            Err(RelationError::UserNotFound) => {
                debug!(user_id, "User not found");
                Err(RelationError::UserNotFound)
            }
            Err(e) => {
                error!(user_id, error = %e, "Failed to get user");
                Err(e)
            }
        }
    }

    /// 在事务作用域内写入关注边与 outbox 事件
    async fn stage_follow(
        &self,
        tx: &dyn RelationTransaction,
        follower_id: i64,
        followee_id: i64,
    ) -> RelationResult<()> {
        let follow_repo = tx.follow_repository();
        let outbox_repo = tx.outbox_repository();

        let exists = follow_repo.exists(follower_id, followee_id).await.map_err(|e| {
            error!(error = %e, "Error checking follow existence");
            e
        })?;
        if exists {
            return Err(RelationError::AlreadyFollowing);
        }

        let follower = follow_repo.create(follower_id, followee_id).await.map_err(|e| {
            error!(error = %e, "Error creating follow relationship");
            e
        })?;

        let payload = serde_json::to_value(FollowCreatedPayload {
            follower_id: follower.follower_id,
            followee_id: follower.followee_id,
            timestamptz: Utc::now(),
        })
        .map_err(|e| RelationError::Internal(e.to_string()))?;

        outbox_repo
            .add_event(follower.id, EventType::FollowCreated, &payload)
            .await
            .map_err(|e| {
                error!(error = %e, "Error adding event to outbox");
                e
            })?;

        Ok(())
    }

    async fn do_follow(&self, follower_id: i64, followee_id: i64) -> RelationResult<()> {
        info!(follower_id, followee_id, "Follow request received");

        if follower_id == followee_id {
            return Err(RelationError::SelfFollow);
        }

        self.ensure_user_exists(followee_id).await?;

        let tx = self.uow.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction");
            RelationError::DatabaseQuery
        })?;

        match self.stage_follow(tx.as_ref(), follower_id, followee_id).await {
            Ok(()) => {
                tx.commit().await.map_err(|e| {
                    error!(error = %e, "Failed to commit transaction");
                    RelationError::DatabaseQuery
                })?;
            }
            Err(e) => {
                if let Err(rb_err) = tx.rollback().await {
                    error!(error = %rb_err, "Failed to rollback transaction");
                }
                return Err(e);
            }
        }

        info!(follower_id, followee_id, "Follow relationship created successfully");
        Ok(())
    }

    async fn do_unfollow(&self, follower_id: i64, followee_id: i64) -> RelationResult<()> {
        info!(follower_id, followee_id, "Unfollow request received");

        if follower_id == followee_id {
            return Err(RelationError::SelfUnfollow);
        }

        let exists = self
            .follow_repo
            .exists(follower_id, followee_id)
            .await
            .map_err(|e| {
                error!(error = %e, "Error checking follow existence");
                e
            })?;
        if !exists {
            return Err(RelationError::FollowRelationNotFound);
        }

        self.follow_repo
            .delete(follower_id, followee_id)
            .await
            .map_err(|e| {
                error!(error = %e, "Error deleting follow relationship");
                e
            })?;

        info!(follower_id, followee_id, "Follow relationship deleted successfully");
        Ok(())
    }

    /// 逐行补全用户档案；单行失败以占位用户替代，不整页失败
    async fn enrich_users(&self, ids: Vec<i64>) -> Vec<User> {
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            let user = match self.user_client.get_user(id).await {
                Ok(user) => user,
                Err(e) => {
                    error!(user_id = id, error = %e, "Failed to get user for listing");
                    User::missing(id)
                }
            };
            users.push(user);
        }
        users
    }
}

#[async_trait]
impl RelationUseCase for FollowService {
    async fn follow(&self, follower_id: i64, followee_id: i64) -> RelationResult<()> {
        let result = self.do_follow(follower_id, followee_id).await;
        record_relation_operation("follow", result.is_ok());
        result
    }

    async fn unfollow(&self, follower_id: i64, followee_id: i64) -> RelationResult<()> {
        let result = self.do_unfollow(follower_id, followee_id).await;
        record_relation_operation("unfollow", result.is_ok());
        result
    }

    async fn get_followers(
        &self,
        followee_id: i64,
        limit: i32,
        page: i32,
    ) -> RelationResult<(Vec<User>, i64)> {
        info!(followee_id, "GetFollowers request received");

        self.ensure_user_exists(followee_id).await?;

        let (limit, offset) = set_pagination_defaults(limit, page);
        let (follower_ids, total) = self
            .follow_repo
            .get_followers(followee_id, limit, offset)
            .await
            .map_err(|e| {
                error!(error = %e, "Error getting followers");
                e
            })?;

        let followers = self.enrich_users(follower_ids).await;

        info!(
            followee_id,
            count = followers.len(),
            total,
            "Followers retrieved successfully"
        );
        Ok((followers, total))
    }

    async fn get_followees(
        &self,
        follower_id: i64,
        limit: i32,
        page: i32,
    ) -> RelationResult<(Vec<User>, i64)> {
        info!(follower_id, "GetFollowees request received");

        self.ensure_user_exists(follower_id).await?;

        let (limit, offset) = set_pagination_defaults(limit, page);
        let (followee_ids, total) = self
            .follow_repo
            .get_followees(follower_id, limit, offset)
            .await
            .map_err(|e| {
                error!(error = %e, "Error getting followees");
                e
            })?;

        let followees = self.enrich_users(followee_ids).await;

        info!(
            follower_id,
            count = followees.len(),
            total,
            "Followees retrieved successfully"
        );
        Ok((followees, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use crate::domain::models::Follower;
    use crate::domain::repository::OutboxRepository;

    /// 事务内外共享的存储状态
    #[derive(Default)]
    struct StoreState {
        edges: Mutex<HashSet<(i64, i64)>>,
        next_id: Mutex<i64>,
        outbox: Mutex<Vec<(i64, EventType, serde_json::Value)>>,
        committed: Mutex<u32>,
        rolled_back: Mutex<u32>,
        fail_commit: bool,
        last_page_args: Mutex<Option<(i32, i32)>>,
        listing: Mutex<(Vec<i64>, i64)>,
    }

    struct MockFollowRepository {
        state: Arc<StoreState>,
    }

    #[async_trait]
    impl FollowRepository for MockFollowRepository {
        async fn create(&self, follower_id: i64, followee_id: i64) -> RelationResult<Follower> {
            if follower_id == followee_id {
                return Err(RelationError::SelfFollow);
            }
            let mut edges = self.state.edges.lock().unwrap();
            if !edges.insert((follower_id, followee_id)) {
                return Err(RelationError::FollowRelationCreateFail);
            }
            let mut next_id = self.state.next_id.lock().unwrap();
            *next_id += 1;
            Ok(Follower {
                id: *next_id,
                follower_id,
                followee_id,
                created_at: Utc::now(),
            })
        }

        async fn delete(&self, follower_id: i64, followee_id: i64) -> RelationResult<()> {
            let mut edges = self.state.edges.lock().unwrap();
            if !edges.remove(&(follower_id, followee_id)) {
                return Err(RelationError::FollowRelationNotFound);
            }
            Ok(())
        }

        async fn exists(&self, follower_id: i64, followee_id: i64) -> RelationResult<bool> {
            Ok(self
                .state
                .edges
                .lock()
                .unwrap()
                .contains(&(follower_id, followee_id)))
        }

        async fn get_followers(
            &self,
            _followee_id: i64,
            limit: i32,
            offset: i32,
        ) -> RelationResult<(Vec<i64>, i64)> {
            *self.state.last_page_args.lock().unwrap() = Some((limit, offset));
            Ok(self.state.listing.lock().unwrap().clone())
        }

        async fn get_followees(
            &self,
            _follower_id: i64,
            limit: i32,
            offset: i32,
        ) -> RelationResult<(Vec<i64>, i64)> {
            *self.state.last_page_args.lock().unwrap() = Some((limit, offset));
            Ok(self.state.listing.lock().unwrap().clone())
        }
    }

    struct MockOutboxRepository {
        state: Arc<StoreState>,
    }

    #[async_trait]
    impl OutboxRepository for MockOutboxRepository {
        async fn add_event(
            &self,
            aggregate_id: i64,
            event_type: EventType,
            payload: &serde_json::Value,
        ) -> RelationResult<()> {
            self.state
                .outbox
                .lock()
                .unwrap()
                .push((aggregate_id, event_type, payload.clone()));
            Ok(())
        }

        async fn get_events_for_processing(
            &self,
            _limit: i64,
        ) -> RelationResult<Vec<crate::domain::models::OutboxEvent>> {
            Ok(vec![])
        }

        async fn mark_event_as_pending(&self, _event_id: i64) -> RelationResult<()> {
            Ok(())
        }

        async fn update_event_status(
            &self,
            _event_id: i64,
            _status: crate::domain::models::OutboxStatus,
            _sent_at: Option<chrono::DateTime<Utc>>,
        ) -> RelationResult<()> {
            Ok(())
        }
    }

    struct MockTransaction {
        state: Arc<StoreState>,
        follow_repo: MockFollowRepository,
        outbox_repo: MockOutboxRepository,
    }

    #[async_trait]
    impl RelationTransaction for MockTransaction {
        fn follow_repository(&self) -> &dyn FollowRepository {
            &self.follow_repo
        }

        fn outbox_repository(&self) -> &dyn OutboxRepository {
            &self.outbox_repo
        }

        async fn commit(self: Box<Self>) -> RelationResult<()> {
            if self.state.fail_commit {
                return Err(RelationError::DatabaseQuery);
            }
            *self.state.committed.lock().unwrap() += 1;
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> RelationResult<()> {
            *self.state.rolled_back.lock().unwrap() += 1;
            Ok(())
        }
    }

    struct MockUnitOfWork {
        state: Arc<StoreState>,
    }

    #[async_trait]
    impl UnitOfWork for MockUnitOfWork {
        async fn begin(&self) -> RelationResult<Box<dyn RelationTransaction>> {
            Ok(Box::new(MockTransaction {
                state: self.state.clone(),
                follow_repo: MockFollowRepository {
                    state: self.state.clone(),
                },
                outbox_repo: MockOutboxRepository {
                    state: self.state.clone(),
                },
            }))
        }
    }

    struct MockUserClient {
        known: HashSet<i64>,
        failing: HashSet<i64>,
    }

    impl MockUserClient {
        fn with_users(ids: &[i64]) -> Self {
            Self {
                known: ids.iter().copied().collect(),
                failing: HashSet::new(),
            }
        }
    }

    #[async_trait]
    impl UserClient for MockUserClient {
        async fn get_user(&self, id: i64) -> RelationResult<User> {
            if self.failing.contains(&id) {
                return Err(RelationError::ExternalService);
            }
            if !self.known.contains(&id) {
                return Err(RelationError::UserNotFound);
            }
            Ok(User {
                id,
                username: format!("user-{}", id),
                email: format!("user-{}@example.com", id),
                avatar_url: None,
            })
        }
    }

    fn service_with(state: Arc<StoreState>, users: MockUserClient) -> FollowService {
        FollowService::new(
            Arc::new(MockFollowRepository {
                state: state.clone(),
            }),
            Arc::new(MockUnitOfWork { state }),
            Arc::new(users),
        )
    }

    #[tokio::test]
    async fn test_follow_creates_edge_and_outbox_event() {
        let state = Arc::new(StoreState::default());
        let service = service_with(state.clone(), MockUserClient::with_users(&[1, 2]));

        service.follow(1, 2).await.unwrap();

        assert!(state.edges.lock().unwrap().contains(&(1, 2)));
        let outbox = state.outbox.lock().unwrap();
        assert_eq!(outbox.len(), 1);

        let (aggregate_id, event_type, payload) = &outbox[0];
        assert_eq!(*aggregate_id, 1);
        assert_eq!(*event_type, EventType::FollowCreated);
        assert_eq!(payload["follower_id"], 1);
        assert_eq!(payload["followee_id"], 2);
        assert!(payload["timestamptz"].is_string());

        assert_eq!(*state.committed.lock().unwrap(), 1);
        assert_eq!(*state.rolled_back.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_follow_self_is_rejected_without_side_effects() {
        let state = Arc::new(StoreState::default());
        let service = service_with(state.clone(), MockUserClient::with_users(&[7]));

        let err = service.follow(7, 7).await.unwrap_err();

        assert_eq!(err, RelationError::SelfFollow);
        assert!(state.edges.lock().unwrap().is_empty());
        assert!(state.outbox.lock().unwrap().is_empty());
        assert_eq!(*state.committed.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_follow_duplicate_adds_no_outbox_row() {
        let state = Arc::new(StoreState::default());
        let service = service_with(state.clone(), MockUserClient::with_users(&[1, 2]));

        service.follow(1, 2).await.unwrap();
        let err = service.follow(1, 2).await.unwrap_err();

        assert_eq!(err, RelationError::AlreadyFollowing);
        assert_eq!(state.edges.lock().unwrap().len(), 1);
        assert_eq!(state.outbox.lock().unwrap().len(), 1);
        assert_eq!(*state.rolled_back.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_follow_unknown_user_writes_nothing() {
        let state = Arc::new(StoreState::default());
        let service = service_with(state.clone(), MockUserClient::with_users(&[1]));

        let err = service.follow(1, 99999).await.unwrap_err();

        assert_eq!(err, RelationError::UserNotFound);
        assert!(state.edges.lock().unwrap().is_empty());
        assert!(state.outbox.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_follow_commit_failure_maps_to_database_query() {
        let state = Arc::new(StoreState {
            fail_commit: true,
            ..Default::default()
        });
        let service = service_with(state.clone(), MockUserClient::with_users(&[1, 2]));

        let err = service.follow(1, 2).await.unwrap_err();

        assert_eq!(err, RelationError::DatabaseQuery);
    }

    #[tokio::test]
    async fn test_unfollow_removes_edge() {
        let state = Arc::new(StoreState::default());
        state.edges.lock().unwrap().insert((1, 2));
        let service = service_with(state.clone(), MockUserClient::with_users(&[1, 2]));

        service.unfollow(1, 2).await.unwrap();

        assert!(state.edges.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unfollow_missing_edge_has_no_side_effects() {
        let state = Arc::new(StoreState::default());
        let service = service_with(state.clone(), MockUserClient::with_users(&[1, 2]));

        let err = service.unfollow(1, 2).await.unwrap_err();

        assert_eq!(err, RelationError::FollowRelationNotFound);
        assert!(state.outbox.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unfollow_self_is_rejected() {
        let state = Arc::new(StoreState::default());
        let service = service_with(state.clone(), MockUserClient::with_users(&[3]));

        let err = service.unfollow(3, 3).await.unwrap_err();

        assert_eq!(err, RelationError::SelfUnfollow);
    }

    #[tokio::test]
    async fn test_get_followers_substitutes_placeholder_on_lookup_failure() {
        let state = Arc::new(StoreState::default());
        *state.listing.lock().unwrap() = (vec![1, 5], 2);

        let mut users = MockUserClient::with_users(&[1, 2, 5]);
        users.failing.insert(5);
        let service = service_with(state.clone(), users);

        let (followers, total) = service.get_followers(2, 10, 1).await.unwrap();

        assert_eq!(total, 2);
        assert_eq!(followers.len(), 2);
        assert_eq!(followers[0].username, "user-1");
        assert_eq!(followers[1].username, "Missing user");
        assert_eq!(followers[1].email, "Missing user");
        assert_eq!(followers[1].id, 5);
    }

    #[tokio::test]
    async fn test_get_followers_unknown_subject() {
        let state = Arc::new(StoreState::default());
        let service = service_with(state.clone(), MockUserClient::with_users(&[]));

        let err = service.get_followers(42, 10, 1).await.unwrap_err();

        assert_eq!(err, RelationError::UserNotFound);
    }

    #[tokio::test]
    async fn test_get_followees_applies_pagination_defaults() {
        let state = Arc::new(StoreState::default());
        let service = service_with(state.clone(), MockUserClient::with_users(&[9]));

        service.get_followees(9, 0, 0).await.unwrap();
        assert_eq!(*state.last_page_args.lock().unwrap(), Some((20, 0)));

        service.get_followees(9, 10, 3).await.unwrap();
        assert_eq!(*state.last_page_args.lock().unwrap(), Some((10, 20)));
    }
}
