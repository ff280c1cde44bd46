//! 关注关系 gRPC 服务实现

use std::sync::Arc;

use tonic::{Request, Response, Status};
use weave_bootstrap::RequestTimer;

use super::recover;
use crate::api::proto::relation::{
    relation_service_server::RelationService, FollowRequest, FollowResponse, GetFolloweesRequest,
    GetFolloweesResponse, GetFollowersRequest, GetFollowersResponse, UnfollowRequest,
    UnfollowResponse, User as ProtoUser,
};
use crate::application::RelationUseCase;
use crate::domain::models::User;
use crate::error::RelationError;

/// RPC 层分页上限
const MAX_PAGE_LIMIT: i32 = 100;

pub struct RelationServiceImpl {
    service: Arc<dyn RelationUseCase>,
}

impl RelationServiceImpl {
    pub fn new(service: Arc<dyn RelationUseCase>) -> Self {
        Self { service }
    }
}

fn user_to_proto(user: User) -> ProtoUser {
    ProtoUser {
        id: user.id,
        username: user.username,
        email: user.email,
        avatar_url: user.avatar_url,
    }
}

/// 分页请求参数校验：id > 0，0 < limit <= 100，page >= 1
fn validate_page_request(id: i64, limit: i32, page: i32) -> Result<(), Status> {
    if id <= 0 || limit <= 0 || limit > MAX_PAGE_LIMIT || page < 1 {
        return Err(Status::invalid_argument(
            RelationError::ValidationFailed.to_string(),
        ));
    }
    Ok(())
}

impl RelationServiceImpl {
    async fn handle_follow(&self, request: Request<FollowRequest>) -> Result<Response<FollowResponse>, Status> {
        let timer = RequestTimer::new("Follow");
        let req = request.into_inner();

        if req.follower_id <= 0 || req.followee_id <= 0 || req.follower_id == req.followee_id {
            timer.finish("invalid_argument");
            return Err(Status::invalid_argument("invalid request"));
        }

        match self.service.follow(req.follower_id, req.followee_id).await {
            Ok(()) => {
                timer.finish("ok");
                Ok(Response::new(FollowResponse {}))
            }
            Err(e) => {
                timer.finish("error");
                Err(match e {
                    RelationError::SelfFollow => {
                        Status::invalid_argument("cannot follow yourself")
                    }
                    RelationError::AlreadyFollowing => {
                        Status::already_exists("already following this user")
                    }
                    RelationError::UserNotFound => Status::not_found("user not found"),
                    _ => Status::internal("failed to follow user"),
                })
            }
        }
    }

    async fn handle_unfollow(
        &self,
        request: Request<UnfollowRequest>,
    ) -> Result<Response<UnfollowResponse>, Status> {
        let timer = RequestTimer::new("Unfollow");
        let req = request.into_inner();

        if req.follower_id <= 0 || req.followee_id <= 0 {
            timer.finish("invalid_argument");
            return Err(Status::invalid_argument("invalid request"));
        }

        match self.service.unfollow(req.follower_id, req.followee_id).await {
            Ok(()) => {
                timer.finish("ok");
                Ok(Response::new(UnfollowResponse {}))
            }
            Err(e) => {
                timer.finish("error");
                Err(match e {
                    RelationError::FollowRelationNotFound => {
                        Status::not_found(RelationError::FollowRelationNotFound.to_string())
                    }
                    RelationError::UserNotFound => {
                        Status::not_found(RelationError::UserNotFound.to_string())
                    }
                    RelationError::SelfUnfollow => {
                        Status::invalid_argument(RelationError::SelfUnfollow.to_string())
                    }
                    _ => Status::internal("internal service error"),
                })
            }
        }
    }

    async fn handle_get_followers(
        &self,
        request: Request<GetFollowersRequest>,
    ) -> Result<Response<GetFollowersResponse>, Status> {
        let timer = RequestTimer::new("GetFollowers");
        let req = request.into_inner();

        if let Err(status) = validate_page_request(req.followee_id, req.limit, req.page) {
            timer.finish("invalid_argument");
            return Err(status);
        }

        match self
            .service
            .get_followers(req.followee_id, req.limit, req.page)
            .await
        {
            Ok((followers, total)) => {
                timer.finish("ok");
                Ok(Response::new(GetFollowersResponse {
                    followers: followers.into_iter().map(user_to_proto).collect(),
                    total,
                }))
            }
            Err(e) => {
                timer.finish("error");
                Err(map_listing_error(e))
            }
        }
    }

    async fn handle_get_followees(
        &self,
        request: Request<GetFolloweesRequest>,
    ) -> Result<Response<GetFolloweesResponse>, Status> {
        let timer = RequestTimer::new("GetFollowees");
        let req = request.into_inner();

        if let Err(status) = validate_page_request(req.follower_id, req.limit, req.page) {
            timer.finish("invalid_argument");
            return Err(status);
        }

        match self
            .service
            .get_followees(req.follower_id, req.limit, req.page)
            .await
        {
            Ok((followees, total)) => {
                timer.finish("ok");
                Ok(Response::new(GetFolloweesResponse {
                    followees: followees.into_iter().map(user_to_proto).collect(),
                    total,
                }))
            }
            Err(e) => {
                timer.finish("error");
                Err(map_listing_error(e))
            }
        }
    }
}

fn map_listing_error(e: RelationError) -> Status {
    match e {
        RelationError::UserNotFound => Status::not_found(RelationError::UserNotFound.to_string()),
        RelationError::DatabaseQuery => Status::internal(RelationError::DatabaseQuery.to_string()),
        _ => Status::internal("internal service error"),
    }
}

#[tonic::async_trait]
impl RelationService for RelationServiceImpl {
    async fn follow(
        &self,
        request: Request<FollowRequest>,
    ) -> Result<Response<FollowResponse>, Status> {
        recover("Follow", self.handle_follow(request)).await
    }

    async fn unfollow(
        &self,
        request: Request<UnfollowRequest>,
    ) -> Result<Response<UnfollowResponse>, Status> {
        recover("Unfollow", self.handle_unfollow(request)).await
    }

    async fn get_followers(
        &self,
        request: Request<GetFollowersRequest>,
    ) -> Result<Response<GetFollowersResponse>, Status> {
        recover("GetFollowers", self.handle_get_followers(request)).await
    }

    async fn get_followees(
        &self,
        request: Request<GetFolloweesRequest>,
    ) -> Result<Response<GetFolloweesResponse>, Status> {
        recover("GetFollowees", self.handle_get_followees(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tonic::Code;

    use crate::error::RelationResult;

    #[derive(Default)]
    struct MockUseCase {
        follow_result: Mutex<Option<RelationError>>,
        unfollow_result: Mutex<Option<RelationError>>,
        listing_result: Mutex<Option<RelationError>>,
        calls: Mutex<u32>,
        panic_on_call: bool,
    }

    impl MockUseCase {
        fn failing_follow(err: RelationError) -> Self {
            Self {
                follow_result: Mutex::new(Some(err)),
                ..Default::default()
            }
        }

        fn failing_unfollow(err: RelationError) -> Self {
            Self {
                unfollow_result: Mutex::new(Some(err)),
                ..Default::default()
            }
        }

        fn failing_listing(err: RelationError) -> Self {
            Self {
                listing_result: Mutex::new(Some(err)),
                ..Default::default()
            }
        }

        fn panicking() -> Self {
            Self {
                panic_on_call: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }

        fn record_call(&self) {
            *self.calls.lock().unwrap() += 1;
            if self.panic_on_call {
                panic!("handler blew up");
            }
        }
    }

    #[async_trait]
    impl RelationUseCase for MockUseCase {
        async fn follow(&self, _follower_id: i64, _followee_id: i64) -> RelationResult<()> {
            self.record_call();
            match self.follow_result.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        async fn unfollow(&self, _follower_id: i64, _followee_id: i64) -> RelationResult<()> {
            self.record_call();
            match self.unfollow_result.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        async fn get_followers(
            &self,
            _followee_id: i64,
            _limit: i32,
            _page: i32,
        ) -> RelationResult<(Vec<User>, i64)> {
            self.record_call();
            match self.listing_result.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok((
                    vec![User {
                        id: 1,
                        username: "user-1".to_string(),
                        email: "user-1@example.com".to_string(),
                        avatar_url: None,
                    }],
                    1,
                )),
            }
        }

        async fn get_followees(
            &self,
            _follower_id: i64,
            _limit: i32,
            _page: i32,
        ) -> RelationResult<(Vec<User>, i64)> {
            self.record_call();
            match self.listing_result.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok((vec![], 0)),
            }
        }
    }

    fn api_with(mock: Arc<MockUseCase>) -> RelationServiceImpl {
        RelationServiceImpl::new(mock)
    }

    #[tokio::test]
    async fn test_follow_rejects_invalid_ids_before_service() {
        let mock = Arc::new(MockUseCase::default());
        let api = api_with(mock.clone());

        for (follower_id, followee_id) in [(0, 2), (1, 0), (-3, 2), (5, 5)] {
            let status = api
                .follow(Request::new(FollowRequest {
                    follower_id,
                    followee_id,
                }))
                .await
                .unwrap_err();
            assert_eq!(status.code(), Code::InvalidArgument);
        }

        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_follow_success() {
        let mock = Arc::new(MockUseCase::default());
        let api = api_with(mock.clone());

        let response = api
            .follow(Request::new(FollowRequest {
                follower_id: 1,
                followee_id: 2,
            }))
            .await
            .unwrap();

        let _ = response.into_inner();
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_follow_error_mapping() {
        let cases = [
            (RelationError::SelfFollow, Code::InvalidArgument),
            (RelationError::AlreadyFollowing, Code::AlreadyExists),
            (RelationError::UserNotFound, Code::NotFound),
            (RelationError::DatabaseQuery, Code::Internal),
            (RelationError::ExternalService, Code::Internal),
        ];

        for (err, expected) in cases {
            let api = api_with(Arc::new(MockUseCase::failing_follow(err.clone())));
            let status = api
                .follow(Request::new(FollowRequest {
                    follower_id: 1,
                    followee_id: 2,
                }))
                .await
                .unwrap_err();
            assert_eq!(status.code(), expected, "error kind: {:?}", err);
        }
    }

    #[tokio::test]
    async fn test_unfollow_error_mapping() {
        let cases = [
            (RelationError::FollowRelationNotFound, Code::NotFound),
            (RelationError::UserNotFound, Code::NotFound),
            (RelationError::SelfUnfollow, Code::InvalidArgument),
            (RelationError::DatabaseQuery, Code::Internal),
        ];

        for (err, expected) in cases {
            let api = api_with(Arc::new(MockUseCase::failing_unfollow(err.clone())));
            let status = api
                .unfollow(Request::new(UnfollowRequest {
                    follower_id: 1,
                    followee_id: 2,
                }))
                .await
                .unwrap_err();
            assert_eq!(status.code(), expected, "error kind: {:?}", err);
        }
    }

    #[tokio::test]
    async fn test_get_followers_validates_pagination_bounds() {
        let mock = Arc::new(MockUseCase::default());
        let api = api_with(mock.clone());

        for (followee_id, limit, page) in [(0, 10, 1), (2, 0, 1), (2, 101, 1), (2, 10, 0)] {
            let status = api
                .get_followers(Request::new(GetFollowersRequest {
                    followee_id,
                    limit,
                    page,
                }))
                .await
                .unwrap_err();
            assert_eq!(status.code(), Code::InvalidArgument);
        }

        assert_eq!(mock.calls(), 0);

        // limit = 100 位于边界内
        api.get_followers(Request::new(GetFollowersRequest {
            followee_id: 2,
            limit: 100,
            page: 1,
        }))
        .await
        .unwrap();
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_followers_returns_users_and_total() {
        let api = api_with(Arc::new(MockUseCase::default()));

        let response = api
            .get_followers(Request::new(GetFollowersRequest {
                followee_id: 2,
                limit: 10,
                page: 1,
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.total, 1);
        assert_eq!(response.followers.len(), 1);
        assert_eq!(response.followers[0].id, 1);
        assert_eq!(response.followers[0].username, "user-1");
    }

    #[tokio::test]
    async fn test_get_followers_error_mapping() {
        let cases = [
            (RelationError::UserNotFound, Code::NotFound),
            (RelationError::DatabaseQuery, Code::Internal),
            (RelationError::ExternalService, Code::Internal),
        ];

        for (err, expected) in cases {
            let api = api_with(Arc::new(MockUseCase::failing_listing(err.clone())));
            let status = api
                .get_followers(Request::new(GetFollowersRequest {
                    followee_id: 2,
                    limit: 10,
                    page: 1,
                }))
                .await
                .unwrap_err();
            assert_eq!(status.code(), expected, "error kind: {:?}", err);
        }
    }

    #[tokio::test]
    async fn test_panicking_handler_returns_internal() {
        let api = api_with(Arc::new(MockUseCase::panicking()));

        let status = api
            .follow(Request::new(FollowRequest {
                follower_id: 1,
                followee_id: 2,
            }))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::Internal);
    }
}
