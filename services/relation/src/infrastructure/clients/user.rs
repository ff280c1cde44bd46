//! 上游用户服务 gRPC 客户端

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, error};

use crate::api::proto::user::{user_service_client::UserServiceClient, GetUserRequest};
use crate::domain::models::User;
use crate::domain::user_client::UserClient;
use crate::error::{RelationError, RelationResult};

pub struct GrpcUserClient {
    client: UserServiceClient<Channel>,
}

impl GrpcUserClient {
    /// 惰性连接：首次调用时建立连接
    pub fn new(address: String) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(address)?.connect_lazy();

        Ok(Self {
            client: UserServiceClient::new(channel),
        })
    }
}

#[async_trait]
impl UserClient for GrpcUserClient {
    async fn get_user(&self, id: i64) -> RelationResult<User> {
        debug!(id, "Getting user by ID");

        let mut client = self.client.clone();
        match client.get_user(GetUserRequest { id }).await {
            Ok(response) => {
                let user = response.into_inner();
                Ok(User {
                    id: user.id,
                    username: user.username,
                    email: user.email,
                    avatar_url: user.avatar_url,
                })
            }
            Err(status) if status.code() == tonic::Code::NotFound => {
                debug!(id, "User not found");
                Err(RelationError::UserNotFound)
            }
            Err(status) => {
                error!(id, error = %status, "Error getting user");
                Err(RelationError::ExternalService)
            }
        }
    }
}
