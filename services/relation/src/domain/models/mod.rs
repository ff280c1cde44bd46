mod follower;
mod outbox;
mod user;

pub use follower::Follower;
pub use outbox::{
    EventType, FollowCreatedPayload, FollowDeletedPayload, OutboxEvent, OutboxStatus,
};
pub use user::User;
