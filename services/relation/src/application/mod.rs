//! 应用层

pub mod pagination;
mod service;

pub use service::{FollowService, RelationUseCase};
