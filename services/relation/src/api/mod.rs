//! API layer - gRPC service implementations

pub mod grpc;
pub mod proto;

pub use grpc::RelationServiceImpl;
