//! gRPC 生成代码引入

pub mod relation {
    tonic::include_proto!("relation.v1");
}

pub mod user {
    tonic::include_proto!("user.v1");
}
