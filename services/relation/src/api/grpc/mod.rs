//! gRPC utilities and interceptors

mod relation_service;

pub use relation_service::RelationServiceImpl;

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tonic::{Response, Status};
use tracing::error;

/// 处理器 panic 恢复
///
/// 未捕获的 panic 转换为 Internal 状态返回给客户端
pub(crate) async fn recover<F, T>(method: &'static str, fut: F) -> Result<Response<T>, Status>
where
    F: std::future::Future<Output = Result<Response<T>, Status>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(_) => {
            error!(method, "Handler panicked");
            Err(Status::internal("internal server error"))
        }
    }
}
