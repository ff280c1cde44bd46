#![allow(dead_code)]

//! Relation Service - 关注关系服务入口
//!
//! 维护用户间的有向关注图，经 transactional outbox 向下游发布领域事件

mod api;
mod application;
mod domain;
mod error;
mod infrastructure;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::{error, info};
use weave_adapter_postgres::{create_pool, PostgresConfig};
use weave_bootstrap::{
    init_runtime, set_service_health, shutdown_signal, spawn_pool_metrics_collector, AdminServer,
    MetricsRecorder,
};
use weave_config::AppConfig;

use api::proto::relation::relation_service_server::RelationServiceServer;
use api::RelationServiceImpl;
use application::FollowService;
use domain::producer::EventProducer;
use domain::repository::OutboxRepository;
use infrastructure::clients::GrpcUserClient;
use infrastructure::kafka::{producer_settings, KafkaProducer};
use infrastructure::outbox::OutboxWorker;
use infrastructure::persistence::{PgDb, PostgresFollowRepository, PostgresOutboxRepository, PostgresUnitOfWork};

/// 整体关闭期限
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load("config")?;

    init_runtime(&config);
    info!("Starting {} service", config.app_name);

    let metrics = Arc::new(MetricsRecorder::new());

    let pg_config = PostgresConfig::new(config.database.url.expose_secret())
        .with_max_connections(config.database.max_connections);
    let pool = create_pool(&pg_config).await?;

    let producer = Arc::new(KafkaProducer::new(
        &producer_settings(&config.kafka),
        config.kafka.topic.clone(),
    )?);

    // Outbox 中继
    let shutdown_token = CancellationToken::new();
    let outbox_repo: Arc<dyn OutboxRepository> =
        Arc::new(PostgresOutboxRepository::new(PgDb::Pool(pool.clone())));
    let worker = Arc::new(OutboxWorker::new(
        outbox_repo,
        producer.clone() as Arc<dyn EventProducer>,
        config.outbox.clone(),
    ));
    let dispatcher = worker.clone().start(shutdown_token.clone());

    // 仓储与应用服务
    let follow_repo = Arc::new(PostgresFollowRepository::new(PgDb::Pool(pool.clone())));
    let uow = Arc::new(PostgresUnitOfWork::new(pool.clone()));
    let user_client = Arc::new(GrpcUserClient::new(config.user_service.address.clone())?);
    let follow_service = Arc::new(FollowService::new(follow_repo, uow, user_client));
    let relation_api = RelationServiceImpl::new(follow_service);

    // 管理端点与连接池指标
    let pool_metrics = spawn_pool_metrics_collector(pool.clone(), Duration::from_secs(15));
    let admin_addr: SocketAddr = format!("{}:{}", config.metrics.host, config.metrics.port).parse()?;
    let admin = AdminServer::new(pool.clone(), metrics.clone(), admin_addr);
    let admin_handle = tokio::spawn(async move {
        if let Err(e) = admin.serve().await {
            error!(error = %e, "Admin server error");
        }
    });

    set_service_health(true);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "gRPC server starting");

    Server::builder()
        .add_service(RelationServiceServer::new(relation_api))
        .serve_with_shutdown(addr, shutdown_signal())
        .await?;

    // 关闭顺序：gRPC 已排空 → 中继排空在途 worker → 冲刷 producer
    // → 停管理端点 → 关连接池
    info!("Shutting down");
    set_service_health(false);

    let shutdown = async {
        worker.stop().await;
        shutdown_token.cancel();
        let _ = dispatcher.await;

        let producer_to_close = producer.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || producer_to_close.close()).await {
            error!(error = %e, "Producer close task failed");
        }

        pool_metrics.abort();
        admin_handle.abort();
        pool.close().await;
    };

    if tokio::time::timeout(SHUTDOWN_DEADLINE, shutdown).await.is_err() {
        error!("Shutdown deadline exceeded");
    }

    info!("Server exited");
    Ok(())
}
