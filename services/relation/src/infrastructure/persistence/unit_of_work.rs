//! PostgreSQL Unit of Work 实现

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

use super::{PgDb, PostgresFollowRepository, PostgresOutboxRepository, SharedTx};
use crate::domain::repository::{FollowRepository, OutboxRepository};
use crate::domain::unit_of_work::{RelationTransaction, UnitOfWork};
use crate::error::{RelationError, RelationResult};

/// Postgres Unit of Work
pub struct PostgresUnitOfWork {
    pool: PgPool,
}

impl PostgresUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn begin(&self) -> RelationResult<Box<dyn RelationTransaction>> {
        let tx = self.pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            RelationError::DatabaseQuery
        })?;

        Ok(Box::new(PostgresRelationTransaction::new(tx)))
    }
}

/// 事务作用域
///
/// 两个仓储经由同一个 SharedTx 句柄执行语句
pub struct PostgresRelationTransaction {
    tx: SharedTx,
    follow_repo: PostgresFollowRepository,
    outbox_repo: PostgresOutboxRepository,
}

impl PostgresRelationTransaction {
    fn new(tx: Transaction<'static, Postgres>) -> Self {
        let tx: SharedTx = Arc::new(Mutex::new(Some(tx)));

        Self {
            follow_repo: PostgresFollowRepository::new(PgDb::Tx(tx.clone())),
            outbox_repo: PostgresOutboxRepository::new(PgDb::Tx(tx.clone())),
            tx,
        }
    }
}

#[async_trait]
impl RelationTransaction for PostgresRelationTransaction {
    fn follow_repository(&self) -> &dyn FollowRepository {
        &self.follow_repo
    }

    fn outbox_repository(&self) -> &dyn OutboxRepository {
        &self.outbox_repo
    }

    async fn commit(self: Box<Self>) -> RelationResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(|| RelationError::Internal("transaction consumed".to_string()))?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            RelationError::DatabaseQuery
        })?;

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RelationResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .take()
            .ok_or_else(|| RelationError::Internal("transaction consumed".to_string()))?;

        tx.rollback().await.map_err(|e| {
            error!(error = %e, "Failed to rollback transaction");
            RelationError::DatabaseQuery
        })?;

        Ok(())
    }
}
