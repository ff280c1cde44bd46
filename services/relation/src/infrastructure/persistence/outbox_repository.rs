//! Outbox 仓储 PostgreSQL 实现
//!
//! Outbox 模式保证事件发布的最终一致性：
//! 1. 业务写入和事件写入在同一事务中
//! 2. 中继异步发布事件并写回终态

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};
use weave_bootstrap::{record_outbox_operation, DbQueryTimer};

use super::{map_sqlx_error, run_query, PgDb};
use crate::domain::models::{EventType, OutboxEvent, OutboxStatus};
use crate::domain::repository::OutboxRepository;
use crate::error::{RelationError, RelationResult};

pub struct PostgresOutboxRepository {
    db: PgDb,
}

impl PostgresOutboxRepository {
    pub fn new(db: PgDb) -> Self {
        Self { db }
    }
}

#[derive(sqlx::FromRow)]
struct OutboxRow {
    id: i64,
    aggregate_id: i64,
    event_type: String,
    payload: serde_json::Value,
    status: String,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
}

impl TryFrom<OutboxRow> for OutboxEvent {
    type Error = RelationError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        let event_type = EventType::parse(&row.event_type)
            .ok_or_else(|| RelationError::Internal(format!("unknown event type: {}", row.event_type)))?;
        let status = OutboxStatus::parse(&row.status)
            .ok_or_else(|| RelationError::Internal(format!("unknown outbox status: {}", row.status)))?;

        Ok(Self {
            id: row.id,
            aggregate_id: row.aggregate_id,
            event_type,
            payload: row.payload,
            status,
            created_at: row.created_at,
            sent_at: row.sent_at,
        })
    }
}

#[async_trait]
impl OutboxRepository for PostgresOutboxRepository {
    async fn add_event(
        &self,
        aggregate_id: i64,
        event_type: EventType,
        payload: &serde_json::Value,
    ) -> RelationResult<()> {
        let timer = DbQueryTimer::new("outbox_add_event");

        let query = sqlx::query(
            r#"
            INSERT INTO outbox (aggregate_id, event_type, payload)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(aggregate_id)
        .bind(event_type.as_str())
        .bind(payload);

        match run_query!(&self.db, query, execute) {
            Ok(_) => {
                info!(
                    aggregate_id,
                    event_type = %event_type,
                    "Event added to outbox successfully"
                );
                record_outbox_operation("add_event", true);
                timer.finish(true);
                Ok(())
            }
            Err(e) => {
                error!(
                    aggregate_id,
                    event_type = %event_type,
                    error = %e,
                    "Failed to add event to outbox"
                );
                record_outbox_operation("add_event", false);
                timer.finish(false);
                Err(map_sqlx_error(e))
            }
        }
    }

    async fn get_events_for_processing(&self, limit: i64) -> RelationResult<Vec<OutboxEvent>> {
        let timer = DbQueryTimer::new("outbox_get_events");

        // 不加行锁：见仓储接口上的单实例部署约定
        let query = sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT id, aggregate_id, event_type, payload, status, created_at, sent_at
            FROM outbox
            WHERE status = 'new'
            ORDER BY created_at
            LIMIT $1
            "#,
        )
        .bind(limit);

        let rows = match run_query!(&self.db, query, fetch_all) {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "Failed to get events for processing");
                record_outbox_operation("get_events_for_processing", false);
                timer.finish(false);
                return Err(map_sqlx_error(e));
            }
        };

        let events = rows
            .into_iter()
            .map(OutboxEvent::try_from)
            .collect::<RelationResult<Vec<_>>>()?;

        record_outbox_operation("get_events_for_processing", true);
        timer.finish(true);
        Ok(events)
    }

    async fn mark_event_as_pending(&self, event_id: i64) -> RelationResult<()> {
        let timer = DbQueryTimer::new("outbox_mark_pending");

        let query = sqlx::query("UPDATE outbox SET status = $1 WHERE id = $2")
            .bind(OutboxStatus::Pending.as_str())
            .bind(event_id);

        match run_query!(&self.db, query, execute) {
            Ok(_) => {
                debug!(event_id, "Event marked as pending");
                record_outbox_operation("mark_event_pending", true);
                timer.finish(true);
                Ok(())
            }
            Err(e) => {
                error!(event_id, error = %e, "Failed to mark event as pending");
                record_outbox_operation("mark_event_pending", false);
                timer.finish(false);
                Err(map_sqlx_error(e))
            }
        }
    }

    async fn update_event_status(
        &self,
        event_id: i64,
        status: OutboxStatus,
        sent_at: Option<DateTime<Utc>>,
    ) -> RelationResult<()> {
        // sent 必须携带 sent_at，其余状态必须不带
        match (status, sent_at.is_some()) {
            (OutboxStatus::Sent, false) => {
                return Err(RelationError::Internal(
                    "sent_at is required for sent status".to_string(),
                ))
            }
            (OutboxStatus::Sent, true) => {}
            (_, true) => {
                return Err(RelationError::Internal(format!(
                    "sent_at is not allowed for {} status",
                    status
                )))
            }
            (_, false) => {}
        }

        let timer = DbQueryTimer::new("outbox_update_status");

        let result = if let Some(sent_at) = sent_at {
            let query = sqlx::query("UPDATE outbox SET status = $1, sent_at = $2 WHERE id = $3")
                .bind(status.as_str())
                .bind(sent_at)
                .bind(event_id);
            run_query!(&self.db, query, execute)
        } else {
            let query = sqlx::query("UPDATE outbox SET status = $1 WHERE id = $2")
                .bind(status.as_str())
                .bind(event_id);
            run_query!(&self.db, query, execute)
        };

        match result {
            Ok(_) => {
                info!(event_id, status = %status, "Event status updated");
                record_outbox_operation("update_event_status", true);
                timer.finish(true);
                Ok(())
            }
            Err(e) => {
                error!(event_id, status = %status, error = %e, "Failed to update event status");
                record_outbox_operation("update_event_status", false);
                timer.finish(false);
                Err(map_sqlx_error(e))
            }
        }
    }
}
