use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outbox 事件状态
///
/// 合法迁移仅有 new → pending → sent 和 new → pending → error，
/// error 在本服务内是终态（运维可在带外重置为 new）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    New,
    Pending,
    Sent,
    Error,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::New => "new",
            OutboxStatus::Pending => "pending",
            OutboxStatus::Sent => "sent",
            OutboxStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(OutboxStatus::New),
            "pending" => Some(OutboxStatus::Pending),
            "sent" => Some(OutboxStatus::Sent),
            "error" => Some(OutboxStatus::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 事件类型（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    FollowCreated,
    FollowDeleted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::FollowCreated => "follow_created",
            EventType::FollowDeleted => "follow_deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "follow_created" => Some(EventType::FollowCreated),
            "follow_deleted" => Some(EventType::FollowDeleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbox 事件记录
///
/// aggregate_id 指向事件描述的关注关系边；payload 为序列化后的事件体
#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub id: i64,
    pub aggregate_id: i64,
    pub event_type: EventType,
    pub payload: serde_json::Value,
    pub status: OutboxStatus,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// follow_created 事件体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowCreatedPayload {
    pub follower_id: i64,
    pub followee_id: i64,
    pub timestamptz: DateTime<Utc>,
}

/// follow_deleted 事件体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowDeletedPayload {
    pub follower_id: i64,
    pub followee_id: i64,
    pub timestamptz: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            OutboxStatus::New,
            OutboxStatus::Pending,
            OutboxStatus::Sent,
            OutboxStatus::Error,
        ] {
            assert_eq!(OutboxStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OutboxStatus::parse("done"), None);
    }

    #[test]
    fn test_event_type_wire_form() {
        assert_eq!(EventType::FollowCreated.as_str(), "follow_created");
        assert_eq!(EventType::FollowDeleted.as_str(), "follow_deleted");
        assert_eq!(
            EventType::parse("follow_created"),
            Some(EventType::FollowCreated)
        );
    }

    #[test]
    fn test_payload_serializes_rfc3339_timestamp() {
        let payload = FollowCreatedPayload {
            follower_id: 1,
            followee_id: 2,
            timestamptz: "2025-01-15T10:30:00Z".parse().unwrap(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["follower_id"], 1);
        assert_eq!(value["followee_id"], 2);
        assert_eq!(value["timestamptz"], "2025-01-15T10:30:00Z");
    }
}
