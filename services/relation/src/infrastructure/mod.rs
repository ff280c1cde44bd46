//! 基础设施层

pub mod clients;
pub mod kafka;
pub mod outbox;
pub mod persistence;
