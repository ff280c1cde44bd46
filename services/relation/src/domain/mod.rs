//! 领域层

pub mod models;
pub mod producer;
pub mod repository;
pub mod unit_of_work;
pub mod user_client;
