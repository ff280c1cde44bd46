mod db;
mod error_mapper;
mod follow_repository;
mod outbox_repository;
mod unit_of_work;

pub use db::{PgDb, SharedTx};
pub use follow_repository::PostgresFollowRepository;
pub use outbox_repository::PostgresOutboxRepository;
pub use unit_of_work::PostgresUnitOfWork;

pub(crate) use db::run_query;
pub(crate) use error_mapper::map_sqlx_error;
