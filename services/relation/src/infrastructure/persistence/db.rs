//! 数据库能力抽象
//!
//! 连接池与进行中的事务都满足仓储的执行需求，仓储构造时
//! 注入其一：事务作用域的仓储共享同一个 SharedTx 句柄，
//! 从而保证经由它们发出的写入的原子性

use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

/// 共享事务句柄
///
/// Option 在 commit/rollback 消费事务后置空
pub type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// 仓储的数据库句柄：连接池或共享事务
#[derive(Clone)]
pub enum PgDb {
    Pool(PgPool),
    Tx(SharedTx),
}

/// 在 PgDb 上执行一条 sqlx 查询
///
/// `$method` 为 execute / fetch_one / fetch_optional / fetch_all 之一；
/// 事务已被消费时经 `?` 返回 Internal 错误
macro_rules! run_query {
    ($db:expr, $query:expr, $method:ident) => {{
        match $db {
            $crate::infrastructure::persistence::PgDb::Pool(pool) => $query.$method(pool).await,
            $crate::infrastructure::persistence::PgDb::Tx(tx) => {
                let mut guard = tx.lock().await;
                let conn = guard.as_mut().ok_or_else(|| {
                    $crate::error::RelationError::Internal("transaction consumed".to_string())
                })?;
                $query.$method(&mut **conn).await
            }
        }
    }};
}

pub(crate) use run_query;
