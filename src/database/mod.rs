// 数据库模块
// 持久化存储是用户数据的唯一来源，只有它能分配 id

use std::time::Duration;

use async_trait::async_trait;

use crate::models::User;

pub mod memory;
pub mod repositories;

pub use memory::MemoryUserStore;
pub use repositories::user::PgUserStore;

/// 持久化存储错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 持久化的有序用户集合
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 按 id 升序返回全部用户
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// 插入新用户，返回带有分配 id 的记录
    async fn insert_user(&self, name: &str) -> StoreResult<User>;

    /// 表不存在时创建，可重复调用
    async fn ensure_schema(&self) -> StoreResult<()>;

    /// 连通性检查，返回 `SELECT 1` 的结果
    async fn ping(&self) -> StoreResult<i32>;
}

/// 启动时创建表结构，失败后按固定间隔重试
pub async fn ensure_schema_with_retry(
    store: &dyn UserStore,
    attempts: u32,
    delay: Duration,
) -> StoreResult<()> {
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match store.ensure_schema().await {
            Ok(()) => {
                tracing::info!("users table ready");
                return Ok(());
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    attempt,
                    attempts,
                    error = %e,
                    "Failed to ensure schema, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(attempts, error = %e, "Giving up on schema bootstrap");
                return Err(e);
            }
        }
    }
}
