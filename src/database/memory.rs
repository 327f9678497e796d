// 进程内用户存储
// 与 Postgres 表的语义一致（id 从 1 开始分配，按 id 排序），可以模拟数据库不可达或变慢

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, StoreResult, UserStore};
use crate::models::User;

#[derive(Debug, Default)]
struct Table {
    rows: Vec<User>,
    last_id: i32,
}

#[derive(Debug)]
struct Inner {
    table: RwLock<Table>,
    available: AtomicBool,
    latency: Mutex<Duration>,
    list_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    ensure_schema_calls: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct MemoryUserStore {
    inner: Arc<Inner>,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                table: RwLock::new(Table::default()),
                available: AtomicBool::new(true),
                latency: Mutex::new(Duration::ZERO),
                list_calls: AtomicUsize::new(0),
                insert_calls: AtomicUsize::new(0),
                ensure_schema_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// 不可用时所有调用都返回 `StoreError::Unavailable`
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// 每次调用前的延迟
    pub fn set_latency(&self, latency: Duration) {
        if let Ok(mut guard) = self.inner.latency.lock() {
            *guard = latency;
        }
    }

    /// 读取当前所有行，不计入调用次数
    pub async fn rows(&self) -> Vec<User> {
        self.inner.table.read().await.rows.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.inner.list_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.inner.insert_calls.load(Ordering::SeqCst)
    }

    pub fn ensure_schema_calls(&self) -> usize {
        self.inner.ensure_schema_calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> StoreResult<()> {
        let latency = self
            .inner
            .latency
            .lock()
            .map(|guard| *guard)
            .unwrap_or(Duration::ZERO);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.inner.list_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;

        // rows 按插入顺序追加，id 单调递增，因此天然有序
        Ok(self.inner.table.read().await.rows.clone())
    }

    async fn insert_user(&self, name: &str) -> StoreResult<User> {
        self.inner.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;

        let mut table = self.inner.table.write().await;
        table.last_id += 1;
        let user = User {
            id: table.last_id,
            name: name.to_string(),
        };
        table.rows.push(user.clone());
        Ok(user)
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        self.inner.ensure_schema_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await
    }

    async fn ping(&self) -> StoreResult<i32> {
        self.enter().await?;
        Ok(1)
    }
}
