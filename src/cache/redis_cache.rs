// Redis 缓存实现
// 连接在第一次使用时才建立，Redis 不可达时服务照常启动，
// 连接成功之前所有调用都返回 `CacheError::Unavailable`，调用方回退到数据库。
// 连接建立后由 `ConnectionManager` 自动重连

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;

use super::{Cache, CacheResult};

pub struct RedisCache {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
}

impl RedisCache {
    /// 只校验 url，不建立连接
    pub fn open(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
        })
    }

    async fn connection(&self) -> CacheResult<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                tracing::debug!("Connecting to Redis");
                ConnectionManager::new(self.client.clone()).await
            })
            .await?;

        Ok(conn.clone())
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        // EX 的最小粒度是 1 秒
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheError;

    #[test]
    fn test_open_rejects_malformed_url() {
        let result = RedisCache::open("not a url");
        assert!(matches!(result, Err(CacheError::Unavailable(_))));
    }

    #[test]
    fn test_open_does_not_connect() {
        // 端口 1 上没有 Redis，open 仍然成功
        assert!(RedisCache::open("redis://127.0.0.1:1/").is_ok());
    }
}
