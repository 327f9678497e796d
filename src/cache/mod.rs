// 缓存模块
// 缓存只是加速层，从不产生数据
// 所有失败都以 CacheError 单独上报，由调用方决定如何降级

use std::time::Duration;

use async_trait::async_trait;

pub mod keys;
pub mod memory;
pub mod models;
pub mod redis_cache;

pub use memory::MemoryCache;
pub use models::CachedListing;
pub use redis_cache::RedisCache;

/// 缓存错误，不会返回给 API 调用方
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache serialization error: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

/// 单键字符串存储，每个键有各自的过期时间
#[async_trait]
pub trait Cache: Send + Sync {
    /// 读取 `key`，不存在或已过期时返回 `None`
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// 整体覆盖 `key`，`ttl` 之后过期
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// 删除 `key`，键不存在时不算错误
    async fn delete(&self, key: &str) -> CacheResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_display() {
        let error = CacheError::Unavailable("timeout".to_string());
        assert_eq!(error.to_string(), "cache unavailable: timeout");

        let error = CacheError::Serialization("invalid JSON".to_string());
        assert_eq!(error.to_string(), "cache serialization error: invalid JSON");
    }
}
