// 用户目录，缓存旁路模式
//
// 读：先查缓存，未命中或缓存不可用时查数据库，再把完整列表写回缓存。
// 写：先写数据库，再删除列表缓存。
//
// 先查后填、先写后删都不是原子操作。一次未命中的读取可能读到旧快照，
// 在并发写入删除缓存之后再把旧快照写回；缓存不可达时删除也可能丢失。
// 两种情况都由 TTL 兜底：列表缓存最多存活 USERS_CACHE_TTL，
// 任何成功的写入最迟 60 秒后对读取可见。
//
// 缓存错误只记录不上报，数据库错误原样返回。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::keys::{ALL_USERS_KEY, USERS_CACHE_TTL};
use crate::cache::{Cache, CacheError, CacheResult, CachedListing};
use crate::database::{StoreError, StoreResult, UserStore};
use crate::error::DirectoryError;
use crate::models::{User, UserListing};

pub const NAME_REQUIRED: &str = "name required";

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(1);

pub struct UserDirectory {
    store: Arc<dyn UserStore>,
    cache: Arc<dyn Cache>,
    store_timeout: Duration,
    cache_timeout: Duration,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn UserStore>, cache: Arc<dyn Cache>) -> Self {
        Self {
            store,
            cache,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
        }
    }

    /// 分别限制每次数据库调用和缓存调用的时长
    pub fn with_timeouts(mut self, store_timeout: Duration, cache_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self.cache_timeout = cache_timeout;
        self
    }

    pub async fn list_users(&self) -> Result<UserListing, DirectoryError> {
        // 1. 先查缓存
        match self.cache_call(self.cache.get(ALL_USERS_KEY)).await {
            Ok(Some(json)) => match CachedListing::from_json(&json) {
                Ok(listing) => {
                    tracing::debug!(key = ALL_USERS_KEY, "Cache hit for user listing");
                    return Ok(UserListing::from_cache(listing.into_users()));
                }
                // 内容损坏按未命中处理，下面的回填会覆盖它
                Err(e) => {
                    tracing::warn!(key = ALL_USERS_KEY, error = %e, "Cached listing unreadable");
                }
            },
            Ok(None) => tracing::debug!(key = ALL_USERS_KEY, "Cache miss for user listing"),
            Err(e) => tracing::warn!(
                key = ALL_USERS_KEY,
                error = %e,
                "Cache unavailable, reading users from database"
            ),
        }

        // 2. 未命中则查数据库，失败时不碰缓存
        let users = self.store_call(self.store.list_users()).await?;

        // 3. 回填缓存，失败只记录
        if let Err(e) = self.populate(&users).await {
            tracing::warn!(key = ALL_USERS_KEY, error = %e, "Failed to cache user listing");
        }

        Ok(UserListing::from_database(users))
    }

    pub async fn add_user(&self, name: &str) -> Result<User, DirectoryError> {
        if name.trim().is_empty() {
            return Err(DirectoryError::Validation(NAME_REQUIRED));
        }

        let user = self.store_call(self.store.insert_user(name)).await?;

        // 写入成功后删除列表缓存，下一次读取会从数据库加载
        if let Err(e) = self.cache_call(self.cache.delete(ALL_USERS_KEY)).await {
            tracing::warn!(
                key = ALL_USERS_KEY,
                user_id = user.id,
                error = %e,
                "Failed to invalidate user listing, relying on TTL"
            );
        }

        Ok(user)
    }

    /// 检查数据库连通性
    pub async fn check_store(&self) -> Result<i32, DirectoryError> {
        Ok(self.store_call(self.store.ping()).await?)
    }

    async fn populate(&self, users: &[User]) -> CacheResult<()> {
        let json = CachedListing(users.to_vec()).to_json()?;
        self.cache_call(self.cache.set(ALL_USERS_KEY, &json, USERS_CACHE_TTL)).await
    }

    async fn store_call<T, F>(&self, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| {
                StoreError::Unavailable(format!("timed out after {:?}", self.store_timeout))
            })?
    }

    async fn cache_call<T, F>(&self, call: F) -> CacheResult<T>
    where
        F: Future<Output = CacheResult<T>>,
    {
        tokio::time::timeout(self.cache_timeout, call)
            .await
            .map_err(|_| {
                CacheError::Unavailable(format!("timed out after {:?}", self.cache_timeout))
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::cache::MemoryCache;
    use crate::database::MemoryUserStore;
    use crate::models::ListingSource;

    fn setup() -> (UserDirectory, MemoryUserStore, MemoryCache) {
        let store = MemoryUserStore::new();
        let cache = MemoryCache::new();
        let directory = UserDirectory::new(Arc::new(store.clone()), Arc::new(cache.clone()));
        (directory, store, cache)
    }

    fn user(id: i32, name: &str) -> User {
        User {
            id,
            name: name.to_string(),
        }
    }

    // 调用永远不返回的缓存
    struct StalledCache;

    #[async_trait]
    impl Cache for StalledCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            std::future::pending().await
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
            std::future::pending().await
        }

        async fn delete(&self, _key: &str) -> CacheResult<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_walkthrough_from_empty_directory() {
        let (directory, store, cache) = setup();

        let listing = directory.list_users().await.unwrap();
        assert_eq!(listing, UserListing::from_database(vec![]));

        let listing = directory.list_users().await.unwrap();
        assert_eq!(listing, UserListing::from_cache(vec![]));

        let alice = directory.add_user("Alice").await.unwrap();
        assert_eq!(alice, user(1, "Alice"));
        assert!(!cache.contains(ALL_USERS_KEY).await);

        let listing = directory.list_users().await.unwrap();
        assert_eq!(listing, UserListing::from_database(vec![user(1, "Alice")]));

        let listing = directory.list_users().await.unwrap();
        assert_eq!(listing, UserListing::from_cache(vec![user(1, "Alice")]));

        let err = directory.add_user("").await.unwrap_err();
        assert_eq!(err, DirectoryError::Validation(NAME_REQUIRED));
        assert_eq!(store.rows().await, vec![user(1, "Alice")]);
        assert!(cache.contains(ALL_USERS_KEY).await);

        let bob = directory.add_user("Bob").await.unwrap();
        assert_eq!(bob.id, 2);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_database() {
        let (directory, store, _cache) = setup();
        directory.add_user("Alice").await.unwrap();

        let first = directory.list_users().await.unwrap();
        let second = directory.list_users().await.unwrap();

        assert_eq!(first.source, ListingSource::Database);
        assert_eq!(second.source, ListingSource::Cache);
        assert_eq!(first.users, second.users);
        assert_eq!(store.list_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_population_uses_sixty_second_ttl() {
        let (directory, _store, cache) = setup();
        directory.list_users().await.unwrap();

        assert_eq!(cache.ttl(ALL_USERS_KEY).await, Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_blank_names_touch_nothing() {
        let (directory, store, cache) = setup();
        directory.list_users().await.unwrap();
        let cache_reads = cache.get_calls();

        for name in ["", "   ", "\t\n"] {
            let err = directory.add_user(name).await.unwrap_err();
            assert_eq!(err.to_string(), "name required");
        }

        assert_eq!(store.insert_calls(), 0);
        assert_eq!(cache.get_calls(), cache_reads);
        assert!(cache.contains(ALL_USERS_KEY).await);
        assert!(store.rows().await.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_reads_do_not_write() {
        let (directory, store, cache) = setup();
        directory.add_user("Alice").await.unwrap();
        directory.add_user("Bob").await.unwrap();
        let before = store.rows().await;

        for _ in 0..5 {
            directory.list_users().await.unwrap();
        }
        cache.set_available(false);
        for _ in 0..5 {
            directory.list_users().await.unwrap();
        }

        assert_eq!(store.rows().await, before);
        assert_eq!(store.insert_calls(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_cache_falls_back_to_database() {
        let (directory, store, cache) = setup();
        directory.add_user("Alice").await.unwrap();
        cache.set_available(false);

        for _ in 0..3 {
            let listing = directory.list_users().await.unwrap();
            assert_eq!(listing, UserListing::from_database(vec![user(1, "Alice")]));
        }
        assert_eq!(store.list_calls(), 3);

        // 写入也不受影响
        let bob = directory.add_user("Bob").await.unwrap();
        assert_eq!(bob.id, 2);
    }

    #[tokio::test]
    async fn test_listing_is_ordered_by_id() {
        let (directory, _store, _cache) = setup();
        for name in ["Carol", "Alice", "Bob", "Dave"] {
            directory.add_user(name).await.unwrap();
        }

        for _ in 0..2 {
            let listing = directory.list_users().await.unwrap();
            let ids: Vec<i32> = listing.users.iter().map(|u| u.id).collect();
            assert_eq!(ids, vec![1, 2, 3, 4]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_invalidation_is_bounded_by_ttl() {
        let (directory, _store, cache) = setup();
        directory.list_users().await.unwrap();

        // 缓存在删除时不可达，旧列表留在缓存中
        cache.set_available(false);
        directory.add_user("Alice").await.unwrap();
        cache.set_available(true);

        let stale = directory.list_users().await.unwrap();
        assert_eq!(stale, UserListing::from_cache(vec![]));

        tokio::time::advance(USERS_CACHE_TTL).await;

        let fresh = directory.list_users().await.unwrap();
        assert_eq!(fresh, UserListing::from_database(vec![user(1, "Alice")]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_sixty_seconds_apart_observe_write() {
        let (directory, _store, cache) = setup();
        directory.list_users().await.unwrap();

        cache.set_available(false);
        directory.add_user("Alice").await.unwrap();
        cache.set_available(true);

        let mut observed = false;
        for _ in 0..2 {
            let listing = directory.list_users().await.unwrap();
            observed |= listing.users.iter().any(|u| u.name == "Alice");
            tokio::time::advance(Duration::from_secs(60)).await;
        }
        assert!(observed);
    }

    #[tokio::test]
    async fn test_store_failure_on_read_leaves_cache_untouched() {
        let (directory, store, cache) = setup();
        store.set_available(false);

        let err = directory.list_users().await.unwrap_err();

        assert!(matches!(err, DirectoryError::StoreUnavailable(_)));
        assert!(!cache.contains(ALL_USERS_KEY).await);
    }

    #[tokio::test]
    async fn test_store_failure_on_write_keeps_cached_listing() {
        let (directory, store, cache) = setup();
        directory.list_users().await.unwrap();
        store.set_available(false);

        let err = directory.add_user("Alice").await.unwrap_err();

        assert!(matches!(err, DirectoryError::StoreUnavailable(_)));
        assert!(cache.contains(ALL_USERS_KEY).await);
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry_is_replaced() {
        let (directory, _store, cache) = setup();
        directory.add_user("Alice").await.unwrap();
        cache
            .set(ALL_USERS_KEY, "{broken", USERS_CACHE_TTL)
            .await
            .unwrap();

        let listing = directory.list_users().await.unwrap();
        assert_eq!(listing.source, ListingSource::Database);

        let listing = directory.list_users().await.unwrap();
        assert_eq!(listing, UserListing::from_cache(vec![user(1, "Alice")]));
    }

    #[tokio::test]
    async fn test_bare_array_entry_is_a_cache_hit() {
        let (directory, store, cache) = setup();
        cache
            .set(ALL_USERS_KEY, r#"[{"id":1,"name":"Alice"}]"#, USERS_CACHE_TTL)
            .await
            .unwrap();

        let listing = directory.list_users().await.unwrap();

        assert_eq!(listing, UserListing::from_cache(vec![user(1, "Alice")]));
        assert_eq!(store.list_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_times_out() {
        let (directory, store, _cache) = setup();
        let directory = directory.with_timeouts(Duration::from_secs(2), Duration::from_secs(1));
        store.set_latency(Duration::from_secs(30));

        let err = directory.list_users().await.unwrap_err();
        assert_eq!(
            err,
            DirectoryError::StoreUnavailable(StoreError::Unavailable(
                "timed out after 2s".to_string()
            ))
        );
        assert!(directory.add_user("Alice").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_cache_fails_open() {
        let store = MemoryUserStore::new();
        let directory = UserDirectory::new(Arc::new(store.clone()), Arc::new(StalledCache))
            .with_timeouts(Duration::from_secs(5), Duration::from_millis(100));

        let alice = directory.add_user("Alice").await.unwrap();
        let listing = directory.list_users().await.unwrap();

        assert_eq!(listing, UserListing::from_database(vec![alice]));
    }

    #[tokio::test]
    async fn test_concurrent_writes_get_unique_ids() {
        let (directory, _store, _cache) = setup();
        let directory = Arc::new(directory);

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let directory = directory.clone();
                tokio::spawn(async move { directory.add_user(&format!("user-{i}")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let listing = directory.list_users().await.unwrap();
        let ids: Vec<i32> = listing.users.iter().map(|u| u.id).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_check_store() {
        let (directory, store, _cache) = setup();
        assert_eq!(directory.check_store().await, Ok(1));

        store.set_available(false);
        assert!(directory.check_store().await.is_err());
    }
}
