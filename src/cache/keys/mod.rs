use std::time::Duration;

/// 用户列表缓存键，整个目录作为一个集合缓存
pub const ALL_USERS_KEY: &str = "all_users";

/// 用户列表缓存过期时间
pub const USERS_CACHE_TTL: Duration = Duration::from_secs(60);
