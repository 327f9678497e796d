use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 用户目录中的一条记录，id 只由持久化存储分配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
}

/// 列表数据的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingSource {
    Cache,
    Database,
}

/// `listUsers` 的返回结果，按 id 升序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserListing {
    pub users: Vec<User>,
    pub source: ListingSource,
}

impl UserListing {
    pub fn from_cache(users: Vec<User>) -> Self {
        Self {
            users,
            source: ListingSource::Cache,
        }
    }

    pub fn from_database(users: Vec<User>) -> Self {
        Self {
            users,
            source: ListingSource::Database,
        }
    }
}
