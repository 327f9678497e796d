use serde::{Deserialize, Serialize};

use crate::cache::CacheResult;
use crate::models::User;

/// 缓存中的用户列表快照，值就是按 id 升序的用户数组，写入时整体覆盖
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CachedListing(pub Vec<User>);

impl CachedListing {
    pub fn to_json(&self) -> CacheResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> CacheResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_users(self) -> Vec<User> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheError;

    #[test]
    fn test_garbage_payload_is_a_serialization_error() {
        let err = CachedListing::from_json("not json").unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }

    #[test]
    fn test_listing_is_stored_as_bare_array() {
        let users = vec![
            User {
                id: 1,
                name: "Alice".into(),
            },
            User {
                id: 2,
                name: "Bob".into(),
            },
        ];

        let json = CachedListing(users).to_json().unwrap();
        assert_eq!(json, r#"[{"id":1,"name":"Alice"},{"id":2,"name":"Bob"}]"#);
    }

    #[test]
    fn test_reads_rows_written_by_other_writers() {
        // 其他服务直接写入的行数组也能读出
        let listing = CachedListing::from_json(r#"[{"id":7,"name":"Zoe"}]"#).unwrap();
        assert_eq!(
            listing.into_users(),
            vec![User {
                id: 7,
                name: "Zoe".into(),
            }]
        );
    }
}
