use serde::{Deserialize, Serialize};

/// Login session stored in redb, keyed by the token digest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: u64,
    /// Unix timestamp
    pub created_at: i64,
    /// Unix timestamp after which the token is refused
    pub expires_at: i64,
}

impl SessionRecord {
    pub fn new(user_id: u64, now: i64, ttl_secs: i64) -> Self {
        Self {
            user_id,
            created_at: now,
            expires_at: now + ttl_secs,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}
