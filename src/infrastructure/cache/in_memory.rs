use crate::core::errors::HuddleError;
use crate::core::models::group::GroupMember;
use crate::infrastructure::cache::Cache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemoryCache {
    cache: Arc<RwLock<HashMap<String, (Vec<GroupMember>, chrono::DateTime<chrono::Utc>)>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        InMemoryCache {
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_group_members(&self, group_id: &str) -> Result<Option<Vec<GroupMember>>, HuddleError> {
        let cache = self.cache.read().await;
        let key = crate::infrastructure::cache::cache_keys::group_members_key(group_id);
        Ok(cache
            .get(&key)
            .filter(|(_, expiry)| *expiry > chrono::Utc::now())
            .map(|(members, _)| members.clone()))
    }

    async fn save_group_members(
        &self,
        group_id: &str,
        members: &[GroupMember],
        ttl: std::time::Duration,
    ) -> Result<(), HuddleError> {
        let mut cache = self.cache.write().await;
        let key = crate::infrastructure::cache::cache_keys::group_members_key(group_id);
        cache.insert(
            key,
            (
                members.to_vec(),
                chrono::Utc::now()
                    + chrono::Duration::from_std(ttl)
                        .map_err(|e| HuddleError::CacheError(format!("Failed to convert TTL: {}", e)))?,
            ),
        );
        Ok(())
    }

    async fn invalidate_group_members(&self, group_id: &str) -> Result<(), HuddleError> {
        let mut cache = self.cache.write().await;
        let key = crate::infrastructure::cache::cache_keys::group_members_key(group_id);
        cache.remove(&key);
        Ok(())
    }
}
