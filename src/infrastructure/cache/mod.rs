pub mod cache_keys;
pub mod in_memory;

use crate::core::errors::HuddleError;
use crate::core::models::group::GroupMember;
use async_trait::async_trait;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_group_members(&self, group_id: &str) -> Result<Option<Vec<GroupMember>>, HuddleError>;
    async fn save_group_members(
        &self,
        group_id: &str,
        members: &[GroupMember],
        ttl: std::time::Duration,
    ) -> Result<(), HuddleError>;
    async fn invalidate_group_members(&self, group_id: &str) -> Result<(), HuddleError>;
}
