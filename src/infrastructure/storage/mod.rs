use crate::core::errors::HuddleError;
use crate::core::models::{audit::GroupAudit, group::Group, membership::Membership, post::Post, user::User};
use async_trait::async_trait;

/// Persistence collaborator. Implementations must make each method a
/// single atomic step: `insert_membership` enforces the one-row-per-
/// (user, group) constraint, `replace_membership` runs the invite
/// delete-then-create without interleaving, and `claim_invitation` /
/// `take_invitation` validate and consume a token in one compare-and-set
/// so two concurrent accepts of the same token cannot both succeed.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn create_user_if_not_exists(&self, user: User) -> Result<User, HuddleError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, HuddleError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, HuddleError>;

    async fn save_group(&self, group: Group) -> Result<(), HuddleError>;
    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, HuddleError>;
    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>, HuddleError>;

    async fn insert_membership(&self, membership: Membership) -> Result<(), HuddleError>;
    async fn replace_membership(&self, membership: Membership) -> Result<(), HuddleError>;
    async fn update_membership(&self, membership: Membership) -> Result<(), HuddleError>;
    async fn delete_membership(&self, group_id: &str, user_id: &str) -> Result<(), HuddleError>;
    async fn get_membership(&self, group_id: &str, user_id: &str) -> Result<Option<Membership>, HuddleError>;
    async fn list_memberships(&self, group_id: &str) -> Result<Vec<Membership>, HuddleError>;
    async fn list_pending_requests(&self, group_id: &str) -> Result<Vec<Membership>, HuddleError>;
    async fn claim_invitation(&self, token: &str) -> Result<Option<Membership>, HuddleError>;
    async fn take_invitation(&self, token: &str) -> Result<Option<Membership>, HuddleError>;

    async fn save_post(&self, post: Post) -> Result<(), HuddleError>;
    async fn get_group_posts(&self, group_id: &str) -> Result<Vec<Post>, HuddleError>;

    async fn save_group_audit(&self, audit: GroupAudit) -> Result<(), HuddleError>;
    async fn get_group_audits(&self, group_id: &str) -> Result<Vec<GroupAudit>, HuddleError>;
}

pub mod in_memory;
