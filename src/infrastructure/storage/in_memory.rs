use crate::core::errors::HuddleError;
use crate::core::models::membership::MembershipStatus;
use crate::core::models::{audit::GroupAudit, group::Group, membership::Membership, post::Post, user::User};
use crate::infrastructure::storage::Storage;
use async_trait::async_trait;
use bcrypt::hash;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemoryStorage {
    users: Arc<RwLock<HashMap<String, User>>>,
    users_by_email: Arc<RwLock<HashMap<String, User>>>,
    groups: Arc<RwLock<HashMap<String, Group>>>,
    groups_by_slug: Arc<RwLock<HashMap<String, String>>>,
    // Keyed by (group_id, user_id): the map key is the uniqueness
    // constraint on the pair.
    memberships: Arc<RwLock<HashMap<(String, String), Membership>>>,
    posts: Arc<RwLock<HashMap<String, Post>>>,
    group_audits: Arc<RwLock<HashMap<String, Vec<GroupAudit>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage {
            users: Arc::new(RwLock::new(HashMap::new())),
            users_by_email: Arc::new(RwLock::new(HashMap::new())),
            groups: Arc::new(RwLock::new(HashMap::new())),
            groups_by_slug: Arc::new(RwLock::new(HashMap::new())),
            memberships: Arc::new(RwLock::new(HashMap::new())),
            posts: Arc::new(RwLock::new(HashMap::new())),
            group_audits: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_user_if_not_exists(&self, user: User) -> Result<User, HuddleError> {
        let mut users_by_email = self.users_by_email.write().await;
        if users_by_email.contains_key(&user.email) {
            return Err(HuddleError::EmailAlreadyRegistered(user.email));
        }
        let hashed_user = User {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            password: hash(&user.password, bcrypt::DEFAULT_COST)
                .map_err(|e| HuddleError::InternalServerError(format!("Password hashing error: {}", e)))?,
        };
        users_by_email.insert(user.email.clone(), hashed_user.clone());
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), hashed_user.clone());
        Ok(hashed_user)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, HuddleError> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, HuddleError> {
        let users_by_email = self.users_by_email.read().await;
        Ok(users_by_email.get(email).cloned())
    }

    async fn save_group(&self, group: Group) -> Result<(), HuddleError> {
        let mut groups = self.groups.write().await;
        let mut groups_by_slug = self.groups_by_slug.write().await;
        groups_by_slug.insert(group.slug.clone(), group.id.clone());
        groups.insert(group.id.clone(), group);
        Ok(())
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, HuddleError> {
        let groups = self.groups.read().await;
        Ok(groups.get(group_id).cloned())
    }

    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>, HuddleError> {
        let groups_by_slug = self.groups_by_slug.read().await;
        let groups = self.groups.read().await;
        Ok(groups_by_slug.get(slug).and_then(|group_id| groups.get(group_id).cloned()))
    }

    async fn insert_membership(&self, membership: Membership) -> Result<(), HuddleError> {
        let mut memberships = self.memberships.write().await;
        let key = (membership.group_id.clone(), membership.user_id.clone());
        if memberships.contains_key(&key) {
            return Err(HuddleError::AlreadyGroupMember(membership.user_id));
        }
        memberships.insert(key, membership);
        Ok(())
    }

    async fn replace_membership(&self, membership: Membership) -> Result<(), HuddleError> {
        let mut memberships = self.memberships.write().await;
        let key = (membership.group_id.clone(), membership.user_id.clone());
        memberships.insert(key, membership);
        Ok(())
    }

    async fn update_membership(&self, membership: Membership) -> Result<(), HuddleError> {
        let mut memberships = self.memberships.write().await;
        let key = (membership.group_id.clone(), membership.user_id.clone());
        if !memberships.contains_key(&key) {
            return Err(HuddleError::StorageError(format!(
                "No membership row for user {} in group {}",
                key.1, key.0
            )));
        }
        memberships.insert(key, membership);
        Ok(())
    }

    async fn delete_membership(&self, group_id: &str, user_id: &str) -> Result<(), HuddleError> {
        let mut memberships = self.memberships.write().await;
        memberships.remove(&(group_id.to_string(), user_id.to_string()));
        Ok(())
    }

    async fn get_membership(&self, group_id: &str, user_id: &str) -> Result<Option<Membership>, HuddleError> {
        let memberships = self.memberships.read().await;
        Ok(memberships.get(&(group_id.to_string(), user_id.to_string())).cloned())
    }

    async fn list_memberships(&self, group_id: &str) -> Result<Vec<Membership>, HuddleError> {
        let memberships = self.memberships.read().await;
        Ok(memberships
            .values()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn list_pending_requests(&self, group_id: &str) -> Result<Vec<Membership>, HuddleError> {
        let memberships = self.memberships.read().await;
        Ok(memberships
            .values()
            .filter(|m| m.group_id == group_id && m.status == MembershipStatus::Pending && m.token.is_none())
            .cloned()
            .collect())
    }

    async fn claim_invitation(&self, token: &str) -> Result<Option<Membership>, HuddleError> {
        // Lookup, validation, and consumption happen under one write
        // guard so the token is single-use even under concurrent accepts.
        let mut memberships = self.memberships.write().await;
        let now = Utc::now();
        let row = memberships.values_mut().find(|m| {
            m.token.as_deref() == Some(token)
                && m.token_used.is_none()
                && m.token_expire_date.is_some_and(|expiry| expiry > now)
        });
        Ok(row.map(|m| {
            m.status = MembershipStatus::Approved;
            m.token_used = Some(now);
            m.clone()
        }))
    }

    async fn take_invitation(&self, token: &str) -> Result<Option<Membership>, HuddleError> {
        let mut memberships = self.memberships.write().await;
        let now = Utc::now();
        let key = memberships
            .iter()
            .find(|(_, m)| {
                m.token.as_deref() == Some(token)
                    && m.token_used.is_none()
                    && m.token_expire_date.is_some_and(|expiry| expiry > now)
            })
            .map(|(key, _)| key.clone());
        Ok(key.and_then(|key| memberships.remove(&key)))
    }

    async fn save_post(&self, post: Post) -> Result<(), HuddleError> {
        let mut posts = self.posts.write().await;
        posts.insert(post.id.clone(), post);
        Ok(())
    }

    async fn get_group_posts(&self, group_id: &str) -> Result<Vec<Post>, HuddleError> {
        let posts = self.posts.read().await;
        let mut group_posts: Vec<Post> = posts.values().filter(|p| p.group_id == group_id).cloned().collect();
        group_posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(group_posts)
    }

    async fn save_group_audit(&self, audit: GroupAudit) -> Result<(), HuddleError> {
        let mut group_audits = self.group_audits.write().await;
        group_audits
            .entry(audit.group_id.clone())
            .or_insert_with(Vec::new)
            .push(audit);
        Ok(())
    }

    async fn get_group_audits(&self, group_id: &str) -> Result<Vec<GroupAudit>, HuddleError> {
        let group_audits = self.group_audits.read().await;
        Ok(group_audits.get(group_id).cloned().unwrap_or_default())
    }
}
