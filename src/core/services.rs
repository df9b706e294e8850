use crate::auth::jwt::{Claims, JwtService};
use crate::constants::{
    GROUP_CREATED, GROUP_IMAGES_UPDATED, GROUP_JOINED, GROUP_UPDATED, INVITATION_ACCEPTED, INVITATION_DECLINED,
    INVITE_TOKEN_LENGTH, JOIN_REQUESTED, MEMBERS_CACHE_TTL, MEMBER_INVITED, MEMBER_REMOVED, POST_CREATED,
    PROFILE_QUERIED, REQUEST_APPROVED, REQUEST_REJECTED, ROLE_CHANGED, USER_REGISTERED,
};
use crate::core::errors::{FieldError, HuddleError};
use crate::core::models::{
    audit::{AppLog, GroupAudit},
    group::{Group, GroupMember},
    membership::{ApprovalAction, Membership, MembershipStatus, Role},
    post::Post,
    user::User,
};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use chrono::{Duration, Utc};
use log::{debug, info, warn};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, ToSchema, Clone)]
pub struct GroupProfileResponse {
    group: Group,
    members: Vec<GroupMember>,
    pending_requests: Vec<User>,
    posts: Option<Vec<Post>>,
}

impl GroupProfileResponse {
    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn members(&self) -> &Vec<GroupMember> {
        &self.members
    }

    pub fn pending_requests(&self) -> &Vec<User> {
        &self.pending_requests
    }

    pub fn posts(&self) -> Option<&Vec<Post>> {
        self.posts.as_ref()
    }
}

pub struct HuddleService<L: LoggingService, S: Storage, C: Cache> {
    storage: S,
    logging: L,
    cache: C,
    jwt_service: JwtService,
}

impl<L: LoggingService, S: Storage, C: Cache> HuddleService<L, S, C> {
    pub fn new(storage: S, logging: L, cache: C, jwt_secret: String) -> Self {
        HuddleService {
            storage,
            logging,
            cache,
            jwt_service: JwtService::new(jwt_secret),
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, HuddleError> {
        self.jwt_service.validate_token(token)
    }

    pub async fn validate_users(&self, user_ids: &[&str]) -> Result<(), HuddleError> {
        for &user_id in user_ids {
            if self.storage.get_user(user_id).await?.is_none() {
                return Err(HuddleError::UserNotFound(user_id.to_string()));
            }
        }
        Ok(())
    }

    async fn require_group(&self, slug: &str) -> Result<Group, HuddleError> {
        self.storage
            .get_group_by_slug(slug)
            .await?
            .ok_or_else(|| HuddleError::GroupNotFound(slug.to_string()))
    }

    /// Admin check for every mutating group operation. Re-reads the
    /// membership row on each call; the result is never cached across
    /// requests. Admin means role ADMIN with APPROVED status, which the
    /// owner holds from group creation onward.
    async fn require_group_admin(&self, group: &Group, user_id: &str) -> Result<Membership, HuddleError> {
        match self.storage.get_membership(&group.id, user_id).await? {
            Some(membership) if membership.is_admin() => Ok(membership),
            _ => {
                warn!("User {} is not an admin of group {}", user_id, group.slug);
                Err(HuddleError::NotGroupAdmin(user_id.to_string()))
            }
        }
    }

    async fn log_and_audit(
        &self,
        group_id: Option<&str>,
        action: &str,
        log_details: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<(), HuddleError> {
        self.logging.log_action(action, log_details.clone(), user_id).await?;
        if let Some(gid) = group_id {
            self.storage
                .save_group_audit(GroupAudit {
                    id: Uuid::new_v4().to_string(),
                    group_id: gid.to_string(),
                    action: action.to_string(),
                    user_id: user_id.map(String::from),
                    details: serde_json::from_value(log_details).unwrap_or_default(),
                    timestamp: Utc::now(),
                })
                .await?;
        }
        Ok(())
    }

    fn validate_string_input(&self, field: &str, value: &str, max_length: usize) -> Result<(), HuddleError> {
        if value.trim().is_empty() {
            return Err(HuddleError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("Invalid {}", field),
                    description: format!("{} cannot be empty", field),
                },
            ));
        }
        if value.len() > max_length {
            return Err(HuddleError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("{} Too Long", field),
                    description: format!("{} cannot exceed {} characters", field, max_length),
                },
            ));
        }
        if value.chars().any(|c| c.is_control() || "<>{}[]".contains(c)) {
            return Err(HuddleError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("Invalid {}", field),
                    description: format!("{} contains invalid characters", field),
                },
            ));
        }
        Ok(())
    }

    fn slugify(name: &str) -> String {
        let lowered = name.to_lowercase();
        let slug = lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        if slug.is_empty() { Uuid::new_v4().to_string() } else { slug }
    }

    async fn unique_slug(&self, name: &str) -> Result<String, HuddleError> {
        let base = Self::slugify(name);
        if self.storage.get_group_by_slug(&base).await?.is_none() {
            return Ok(base);
        }
        loop {
            let candidate = format!("{}-{}", base, &Uuid::new_v4().to_string()[..8]);
            if self.storage.get_group_by_slug(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
    }

    fn generate_invite_token() -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(INVITE_TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }

    // IDENTITY

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<String, HuddleError> {
        let user = self
            .storage
            .get_user_by_email(email)
            .await?
            .ok_or(HuddleError::InvalidCredentials)?;

        if bcrypt::verify(password, &user.password)
            .map_err(|e| HuddleError::InternalServerError(format!("Password verification error: {}", e)))?
        {
            self.jwt_service.generate_token(&user.id, &Role::User.to_string())
        } else {
            Err(HuddleError::InvalidCredentials)
        }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, HuddleError> {
        self.storage.get_user(user_id).await
    }

    pub async fn register_user(&self, user: User, created_by: Option<&User>) -> Result<User, HuddleError> {
        if user.email.is_empty() {
            return Err(HuddleError::MissingEmail);
        }
        if !user.email.contains('@') || !user.email.contains('.') || user.email.len() < 5 {
            return Err(HuddleError::InvalidEmail(user.email.clone()));
        }
        if user.password.is_empty() {
            return Err(HuddleError::InvalidInput(
                "password".to_string(),
                FieldError {
                    field: "password".to_string(),
                    title: "Invalid password".to_string(),
                    description: "Password cannot be empty".to_string(),
                },
            ));
        }

        self.validate_string_input("name", &user.name, 100)?;

        let new_user = self.storage.create_user_if_not_exists(user.clone()).await?;
        self.log_and_audit(
            None,
            USER_REGISTERED,
            json!({ "user_id": new_user.id, "name": new_user.name, "email": new_user.email }),
            created_by.map(|u| u.id.as_str()),
        )
        .await?;
        Ok(new_user)
    }

    // GROUPS

    pub async fn create_group(
        &self,
        name: String,
        about: Option<String>,
        auto_approval: bool,
        created_by: &User,
    ) -> Result<Group, HuddleError> {
        info!("Creating group '{}' for owner {}", name, created_by.id);
        self.validate_users(&[&created_by.id]).await?;
        self.validate_string_input("name", &name, 255)?;
        if let Some(ref about) = about {
            self.validate_string_input("about", about, 5000)?;
        }

        let slug = self.unique_slug(&name).await?;
        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4().to_string(),
            slug,
            name,
            about,
            auto_approval,
            cover_path: None,
            thumbnail_path: None,
            owner_id: created_by.id.clone(),
            created_at: now,
        };
        self.storage.save_group(group.clone()).await?;

        // The creator is the owner: an APPROVED admin membership from the
        // first moment the group exists.
        self.storage
            .insert_membership(Membership {
                group_id: group.id.clone(),
                user_id: created_by.id.clone(),
                role: Role::Admin,
                status: MembershipStatus::Approved,
                token: None,
                token_expire_date: None,
                token_used: None,
                created_by: created_by.id.clone(),
                created_at: now,
            })
            .await?;

        self.log_and_audit(
            Some(&group.id),
            GROUP_CREATED,
            json!({
                "group_id": group.id,
                "slug": group.slug,
                "name": group.name,
                "auto_approval": group.auto_approval
            }),
            Some(created_by.id.as_str()),
        )
        .await?;

        Ok(group)
    }

    pub async fn update_group(
        &self,
        slug: &str,
        new_name: Option<String>,
        new_about: Option<String>,
        new_auto_approval: Option<bool>,
        updated_by: &User,
    ) -> Result<Group, HuddleError> {
        let mut group = self.require_group(slug).await?;
        self.require_group_admin(&group, &updated_by.id).await?;

        if let Some(name) = new_name {
            self.validate_string_input("name", &name, 255)?;
            group.name = name;
        }
        if let Some(about) = new_about {
            self.validate_string_input("about", &about, 5000)?;
            group.about = Some(about);
        }
        if let Some(auto_approval) = new_auto_approval {
            group.auto_approval = auto_approval;
        }
        self.storage.save_group(group.clone()).await?;

        self.log_and_audit(
            Some(&group.id),
            GROUP_UPDATED,
            json!({ "group_id": group.id, "name": group.name, "auto_approval": group.auto_approval }),
            Some(updated_by.id.as_str()),
        )
        .await?;

        Ok(group)
    }

    /// Replaces the stored asset paths. Moving the image bytes themselves
    /// is the file store's concern, not this service's.
    pub async fn update_group_images(
        &self,
        slug: &str,
        cover_path: Option<String>,
        thumbnail_path: Option<String>,
        updated_by: &User,
    ) -> Result<Group, HuddleError> {
        let mut group = self.require_group(slug).await?;
        self.require_group_admin(&group, &updated_by.id).await?;

        if let Some(cover) = cover_path {
            group.cover_path = Some(cover);
        }
        if let Some(thumbnail) = thumbnail_path {
            group.thumbnail_path = Some(thumbnail);
        }
        self.storage.save_group(group.clone()).await?;

        self.log_and_audit(
            Some(&group.id),
            GROUP_IMAGES_UPDATED,
            json!({ "group_id": group.id, "cover_path": group.cover_path, "thumbnail_path": group.thumbnail_path }),
            Some(updated_by.id.as_str()),
        )
        .await?;

        Ok(group)
    }

    async fn approved_members(&self, group: &Group) -> Result<Vec<GroupMember>, HuddleError> {
        if let Some(cached) = self.cache.get_group_members(&group.id).await? {
            debug!("Member list for group {} served from cache", group.slug);
            return Ok(cached);
        }

        let memberships: Vec<Membership> = self
            .storage
            .list_memberships(&group.id)
            .await?
            .into_iter()
            .filter(|m| m.is_approved())
            .collect();
        let users =
            futures::future::try_join_all(memberships.iter().map(|m| self.storage.get_user(&m.user_id))).await?;
        let mut members = memberships
            .iter()
            .zip(users)
            .map(|(membership, user)| {
                let user = user.ok_or_else(|| HuddleError::UserNotFound(membership.user_id.clone()))?;
                Ok(GroupMember {
                    user,
                    role: membership.role,
                    status: membership.status,
                })
            })
            .collect::<Result<Vec<_>, HuddleError>>()?;
        members.sort_by(|a, b| a.user.name.cmp(&b.user.name));

        self.cache
            .save_group_members(&group.id, &members, MEMBERS_CACHE_TTL)
            .await?;
        Ok(members)
    }

    /// The group page: metadata, the approved member list, the pending
    /// join requests (admins only), and the post timeline (approved
    /// viewers only).
    pub async fn group_profile(&self, slug: &str, viewer: &User) -> Result<GroupProfileResponse, HuddleError> {
        let group = self.require_group(slug).await?;
        let viewer_membership = self.storage.get_membership(&group.id, &viewer.id).await?;
        let viewer_approved = viewer_membership.as_ref().is_some_and(|m| m.is_approved());
        let viewer_admin = viewer_membership.as_ref().is_some_and(|m| m.is_admin());

        let members = self.approved_members(&group).await?;

        let pending_requests = if viewer_admin {
            let requests = self.storage.list_pending_requests(&group.id).await?;
            let users =
                futures::future::try_join_all(requests.iter().map(|m| self.storage.get_user(&m.user_id))).await?;
            let mut pending: Vec<User> = users.into_iter().flatten().collect();
            pending.sort_by(|a, b| a.name.cmp(&b.name));
            pending
        } else {
            Vec::new()
        };

        let posts = if viewer_approved {
            Some(self.storage.get_group_posts(&group.id).await?)
        } else {
            None
        };

        self.log_and_audit(
            None,
            PROFILE_QUERIED,
            json!({ "group_id": group.id, "slug": group.slug }),
            Some(viewer.id.as_str()),
        )
        .await?;

        Ok(GroupProfileResponse {
            group,
            members,
            pending_requests,
            posts,
        })
    }

    // MEMBERSHIP WORKFLOW

    /// Direct join. Auto-approval groups admit immediately; otherwise the
    /// membership starts out PENDING and waits for an admin.
    pub async fn join_group(&self, slug: &str, user: &User) -> Result<Membership, HuddleError> {
        info!("User {} joining group {}", user.id, slug);
        let group = self.require_group(slug).await?;
        self.validate_users(&[&user.id]).await?;

        let status = if group.auto_approval {
            MembershipStatus::Approved
        } else {
            MembershipStatus::Pending
        };
        let membership = Membership {
            group_id: group.id.clone(),
            user_id: user.id.clone(),
            role: Role::User,
            status,
            token: None,
            token_expire_date: None,
            token_used: None,
            created_by: user.id.clone(),
            created_at: Utc::now(),
        };
        self.storage.insert_membership(membership.clone()).await?;
        self.cache.invalidate_group_members(&group.id).await?;

        self.log_and_audit(
            Some(&group.id),
            GROUP_JOINED,
            json!({ "group_id": group.id, "user_id": user.id, "status": status.to_string() }),
            Some(user.id.as_str()),
        )
        .await?;

        Ok(membership)
    }

    /// Approval-gated join request: always lands PENDING, never carries a
    /// token. Rejected with AlreadyGroupMember while any row for the pair
    /// exists, whatever its status.
    pub async fn request_join(&self, slug: &str, user: &User) -> Result<Membership, HuddleError> {
        info!("User {} requesting to join group {}", user.id, slug);
        let group = self.require_group(slug).await?;
        self.validate_users(&[&user.id]).await?;

        let membership = Membership {
            group_id: group.id.clone(),
            user_id: user.id.clone(),
            role: Role::User,
            status: MembershipStatus::Pending,
            token: None,
            token_expire_date: None,
            token_used: None,
            created_by: user.id.clone(),
            created_at: Utc::now(),
        };
        self.storage.insert_membership(membership.clone()).await?;

        self.log_and_audit(
            Some(&group.id),
            JOIN_REQUESTED,
            json!({ "group_id": group.id, "user_id": user.id }),
            Some(user.id.as_str()),
        )
        .await?;

        Ok(membership)
    }

    /// Admin-mediated invitation. Any prior row for the target is
    /// superseded, so a previously rejected or removed user can be
    /// re-invited; the returned token is the sole credential for
    /// accepting or declining and is delivered out of band.
    pub async fn invite_user(
        &self,
        slug: &str,
        email: &str,
        expires_in_hours: i64,
        invited_by: &User,
    ) -> Result<String, HuddleError> {
        info!("User {} inviting {} to group {}", invited_by.id, email, slug);
        let group = self.require_group(slug).await?;
        self.require_group_admin(&group, &invited_by.id).await?;

        let user = self
            .storage
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| HuddleError::UserNotFound(email.to_string()))?;
        if user.id == group.owner_id {
            return Err(HuddleError::CannotChangeOwnerRole);
        }

        let token = Self::generate_invite_token();
        let membership = Membership {
            group_id: group.id.clone(),
            user_id: user.id.clone(),
            role: Role::User,
            status: MembershipStatus::Pending,
            token: Some(token.clone()),
            token_expire_date: Some(Utc::now() + Duration::hours(expires_in_hours)),
            token_used: None,
            created_by: invited_by.id.clone(),
            created_at: Utc::now(),
        };
        self.storage.replace_membership(membership).await?;
        self.cache.invalidate_group_members(&group.id).await?;

        self.log_and_audit(
            Some(&group.id),
            MEMBER_INVITED,
            json!({
                "group_id": group.id,
                "user_id": user.id,
                "email": user.email,
                "expires_in_hours": expires_in_hours
            }),
            Some(invited_by.id.as_str()),
        )
        .await?;

        Ok(token)
    }

    /// Token-authenticated: possession of a live token is the only
    /// authorization factor, by design, so invite links work without a
    /// session. Invalid and expired tokens are indistinguishable to the
    /// caller.
    pub async fn approve_invitation(&self, token: &str) -> Result<Group, HuddleError> {
        let membership = self
            .storage
            .claim_invitation(token)
            .await?
            .ok_or(HuddleError::InvitationNotFound)?;
        let group = self
            .storage
            .get_group(&membership.group_id)
            .await?
            .ok_or_else(|| HuddleError::GroupNotFound(membership.group_id.clone()))?;
        self.cache.invalidate_group_members(&group.id).await?;

        self.log_and_audit(
            Some(&group.id),
            INVITATION_ACCEPTED,
            json!({ "group_id": group.id, "user_id": membership.user_id }),
            Some(membership.user_id.as_str()),
        )
        .await?;

        Ok(group)
    }

    /// Token-authenticated, same lookup as [`Self::approve_invitation`];
    /// declining deletes the row so the user can be invited again later.
    pub async fn reject_invitation(&self, token: &str) -> Result<Group, HuddleError> {
        let membership = self
            .storage
            .take_invitation(token)
            .await?
            .ok_or(HuddleError::InvitationNotFound)?;
        let group = self
            .storage
            .get_group(&membership.group_id)
            .await?
            .ok_or_else(|| HuddleError::GroupNotFound(membership.group_id.clone()))?;

        self.log_and_audit(
            Some(&group.id),
            INVITATION_DECLINED,
            json!({ "group_id": group.id, "user_id": membership.user_id }),
            Some(membership.user_id.as_str()),
        )
        .await?;

        Ok(group)
    }

    /// Admin decision on a pending join request. A missing pending row is
    /// a no-op, not an error.
    pub async fn approve_request(
        &self,
        slug: &str,
        user_id: &str,
        action: ApprovalAction,
        acting: &User,
    ) -> Result<(), HuddleError> {
        let group = self.require_group(slug).await?;
        self.require_group_admin(&group, &acting.id).await?;

        let membership = self.storage.get_membership(&group.id, user_id).await?;
        let Some(mut membership) = membership.filter(|m| m.is_pending()) else {
            warn!("No pending membership for user {} in group {}", user_id, slug);
            return Ok(());
        };

        let audit_action = match action {
            ApprovalAction::Approve => {
                membership.status = MembershipStatus::Approved;
                REQUEST_APPROVED
            }
            ApprovalAction::Reject => {
                membership.status = MembershipStatus::Rejected;
                REQUEST_REJECTED
            }
        };
        self.storage.update_membership(membership).await?;
        self.cache.invalidate_group_members(&group.id).await?;

        self.log_and_audit(
            Some(&group.id),
            audit_action,
            json!({ "group_id": group.id, "user_id": user_id }),
            Some(acting.id.as_str()),
        )
        .await?;

        Ok(())
    }

    pub async fn change_role(
        &self,
        slug: &str,
        user_id: &str,
        new_role: Role,
        acting: &User,
    ) -> Result<(), HuddleError> {
        let group = self.require_group(slug).await?;
        self.require_group_admin(&group, &acting.id).await?;

        if user_id == group.owner_id {
            warn!("Refusing to change the owner's role in group {}", slug);
            return Err(HuddleError::CannotChangeOwnerRole);
        }

        let mut membership = self
            .storage
            .get_membership(&group.id, user_id)
            .await?
            .ok_or_else(|| HuddleError::NotGroupMember(user_id.to_string()))?;
        membership.role = new_role;
        self.storage.update_membership(membership).await?;
        self.cache.invalidate_group_members(&group.id).await?;

        self.log_and_audit(
            Some(&group.id),
            ROLE_CHANGED,
            json!({ "group_id": group.id, "user_id": user_id, "role": new_role.to_string() }),
            Some(acting.id.as_str()),
        )
        .await?;

        Ok(())
    }

    pub async fn remove_user(&self, slug: &str, user_id: &str, acting: &User) -> Result<(), HuddleError> {
        let group = self.require_group(slug).await?;
        self.require_group_admin(&group, &acting.id).await?;

        if user_id == group.owner_id {
            warn!("Refusing to remove the owner from group {}", slug);
            return Err(HuddleError::CannotRemoveOwner);
        }

        if self.storage.get_membership(&group.id, user_id).await?.is_none() {
            warn!("No membership for user {} in group {}", user_id, slug);
            return Ok(());
        }
        self.storage.delete_membership(&group.id, user_id).await?;
        self.cache.invalidate_group_members(&group.id).await?;

        self.log_and_audit(
            Some(&group.id),
            MEMBER_REMOVED,
            json!({ "group_id": group.id, "user_id": user_id }),
            Some(acting.id.as_str()),
        )
        .await?;

        Ok(())
    }

    // POSTS

    /// Posting requires an APPROVED membership; the same invariant gates
    /// reading the timeline in [`Self::group_profile`].
    pub async fn create_post(&self, slug: &str, body: String, author: &User) -> Result<Post, HuddleError> {
        let group = self.require_group(slug).await?;
        let approved = self
            .storage
            .get_membership(&group.id, &author.id)
            .await?
            .is_some_and(|m| m.is_approved());
        if !approved {
            warn!("User {} cannot post in group {} without approval", author.id, slug);
            return Err(HuddleError::MembershipNotApproved(author.id.clone()));
        }
        self.validate_string_input("body", &body, 5000)?;

        let post = Post {
            id: Uuid::new_v4().to_string(),
            group_id: group.id.clone(),
            author_id: author.id.clone(),
            body,
            created_at: Utc::now(),
        };
        self.storage.save_post(post.clone()).await?;

        self.log_and_audit(
            Some(&group.id),
            POST_CREATED,
            json!({ "group_id": group.id, "post_id": post.id }),
            Some(author.id.as_str()),
        )
        .await?;

        Ok(post)
    }

    // OBSERVABILITY

    pub async fn get_app_logs(&self) -> Result<Vec<AppLog>, HuddleError> {
        self.logging.get_logs().await
    }

    pub async fn get_group_audits(&self, slug: &str) -> Result<Vec<GroupAudit>, HuddleError> {
        let group = self.require_group(slug).await?;
        self.storage.get_group_audits(&group.id).await
    }
}
