use super::membership::{MembershipStatus, Role};
use super::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Group {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub about: Option<String>,
    pub auto_approval: bool,
    pub cover_path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub owner_id: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: DateTime<Utc>,
}

/// A member as shown on the group profile: user joined with the role and
/// status of their membership row.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct GroupMember {
    pub user: User,
    pub role: Role,
    pub status: MembershipStatus,
}

impl GroupMember {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin && self.status == MembershipStatus::Approved
    }

    pub fn is_approved(&self) -> bool {
        self.status == MembershipStatus::Approved
    }
}
