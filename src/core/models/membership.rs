use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MembershipStatus::Pending => "PENDING",
            MembershipStatus::Approved => "APPROVED",
            MembershipStatus::Rejected => "REJECTED",
        };
        write!(f, "{}", s)
    }
}

/// What an admin decides about a pending join request.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

/// One row per (user, group) pair. The invite token fields are only set
/// for admin-mediated invitations; a token is valid while `token_used`
/// is unset and `token_expire_date` lies in the future.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Membership {
    pub group_id: String,
    pub user_id: String,
    pub role: Role,
    pub status: MembershipStatus,
    pub token: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    #[schema(value_type = Option<i64>)]
    pub token_expire_date: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    #[schema(value_type = Option<i64>)]
    pub token_used: Option<DateTime<Utc>>,
    pub created_by: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: DateTime<Utc>,
}

impl Membership {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin && self.status == MembershipStatus::Approved
    }

    pub fn is_approved(&self) -> bool {
        self.status == MembershipStatus::Approved
    }

    pub fn is_pending(&self) -> bool {
        self.status == MembershipStatus::Pending
    }
}
