use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::errors::HuddleError;
use crate::core::models::membership::{ApprovalAction, Role};

// Request structs for JSON payloads
#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created_by_id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
    pub about: Option<String>,
    pub auto_approval: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub about: Option<String>,
    pub auto_approval: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateGroupImagesRequest {
    pub cover_path: Option<String>,
    pub thumbnail_path: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct InviteUserRequest {
    pub email: String,
    pub expires_in_hours: Option<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct InviteUserResponse {
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ApproveRequestRequest {
    pub user_id: String,
    pub action: ApprovalAction,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangeRoleRequest {
    pub user_id: String,
    pub role: Role,
}

#[derive(Deserialize, ToSchema)]
pub struct RemoveUserRequest {
    pub user_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub body: String,
}

// Error response struct
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// Newtype wrapper for HuddleError to implement IntoResponse
pub struct ApiError(pub HuddleError);

impl From<HuddleError> for ApiError {
    fn from(err: HuddleError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            HuddleError::MissingEmail
            | HuddleError::InvalidEmail(_)
            | HuddleError::InvalidInput(_, _) => StatusCode::BAD_REQUEST,
            HuddleError::EmailAlreadyRegistered(_) | HuddleError::AlreadyGroupMember(_) => StatusCode::CONFLICT,
            HuddleError::UserNotFound(_)
            | HuddleError::GroupNotFound(_)
            | HuddleError::NotGroupMember(_)
            | HuddleError::InvitationNotFound => StatusCode::NOT_FOUND,
            HuddleError::NotGroupAdmin(_)
            | HuddleError::CannotChangeOwnerRole
            | HuddleError::CannotRemoveOwner
            | HuddleError::MembershipNotApproved(_) => StatusCode::FORBIDDEN,
            HuddleError::InvalidCredentials | HuddleError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            HuddleError::InternalServerError(_)
            | HuddleError::StorageError(_)
            | HuddleError::LoggingError(_)
            | HuddleError::CacheError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}
