use utoipa::OpenApi;

use crate::{
    api::models::{
        ApproveRequestRequest, ChangeRoleRequest, CreateGroupRequest, CreatePostRequest, CreateUserRequest,
        ErrorResponse, InviteUserRequest, InviteUserResponse, LoginRequest, LoginResponse, RemoveUserRequest,
        UpdateGroupImagesRequest, UpdateGroupRequest,
    },
    core::{
        models::{
            audit::{AppLog, GroupAudit},
            group::{Group, GroupMember},
            membership::{ApprovalAction, Membership, MembershipStatus, Role},
            post::Post,
            user::User,
        },
        services::GroupProfileResponse,
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::login,
        super::handlers::create_user,
        super::handlers::get_user,
        super::handlers::create_group,
        super::handlers::group_profile,
        super::handlers::update_group,
        super::handlers::update_group_images,
        super::handlers::join_group,
        super::handlers::request_join,
        super::handlers::invite_user,
        super::handlers::approve_invitation,
        super::handlers::reject_invitation,
        super::handlers::approve_request,
        super::handlers::change_role,
        super::handlers::remove_user,
        super::handlers::create_post,
        super::handlers::get_app_logs,
        super::handlers::get_group_audits
    ),
    components(schemas(
        LoginRequest,
        LoginResponse,
        CreateUserRequest,
        CreateGroupRequest,
        UpdateGroupRequest,
        UpdateGroupImagesRequest,
        InviteUserRequest,
        InviteUserResponse,
        ApproveRequestRequest,
        ChangeRoleRequest,
        RemoveUserRequest,
        CreatePostRequest,
        ErrorResponse,
        User,
        Group,
        GroupMember,
        Membership,
        MembershipStatus,
        Role,
        ApprovalAction,
        Post,
        AppLog,
        GroupAudit,
        GroupProfileResponse
    )),
    info(
        title = "Huddle API",
        description = "API for social groups: membership, invitations, and member-only posts",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
