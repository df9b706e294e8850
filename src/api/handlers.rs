use crate::{
    api::models::*,
    auth::jwt::Claims,
    constants::INVITE_EXPIRY_HOURS,
    core::{
        errors::HuddleError,
        models::{
            audit::{AppLog, GroupAudit},
            group::Group,
            membership::Membership,
            post::Post,
            user::User,
        },
        services::{GroupProfileResponse, HuddleService},
    },
    infrastructure::{
        cache::in_memory::InMemoryCache, logging::in_memory::InMemoryLogging, storage::in_memory::InMemoryStorage,
    },
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
};
use http::header;

use std::sync::Arc;

// Middleware to validate JWT for the session-authenticated routes
async fn auth_middleware(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| HuddleError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| HuddleError::Unauthorized("Invalid Authorization header".to_string()))?;

    let claims = service.validate_token(token)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

async fn acting_user(
    service: &HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>,
    claims: &Claims,
) -> Result<User, ApiError> {
    Ok(service
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| HuddleError::UserNotFound(claims.sub.clone()))?)
}

// Define API routes. The invitation endpoints stay outside the JWT
// middleware: they are token-authenticated, the invite token being the
// sole credential.
pub fn api_routes(service: Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>) -> Router {
    let protected_routes = Router::new()
        .route("/users/{user_id}", axum::routing::get(get_user))
        .route("/groups", axum::routing::post(create_group))
        .route("/groups/{slug}", axum::routing::get(group_profile))
        .route("/groups/{slug}", axum::routing::put(update_group))
        .route("/groups/{slug}/images", axum::routing::post(update_group_images))
        .route("/groups/{slug}/join", axum::routing::post(join_group))
        .route("/groups/{slug}/request-join", axum::routing::post(request_join))
        .route("/groups/{slug}/invite", axum::routing::post(invite_user))
        .route("/groups/{slug}/approve-request", axum::routing::post(approve_request))
        .route("/groups/{slug}/change-role", axum::routing::post(change_role))
        .route("/groups/{slug}/remove-user", axum::routing::post(remove_user))
        .route("/groups/{slug}/posts", axum::routing::post(create_post))
        .route("/groups/{slug}/audits", axum::routing::get(get_group_audits))
        .route("/logs", axum::routing::get(get_app_logs))
        .route_layer(middleware::from_fn_with_state(service.clone(), auth_middleware));

    Router::new()
        .route("/login", axum::routing::post(login))
        .route("/users", axum::routing::post(create_user)) // Unprotected
        .route(
            "/invitations/{token}/approve",
            axum::routing::post(approve_invitation), // Token-authenticated
        )
        .route(
            "/invitations/{token}/reject",
            axum::routing::post(reject_invitation), // Token-authenticated
        )
        .merge(protected_routes)
        .with_state(service)
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn login(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = service.authenticate(&req.email, &req.password).await?;
    Ok(Json(LoginResponse { token }))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User registered successfully"),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 404, description = "Created by user not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_user(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<StatusCode, ApiError> {
    let user = User {
        id: req.id,
        name: req.name,
        email: req.email,
        password: req.password,
    };
    let created_by_user = if let Some(ref id) = req.created_by_id {
        Some(
            service
                .get_user(id)
                .await?
                .ok_or_else(|| HuddleError::UserNotFound(id.clone()))?,
        )
    } else {
        None
    };
    service.register_user(user, created_by_user.as_ref()).await?;
    Ok(StatusCode::CREATED)
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(
        ("user_id" = String, Path, description = "ID of the user to retrieve")
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = User),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_user(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = service
        .get_user(&user_id)
        .await?
        .ok_or_else(|| HuddleError::UserNotFound(user_id))?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 200, description = "Group created successfully", body = Group),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_group(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<Json<Group>, ApiError> {
    let created_by = acting_user(&service, &claims).await?;
    let group = service
        .create_group(req.name, req.about, req.auto_approval, &created_by)
        .await?;
    Ok(Json(group))
}

#[utoipa::path(
    get,
    path = "/api/groups/{slug}",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    responses(
        (status = 200, description = "Group profile retrieved", body = GroupProfileResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn group_profile(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<Json<GroupProfileResponse>, ApiError> {
    let viewer = acting_user(&service, &claims).await?;
    let profile = service.group_profile(&slug, &viewer).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    put,
    path = "/api/groups/{slug}",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    request_body = UpdateGroupRequest,
    responses(
        (status = 200, description = "Group updated", body = Group),
        (status = 403, description = "Not a group admin", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_group(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<Json<Group>, ApiError> {
    let updated_by = acting_user(&service, &claims).await?;
    let group = service
        .update_group(&slug, req.name, req.about, req.auto_approval, &updated_by)
        .await?;
    Ok(Json(group))
}

#[utoipa::path(
    post,
    path = "/api/groups/{slug}/images",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    request_body = UpdateGroupImagesRequest,
    responses(
        (status = 200, description = "Group images updated", body = Group),
        (status = 403, description = "Not a group admin", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn update_group_images(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(req): Json<UpdateGroupImagesRequest>,
) -> Result<Json<Group>, ApiError> {
    let updated_by = acting_user(&service, &claims).await?;
    let group = service
        .update_group_images(&slug, req.cover_path, req.thumbnail_path, &updated_by)
        .await?;
    Ok(Json(group))
}

#[utoipa::path(
    post,
    path = "/api/groups/{slug}/join",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    responses(
        (status = 200, description = "Joined or join pending", body = Membership),
        (status = 409, description = "Already requested or joined", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn join_group(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<Json<Membership>, ApiError> {
    let user = acting_user(&service, &claims).await?;
    let membership = service.join_group(&slug, &user).await?;
    Ok(Json(membership))
}

#[utoipa::path(
    post,
    path = "/api/groups/{slug}/request-join",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    responses(
        (status = 200, description = "Join request created", body = Membership),
        (status = 409, description = "Already requested or joined", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn request_join(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<Json<Membership>, ApiError> {
    let user = acting_user(&service, &claims).await?;
    let membership = service.request_join(&slug, &user).await?;
    Ok(Json(membership))
}

#[utoipa::path(
    post,
    path = "/api/groups/{slug}/invite",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    request_body = InviteUserRequest,
    responses(
        (status = 200, description = "Invitation created", body = InviteUserResponse),
        (status = 403, description = "Not a group admin", body = ErrorResponse),
        (status = 404, description = "User or group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn invite_user(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(req): Json<InviteUserRequest>,
) -> Result<Json<InviteUserResponse>, ApiError> {
    let invited_by = acting_user(&service, &claims).await?;
    let token = service
        .invite_user(
            &slug,
            &req.email,
            req.expires_in_hours.unwrap_or(INVITE_EXPIRY_HOURS),
            &invited_by,
        )
        .await?;
    Ok(Json(InviteUserResponse { token }))
}

#[utoipa::path(
    post,
    path = "/api/invitations/{token}/approve",
    params(
        ("token" = String, Path, description = "Invitation token")
    ),
    responses(
        (status = 200, description = "Invitation accepted", body = Group),
        (status = 404, description = "Invitation invalid or expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn approve_invitation(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Path(token): Path<String>,
) -> Result<Json<Group>, ApiError> {
    let group = service.approve_invitation(&token).await?;
    Ok(Json(group))
}

#[utoipa::path(
    post,
    path = "/api/invitations/{token}/reject",
    params(
        ("token" = String, Path, description = "Invitation token")
    ),
    responses(
        (status = 200, description = "Invitation declined", body = Group),
        (status = 404, description = "Invitation invalid or expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn reject_invitation(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Path(token): Path<String>,
) -> Result<Json<Group>, ApiError> {
    let group = service.reject_invitation(&token).await?;
    Ok(Json(group))
}

#[utoipa::path(
    post,
    path = "/api/groups/{slug}/approve-request",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    request_body = ApproveRequestRequest,
    responses(
        (status = 200, description = "Request resolved"),
        (status = 403, description = "Not a group admin", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn approve_request(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(req): Json<ApproveRequestRequest>,
) -> Result<StatusCode, ApiError> {
    let acting = acting_user(&service, &claims).await?;
    service.approve_request(&slug, &req.user_id, req.action, &acting).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/groups/{slug}/change-role",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Role changed"),
        (status = 403, description = "Not a group admin or target is the owner", body = ErrorResponse),
        (status = 404, description = "Group or member not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn change_role(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(req): Json<ChangeRoleRequest>,
) -> Result<StatusCode, ApiError> {
    let acting = acting_user(&service, &claims).await?;
    service.change_role(&slug, &req.user_id, req.role, &acting).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/groups/{slug}/remove-user",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    request_body = RemoveUserRequest,
    responses(
        (status = 200, description = "Member removed"),
        (status = 403, description = "Not a group admin or target is the owner", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn remove_user(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(req): Json<RemoveUserRequest>,
) -> Result<StatusCode, ApiError> {
    let acting = acting_user(&service, &claims).await?;
    service.remove_user(&slug, &req.user_id, &acting).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/groups/{slug}/posts",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    request_body = CreatePostRequest,
    responses(
        (status = 200, description = "Post created", body = Post),
        (status = 403, description = "No approved membership", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn create_post(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    let author = acting_user(&service, &claims).await?;
    let post = service.create_post(&slug, req.body, &author).await?;
    Ok(Json(post))
}

#[utoipa::path(
    get,
    path = "/api/logs",
    responses(
        (status = 200, description = "Application logs", body = Vec<AppLog>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_app_logs(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
) -> Result<Json<Vec<AppLog>>, ApiError> {
    let logs = service.get_app_logs().await?;
    Ok(Json(logs))
}

#[utoipa::path(
    get,
    path = "/api/groups/{slug}/audits",
    params(
        ("slug" = String, Path, description = "Slug of the group")
    ),
    responses(
        (status = 200, description = "Group audit trail", body = Vec<GroupAudit>),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub async fn get_group_audits(
    State(service): State<Arc<HuddleService<InMemoryLogging, InMemoryStorage, InMemoryCache>>>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<GroupAudit>>, ApiError> {
    let audits = service.get_group_audits(&slug).await?;
    Ok(Json(audits))
}
