//! Authentication HTTP handlers

use axum::{extract::State, http::StatusCode, Json};

use super::{ApiJson, AuthenticatedUser};
use crate::auth::{CreateRoleRequest, LoginRequest, LoginResponse, RegisterRequest, UserResponse};
use crate::error::ApiResult;
use crate::models::{ApiResponse, Role};
use crate::state::AppState;

/// POST /register - public for requesters, other roles need an administrator's token
pub async fn register(
    State(state): State<AppState>,
    registrar: Option<AuthenticatedUser>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    let registrar = registrar.map(|user| user.actor());
    let user = state
        .auth_service
        .register(req, registrar.as_ref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("user registered successfully", user)),
    ))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<ApiResponse<LoginResponse>>> {
    let response = state.auth_service.login(req).await?;

    Ok(Json(ApiResponse::ok("login successful", response)))
}

/// POST /logout - blacklist the presented token
pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .auth_service
        .logout(&user.token, &user.claims, user.client_ip.clone())
        .await?;

    Ok(Json(ApiResponse::message("logged out successfully")))
}

/// GET /me
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    let response = state.auth_service.find_by_id(user.user_id).await?;

    Ok(Json(ApiResponse::ok("user retrieved successfully", response)))
}

/// GET /roles
pub async fn list_roles(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> ApiResult<Json<ApiResponse<Vec<Role>>>> {
    let roles = state.auth_service.list_roles().await?;

    Ok(Json(ApiResponse::ok("roles retrieved successfully", roles)))
}

/// POST /roles
pub async fn create_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Role>>)> {
    let role = state.auth_service.create_role(req, &user.actor()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("role created successfully", role)),
    ))
}
