//! Profile handlers

use axum::{
    extract::{Path, State},
    Json,
};

use super::{parse_object_id, ApiJson, AuthenticatedUser};
use crate::auth::UpdateProfileRequest;
use crate::error::ApiResult;
use crate::models::{ApiResponse, Profile};
use crate::state::AppState;

/// GET /profile/:id
pub async fn get_profile(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Profile>>> {
    let id = parse_object_id(&id)?;
    let profile = state.auth_service.get_profile(id).await?;

    Ok(Json(ApiResponse::ok("profile retrieved successfully", profile)))
}

/// PUT /profile/:id
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<ApiResponse<Profile>>> {
    let id = parse_object_id(&id)?;
    let profile = state
        .auth_service
        .update_profile(id, req, &user.actor())
        .await?;

    Ok(Json(ApiResponse::ok("profile updated successfully", profile)))
}
