//! Request lifecycle handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{parse_object_id, ApiJson, AuthenticatedUser, OptionalApiJson};
use crate::error::{ApiError, ApiResult};
use crate::models::{ApiResponse, AttachmentKind};
use crate::requests::{
    ApproveRequestInput, AttachmentUpload, CreateRequestForm, ListQuery, RejectRequestInput,
    RequestView, ValidateRequestInput,
};
use crate::state::AppState;

type ViewResponse = ApiResult<Json<ApiResponse<RequestView>>>;

/// POST /request - multipart: text fields plus attachment files
pub async fn create_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ApiResponse<RequestView>>)> {
    let mut form = CreateRequestForm::default();
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(kind) = AttachmentKind::from_field_name(&name) {
            let file_name = field.file_name().unwrap_or(kind.field_name()).to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;

            uploads.push(AttachmentUpload {
                kind,
                file_name,
                content_type,
                bytes,
            });
        } else if field.file_name().is_some() {
            return Err(ApiError::BadRequest(format!(
                "Unknown attachment field '{}'",
                name
            )));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            form.set_field(&name, value)?;
        }
    }

    let view = state
        .request_service
        .create(form, uploads, &user.actor())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("request created successfully", view)),
    ))
}

/// GET /requests?populate=
pub async fn list_requests(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<RequestView>>>> {
    let views = state.request_service.get_all(query.populate).await?;

    Ok(Json(ApiResponse::ok("requests retrieved successfully", views)))
}

/// GET /request/:id
pub async fn get_request(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ViewResponse {
    let id = parse_object_id(&id)?;
    let view = state.request_service.get_by_id(id, true).await?;

    Ok(Json(ApiResponse::ok("request retrieved successfully", view)))
}

/// POST /validaterequest/:id
pub async fn validate_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ValidateRequestInput>,
) -> ViewResponse {
    let id = parse_object_id(&id)?;
    let view = state
        .request_service
        .validate(id, req, &user.actor())
        .await?;

    Ok(Json(ApiResponse::ok("request validated successfully", view)))
}

/// POST /approverequest/:id
pub async fn approve_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ApproveRequestInput>,
) -> ViewResponse {
    let id = parse_object_id(&id)?;
    let view = state
        .request_service
        .approve(id, req, &user.actor())
        .await?;

    Ok(Json(ApiResponse::ok("request approved successfully", view)))
}

/// POST /rejectrequest/:id - body optional
pub async fn reject_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    OptionalApiJson(req): OptionalApiJson<RejectRequestInput>,
) -> ViewResponse {
    let id = parse_object_id(&id)?;
    let req = req.unwrap_or_default();
    let view = state
        .request_service
        .reject(id, req, &user.actor())
        .await?;

    Ok(Json(ApiResponse::ok("request rejected successfully", view)))
}

/// POST /acceptrequest/:id
pub async fn accept_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ViewResponse {
    let id = parse_object_id(&id)?;
    let view = state.request_service.accept(id, &user.actor()).await?;

    Ok(Json(ApiResponse::ok("request accepted successfully", view)))
}

/// POST /declinerequest/:id
pub async fn decline_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ViewResponse {
    let id = parse_object_id(&id)?;
    let view = state.request_service.decline(id, &user.actor()).await?;

    Ok(Json(ApiResponse::ok("request declined successfully", view)))
}
