//! Reference data handlers. Reads are public, creation is for administrators.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{parse_object_id, ApiJson, AuthenticatedUser};
use crate::error::ApiResult;
use crate::models::ApiResponse;
use crate::reference::*;
use crate::state::AppState;

type Listed<T> = ApiResult<Json<ApiResponse<Vec<T>>>>;
type Created<T> = ApiResult<(StatusCode, Json<ApiResponse<T>>)>;

fn listed<T>(what: &str, items: Vec<T>) -> Json<ApiResponse<Vec<T>>> {
    Json(ApiResponse::ok(format!("{} retrieved successfully", what), items))
}

fn created<T: Serialize>(what: &str, item: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::CREATED,
        Json(ApiResponse::ok(format!("{} created successfully", what), item)),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct BranchQuery {
    pub district_id: Option<String>,
}

/// GET /currencies
pub async fn list_currencies(State(state): State<AppState>) -> Listed<Currency> {
    let items = state.reference_service.list_currencies().await?;
    Ok(listed("currencies", items))
}

/// POST /currencies
pub async fn create_currency(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateCurrencyRequest>,
) -> Created<Currency> {
    let item = state
        .reference_service
        .create_currency(req, &user.actor())
        .await?;
    Ok(created("currency", item))
}

/// GET /countries
pub async fn list_countries(State(state): State<AppState>) -> Listed<Country> {
    let items = state.reference_service.list_countries().await?;
    Ok(listed("countries", items))
}

/// POST /countries
pub async fn create_country(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateCountryRequest>,
) -> Created<Country> {
    let item = state
        .reference_service
        .create_country(req, &user.actor())
        .await?;
    Ok(created("country", item))
}

/// GET /districts
pub async fn list_districts(State(state): State<AppState>) -> Listed<District> {
    let items = state.reference_service.list_districts().await?;
    Ok(listed("districts", items))
}

/// POST /districts
pub async fn create_district(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateNamedRequest>,
) -> Created<District> {
    let item = state
        .reference_service
        .create_district(req, &user.actor())
        .await?;
    Ok(created("district", item))
}

/// GET /branches?district_id=
pub async fn list_branches(
    State(state): State<AppState>,
    Query(query): Query<BranchQuery>,
) -> Listed<Branch> {
    let filter = BranchFilter {
        district_id: query
            .district_id
            .as_deref()
            .map(parse_object_id)
            .transpose()?,
    };
    let items = state.reference_service.list_branches(filter).await?;
    Ok(listed("branches", items))
}

/// POST /branches
pub async fn create_branch(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateBranchRequest>,
) -> Created<Branch> {
    let item = state
        .reference_service
        .create_branch(req, &user.actor())
        .await?;
    Ok(created("branch", item))
}

/// GET /processes
pub async fn list_processes(State(state): State<AppState>) -> Listed<Process> {
    let items = state.reference_service.list_processes().await?;
    Ok(listed("processes", items))
}

/// POST /processes
pub async fn create_process(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateNamedRequest>,
) -> Created<Process> {
    let item = state
        .reference_service
        .create_process(req, &user.actor())
        .await?;
    Ok(created("process", item))
}

/// GET /subprocesses/:process_id
pub async fn list_subprocesses(
    State(state): State<AppState>,
    Path(process_id): Path<String>,
) -> Listed<Subprocess> {
    let process_id = parse_object_id(&process_id)?;
    let items = state.reference_service.list_subprocesses(process_id).await?;
    Ok(listed("subprocesses", items))
}

/// POST /subprocesses
pub async fn create_subprocess(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateSubprocessRequest>,
) -> Created<Subprocess> {
    let item = state
        .reference_service
        .create_subprocess(req, &user.actor())
        .await?;
    Ok(created("subprocess", item))
}

/// GET /departments/:subprocess_id
pub async fn list_departments(
    State(state): State<AppState>,
    Path(subprocess_id): Path<String>,
) -> Listed<Department> {
    let subprocess_id = parse_object_id(&subprocess_id)?;
    let items = state
        .reference_service
        .list_departments(subprocess_id)
        .await?;
    Ok(listed("departments", items))
}

/// POST /departments
pub async fn create_department(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateDepartmentRequest>,
) -> Created<Department> {
    let item = state
        .reference_service
        .create_department(req, &user.actor())
        .await?;
    Ok(created("department", item))
}

/// GET /travelpurpose
pub async fn list_travel_purposes(State(state): State<AppState>) -> Listed<TravelPurpose> {
    let items = state.reference_service.list_travel_purposes().await?;
    Ok(listed("travel purposes", items))
}

/// POST /travelpurpose
pub async fn create_travel_purpose(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateNamedRequest>,
) -> Created<TravelPurpose> {
    let item = state
        .reference_service
        .create_travel_purpose(req, &user.actor())
        .await?;
    Ok(created("travel purpose", item))
}

/// GET /customertypes
pub async fn list_customer_types(State(state): State<AppState>) -> Listed<CustomerType> {
    let items = state.reference_service.list_customer_types().await?;
    Ok(listed("customer types", items))
}

/// POST /customertypes
pub async fn create_customer_type(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateNamedRequest>,
) -> Created<CustomerType> {
    let item = state
        .reference_service
        .create_customer_type(req, &user.actor())
        .await?;
    Ok(created("customer type", item))
}
