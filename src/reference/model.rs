use serde::Deserialize;
use validator::Validate;

use crate::store::ObjectId;

pub use crate::models::{
    Branch, Country, Currency, CustomerType, Department, District, Process, Subprocess,
    TravelPurpose,
};

/// Payload for lookup entries that only carry a name (districts, processes,
/// travel purposes, customer types)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateNamedRequest {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCurrencyRequest {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    #[validate(length(equal = 3, message = "code must be a 3-letter ISO code"))]
    pub code: String,
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCountryRequest {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 2, max = 3, message = "code must be 2 or 3 letters"))]
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBranchRequest {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    pub code: Option<String>,
    pub district_id: ObjectId,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSubprocessRequest {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    pub process_id: ObjectId,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDepartmentRequest {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    pub subprocess_id: ObjectId,
}

/// `GET /branches?district_id=...`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchFilter {
    pub district_id: Option<ObjectId>,
}
