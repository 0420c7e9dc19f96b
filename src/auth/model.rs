use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::Profile;
use crate::store::ObjectId;

/// Registration payload: credentials, role name and profile fields
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "username must be 3-50 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 128, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "role is required"))]
    pub role: String,
    #[validate(length(min = 1, max = 100, message = "first_name is required"))]
    pub first_name: String,
    pub middle_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "last_name is required"))]
    pub last_name: String,
    #[validate(email(message = "email is not a valid address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department_id: Option<ObjectId>,
    pub branch_id: Option<ObjectId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

/// A user as returned to clients, without the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: ObjectId,
    pub username: String,
    pub role: String,
    pub profile: Profile,
}

/// Partial profile update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(email(message = "email is not a valid address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department_id: Option<ObjectId>,
    pub branch_id: Option<ObjectId>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 2, max = 50, message = "role name must be 2-50 characters"))]
    pub name: String,
    pub description: Option<String>,
}

/// The caller of an operation, as established by token validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: ObjectId,
    pub role: String,
}

impl Actor {
    pub fn new(user_id: ObjectId, role: impl Into<String>) -> Self {
        Self {
            user_id,
            role: role.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register() -> RegisterRequest {
        RegisterRequest {
            username: "abebe".to_string(),
            password: "s3cret-pass".to_string(),
            role: "requester".to_string(),
            first_name: "Abebe".to_string(),
            middle_name: None,
            last_name: "Kebede".to_string(),
            email: Some("abebe@bank.example".to_string()),
            phone: None,
            department_id: None,
            branch_id: None,
        }
    }

    #[test]
    fn test_register_validation() {
        assert!(register().validate().is_ok());

        let short_password = RegisterRequest {
            password: "short".to_string(),
            ..register()
        };
        let err = short_password.validate().unwrap_err();
        assert!(err.field_errors().contains_key("password"));

        let bad_email = RegisterRequest {
            email: Some("not-an-email".to_string()),
            ..register()
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_register_rejects_malformed_reference_ids() {
        let body = serde_json::json!({
            "username": "abebe",
            "password": "s3cret-pass",
            "role": "requester",
            "first_name": "Abebe",
            "last_name": "Kebede",
            "branch_id": "not-hex"
        });

        let err = serde_json::from_value::<RegisterRequest>(body).unwrap_err();
        assert!(err.to_string().contains("not-hex"));
    }
}
