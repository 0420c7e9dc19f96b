//! Identity documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{document, Audit};
use crate::store::ObjectId;

/// Login account. The password hash never leaves the service layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: ObjectId,
    pub username: String,
    pub password_hash: String,
    pub role_id: ObjectId,
    pub profile_id: ObjectId,
    #[serde(flatten)]
    pub audit: Audit,
}

document!(User, "users");

/// Personal and contact details of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department_id: Option<ObjectId>,
    #[serde(default)]
    pub branch_id: Option<ObjectId>,
    #[serde(flatten)]
    pub audit: Audit,
}

document!(Profile, "profiles");

/// A named permission group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

document!(Role, "roles");

/// A revoked token, refused until it would have expired anyway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBlacklist {
    pub id: ObjectId,
    pub token: String,
    pub user_id: ObjectId,
    #[serde(default)]
    pub client_ip: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(flatten)]
    pub audit: Audit,
}

document!(TokenBlacklist, "token_blacklist");
