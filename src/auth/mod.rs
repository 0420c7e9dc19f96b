//! Identity and access
//!
//! - bcrypt password hashing behind an [`Authenticator`] seam
//! - HS256 JWT issuance and validation, with logout blacklisting
//! - Role policy for workflow and administration operations

mod jwt;
mod model;
mod password;
mod policy;
mod service;

pub use jwt::{generate_token, verify_token, Claims, JwtError};
pub use model::*;
pub use password::{hash_password, verify_password, PasswordError};
pub use policy::{is_admin, Permission};
pub use service::{AuthError, AuthService, Authenticator, LocalAuthenticator};

/// Well-known role names
pub mod roles {
    /// Reserved: never creatable or assignable through the API
    pub const SUPERADMIN: &str = "superadmin";
    pub const ADMIN: &str = "admin";
    pub const VALIDATOR: &str = "validator";
    pub const APPROVER: &str = "approver";
    pub const REQUESTER: &str = "requester";

    /// Roles created at start-up when missing
    pub const DEFAULT_ROLES: [&str; 5] = [SUPERADMIN, ADMIN, VALIDATOR, APPROVER, REQUESTER];
}
