//! Authentication service
//!
//! Registration, credential checks, token issuance and revocation, profiles and roles.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use validator::Validate;

use super::jwt::{generate_token, verify_token, Claims, JwtError};
use super::model::{
    Actor, CreateRoleRequest, LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest,
    UserResponse,
};
use super::password::{hash_password, verify_password, PasswordError};
use super::policy::Permission;
use super::roles;
use crate::deadline::{with_deadline, DeadlineExceeded};
use crate::models::{Audit, Profile, Role, TokenBlacklist, User};
use crate::store::{Collections, ObjectId, Repository, StoreError};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Role '{0}' does not exist")]
    RoleNotFound(String),

    #[error("Role '{0}' is reserved")]
    ReservedRole(String),

    #[error("Role '{0}' already exists")]
    RoleExists(String),

    #[error("{field} '{id}' does not exist")]
    ReferenceNotFound { field: &'static str, id: ObjectId },

    #[error("User not found")]
    UserNotFound,

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(err: validator::ValidationErrors) -> Self {
        AuthError::Validation(err.to_string())
    }
}

/// Credential check seam. The local bcrypt authenticator is the default; an
/// external directory can be plugged in by implementing this trait.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns the matching user when the credentials are valid
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError>;
}

/// Verifies passwords against the bcrypt hashes stored on users
pub struct LocalAuthenticator {
    users: Repository<User>,
}

impl LocalAuthenticator {
    pub fn new(users: Repository<User>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Authenticator for LocalAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .users
            .find_one_by("username", username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    collections: Collections,
    authenticator: Arc<dyn Authenticator>,
    jwt_secret: String,
    jwt_ttl_seconds: i64,
    bcrypt_cost: u32,
    timeout: Duration,
}

impl AuthService {
    pub fn new(
        collections: Collections,
        authenticator: Arc<dyn Authenticator>,
        jwt_secret: String,
        jwt_ttl_seconds: i64,
        bcrypt_cost: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            collections,
            authenticator,
            jwt_secret,
            jwt_ttl_seconds,
            bcrypt_cost,
            timeout,
        }
    }

    /// Create the built-in roles that do not exist yet
    pub async fn ensure_default_roles(&self) -> Result<(), AuthError> {
        for name in roles::DEFAULT_ROLES {
            if self.find_role_by_name(name).await?.is_none() {
                let role = Role {
                    id: ObjectId::new(),
                    name: name.to_string(),
                    description: None,
                    audit: Audit::new(None),
                };
                self.collections.roles.create(&role).await?;
                tracing::info!(role = %name, "Created default role");
            }
        }
        Ok(())
    }

    /// Self-service registration yields a `requester`. Any other role needs a
    /// `registrar` allowed to manage roles.
    pub async fn register(
        &self,
        input: RegisterRequest,
        registrar: Option<&Actor>,
    ) -> Result<UserResponse, AuthError> {
        with_deadline(self.timeout, async {
            input.validate()?;

            let role_name = input.role.trim().to_lowercase();
            if role_name == roles::SUPERADMIN {
                return Err(AuthError::ReservedRole(role_name));
            }
            let role = self
                .find_role_by_name(&role_name)
                .await?
                .ok_or_else(|| AuthError::RoleNotFound(role_name.clone()))?;

            let may_assign =
                registrar.is_some_and(|actor| Permission::ManageRoles.allows(&actor.role));
            if role.name != roles::REQUESTER && !may_assign {
                return Err(AuthError::Forbidden(format!(
                    "Only administrators may assign the '{}' role",
                    role.name
                )));
            }

            self.create_user(input, role, registrar.map(|actor| actor.user_id))
                .await
        })
        .await
    }

    /// Create the `admin` account named by the bootstrap credentials unless
    /// that username is already registered.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if self
            .collections
            .users
            .find_one_by("username", username)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let role = self
            .find_role_by_name(roles::ADMIN)
            .await?
            .ok_or_else(|| AuthError::RoleNotFound(roles::ADMIN.to_string()))?;
        let input = RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
            role: role.name.clone(),
            first_name: "System".to_string(),
            middle_name: None,
            last_name: "Administrator".to_string(),
            email: None,
            phone: None,
            department_id: None,
            branch_id: None,
        };
        input.validate()?;

        let admin = self.create_user(input, role, None).await?;
        tracing::info!(
            user_id = %admin.id,
            username = %admin.username,
            "Bootstrap administrator created"
        );
        Ok(())
    }

    async fn create_user(
        &self,
        input: RegisterRequest,
        role: Role,
        created_by: Option<ObjectId>,
    ) -> Result<UserResponse, AuthError> {
        let username = input.username.trim().to_string();
        if self
            .collections
            .users
            .find_one_by("username", &username)
            .await?
            .is_some()
        {
            return Err(AuthError::UsernameTaken(username));
        }

        self.check_org_refs(input.department_id, input.branch_id)
            .await?;

        let password_hash = hash_password(&input.password, self.bcrypt_cost)?;

        let user_id = ObjectId::new();
        let profile = Profile {
            id: ObjectId::new(),
            user_id,
            first_name: input.first_name,
            middle_name: input.middle_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone,
            department_id: input.department_id,
            branch_id: input.branch_id,
            audit: Audit::new(Some(created_by.unwrap_or(user_id))),
        };
        let user = User {
            id: user_id,
            username,
            password_hash,
            role_id: role.id,
            profile_id: profile.id,
            audit: Audit::new(Some(created_by.unwrap_or(user_id))),
        };

        self.collections.profiles.create(&profile).await?;
        if let Err(err) = self.collections.users.create(&user).await {
            if let Err(cleanup) = self.collections.profiles.delete(profile.id, created_by).await {
                tracing::warn!(
                    profile_id = %profile.id,
                    error = %cleanup,
                    "Failed to discard profile of unregistered user"
                );
            }
            return Err(match err {
                StoreError::Duplicate { .. } => AuthError::UsernameTaken(user.username.clone()),
                other => AuthError::Store(other),
            });
        }

        tracing::info!(user_id = %user.id, username = %user.username, role = %role.name, "User registered");

        Ok(UserResponse {
            id: user.id,
            username: user.username,
            role: role.name,
            profile,
        })
    }

    pub async fn login(&self, input: LoginRequest) -> Result<LoginResponse, AuthError> {
        with_deadline(self.timeout, async {
            let user = self
                .authenticator
                .authenticate(input.username.trim(), &input.password)
                .await?;

            let response = self.user_response(user).await?;
            let token = generate_token(
                response.id,
                &response.username,
                &response.role,
                &self.jwt_secret,
                self.jwt_ttl_seconds,
            )?;

            tracing::info!(user_id = %response.id, "User logged in");

            Ok(LoginResponse {
                token,
                token_type: "Bearer".to_string(),
                expires_in: self.jwt_ttl_seconds,
                user: response,
            })
        })
        .await
    }

    /// Revoke `token` until its natural expiry
    pub async fn logout(
        &self,
        token: &str,
        claims: &Claims,
        client_ip: Option<String>,
    ) -> Result<(), AuthError> {
        with_deadline(self.timeout, async {
            let user_id = claims.user_id()?;
            let entry = TokenBlacklist {
                id: ObjectId::new(),
                token: token.to_string(),
                user_id,
                client_ip,
                expires_at: claims.expires_at(),
                audit: Audit::new(Some(user_id)),
            };
            self.collections.token_blacklist.create(&entry).await?;

            tracing::info!(user_id = %user_id, "User logged out");
            Ok::<_, AuthError>(())
        })
        .await?;

        if let Err(err) = self.purge_expired_tokens().await {
            tracing::warn!(error = %err, "Failed to purge expired blacklist entries");
        }
        Ok(())
    }

    /// Remove blacklist entries whose token has expired anyway
    pub async fn purge_expired_tokens(&self) -> Result<usize, AuthError> {
        with_deadline(self.timeout, async {
            let now = Utc::now();
            let mut purged = 0;
            let blacklist = &self.collections.token_blacklist;
            for entry in blacklist.find_all().await? {
                if entry.expires_at <= now && blacklist.purge(entry.id).await? {
                    purged += 1;
                }
            }
            if purged > 0 {
                tracing::debug!(purged, "Purged expired blacklist entries");
            }
            Ok(purged)
        })
        .await
    }

    /// Signature, expiry and blacklist check
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = verify_token(token, &self.jwt_secret)?;

        with_deadline(self.timeout, async {
            let now = Utc::now();
            let revoked = self
                .collections
                .token_blacklist
                .find_all_by("token", token)
                .await?
                .into_iter()
                .any(|entry| entry.expires_at > now);
            if revoked {
                return Err(AuthError::TokenRevoked);
            }
            Ok(())
        })
        .await?;

        Ok(claims)
    }

    pub async fn find_by_id(&self, user_id: ObjectId) -> Result<UserResponse, AuthError> {
        with_deadline(self.timeout, async {
            let user = self
                .collections
                .users
                .find_by_id(user_id)
                .await?
                .ok_or(AuthError::UserNotFound)?;
            self.user_response(user).await
        })
        .await
    }

    pub async fn find_by_username(&self, username: &str) -> Result<UserResponse, AuthError> {
        with_deadline(self.timeout, async {
            let user = self
                .collections
                .users
                .find_one_by("username", username)
                .await?
                .ok_or(AuthError::UserNotFound)?;
            self.user_response(user).await
        })
        .await
    }

    pub async fn get_profile(&self, id: ObjectId) -> Result<Profile, AuthError> {
        with_deadline(self.timeout, async {
            self.collections
                .profiles
                .find_by_id(id)
                .await?
                .ok_or(AuthError::ProfileNotFound)
        })
        .await
    }

    /// Only the profile owner or an administrator may update a profile
    pub async fn update_profile(
        &self,
        id: ObjectId,
        input: UpdateProfileRequest,
        actor: &Actor,
    ) -> Result<Profile, AuthError> {
        with_deadline(self.timeout, async {
            input.validate()?;

            let mut profile = self
                .collections
                .profiles
                .find_by_id(id)
                .await?
                .ok_or(AuthError::ProfileNotFound)?;

            if profile.user_id != actor.user_id && !Permission::ManageProfiles.allows(&actor.role)
            {
                return Err(AuthError::Forbidden(
                    "You may only update your own profile".to_string(),
                ));
            }

            self.check_org_refs(input.department_id, input.branch_id)
                .await?;

            if let Some(first_name) = input.first_name {
                profile.first_name = first_name;
            }
            if let Some(last_name) = input.last_name {
                profile.last_name = last_name;
            }
            if input.middle_name.is_some() {
                profile.middle_name = input.middle_name;
            }
            if input.email.is_some() {
                profile.email = input.email;
            }
            if input.phone.is_some() {
                profile.phone = input.phone;
            }
            if input.department_id.is_some() {
                profile.department_id = input.department_id;
            }
            if input.branch_id.is_some() {
                profile.branch_id = input.branch_id;
            }
            profile.audit.touch(Some(actor.user_id));

            self.collections.profiles.update(&profile).await?;
            Ok(profile)
        })
        .await
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, AuthError> {
        with_deadline(self.timeout, async {
            Ok(self.collections.roles.find_all().await?)
        })
        .await
    }

    pub async fn create_role(
        &self,
        input: CreateRoleRequest,
        actor: &Actor,
    ) -> Result<Role, AuthError> {
        with_deadline(self.timeout, async {
            if !Permission::ManageRoles.allows(&actor.role) {
                return Err(AuthError::Forbidden(
                    "Only administrators may create roles".to_string(),
                ));
            }
            input.validate()?;

            let name = input.name.trim().to_lowercase();
            if name == roles::SUPERADMIN {
                return Err(AuthError::ReservedRole(name));
            }
            if self.find_role_by_name(&name).await?.is_some() {
                return Err(AuthError::RoleExists(name));
            }

            let role = Role {
                id: ObjectId::new(),
                name,
                description: input.description,
                audit: Audit::new(Some(actor.user_id)),
            };
            self.collections.roles.create(&role).await?;

            tracing::info!(role = %role.name, created_by = %actor.user_id, "Role created");
            Ok(role)
        })
        .await
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AuthError> {
        Ok(self.collections.roles.find_one_by("name", name).await?)
    }

    async fn user_response(&self, user: User) -> Result<UserResponse, AuthError> {
        let role = self
            .collections
            .roles
            .find_by_id(user.role_id)
            .await?
            .ok_or_else(|| AuthError::RoleNotFound(user.role_id.to_hex()))?;
        let profile = self
            .collections
            .profiles
            .find_by_id(user.profile_id)
            .await?
            .ok_or(AuthError::ProfileNotFound)?;

        Ok(UserResponse {
            id: user.id,
            username: user.username,
            role: role.name,
            profile,
        })
    }

    async fn check_org_refs(
        &self,
        department_id: Option<ObjectId>,
        branch_id: Option<ObjectId>,
    ) -> Result<(), AuthError> {
        if let Some(id) = department_id {
            if !self.collections.departments.exists(id).await? {
                return Err(AuthError::ReferenceNotFound {
                    field: "department_id",
                    id,
                });
            }
        }
        if let Some(id) = branch_id {
            if !self.collections.branches.exists(id).await? {
                return Err(AuthError::ReferenceNotFound {
                    field: "branch_id",
                    id,
                });
            }
        }
        Ok(())
    }

    /// Get JWT secret (for middleware access)
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }
}
