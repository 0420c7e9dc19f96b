//! Identity tests: registration, credentials, revocation, profiles and roles

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::{Duration, Utc};

use common::{register_user, FailingStore, TestApp, PASSWORD};
use forex_request_backend::auth::{
    AuthError, CreateRoleRequest, LoginRequest, RegisterRequest, UpdateProfileRequest,
};
use forex_request_backend::models::{Audit, TokenBlacklist};
use forex_request_backend::store::ObjectId;

fn registration(username: &str, role: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        password: PASSWORD.to_string(),
        role: role.to_string(),
        first_name: "Selam".to_string(),
        middle_name: None,
        last_name: "Haile".to_string(),
        email: None,
        phone: None,
        department_id: None,
        branch_id: None,
    }
}

#[tokio::test]
async fn test_superadmin_cannot_be_registered() {
    let app = TestApp::new().await;

    let err = app
        .state
        .auth_service
        .register(registration("root", "SuperAdmin"), Some(&app.admin.actor()))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::ReservedRole(_)));
}

#[tokio::test]
async fn test_unknown_role_is_rejected() {
    let app = TestApp::new().await;

    let err = app
        .state
        .auth_service
        .register(registration("selam", "auditor"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::RoleNotFound(role) if role == "auditor"));
}

#[tokio::test]
async fn test_self_registration_is_requester_only() {
    let app = TestApp::new().await;
    let service = &app.state.auth_service;

    let user = service
        .register(registration("selam", "Requester"), None)
        .await
        .unwrap();
    assert_eq!(user.role, "requester");

    for role in ["admin", "Validator", "approver"] {
        let err = service
            .register(registration("dawit", role), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(_)), "{role}");
    }

    let requester = app.user("meron", "requester").await;
    let err = service
        .register(registration("dawit", "approver"), Some(&requester.actor()))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden(_)));

    let approver = service
        .register(registration("dawit", "approver"), Some(&app.admin.actor()))
        .await
        .unwrap();
    assert_eq!(approver.role, "approver");
    assert_eq!(approver.profile.audit.created_by, Some(app.admin.user.id));
}

#[tokio::test]
async fn test_bootstrap_admin_is_created_once() {
    let app = TestApp::new().await;
    let service = &app.state.auth_service;

    service.ensure_admin("admin.user", "another-password").await.unwrap();
    let admins = app
        .collections
        .users
        .find_all_by("username", "admin.user")
        .await
        .unwrap();
    assert_eq!(admins.len(), 1);

    // the original password still works
    let login = service
        .login(LoginRequest {
            username: "admin.user".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(login.user.role, "admin");
}

#[tokio::test]
async fn test_failed_user_insert_discards_profile() {
    let store = Arc::new(FailingStore::new("users"));
    let app = TestApp::with_store(store.clone()).await;

    store.fail_inserts.store(true, Ordering::SeqCst);
    let err = app
        .state
        .auth_service
        .register(registration("selam", "requester"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Store(_)));

    let profiles = app
        .collections
        .profiles
        .find_all_by("last_name", "Haile")
        .await
        .unwrap();
    assert!(profiles.is_empty());
}

#[tokio::test]
async fn test_duplicate_username() {
    let app = TestApp::new().await;
    app.user("selam", "requester").await;

    let err = app
        .state
        .auth_service
        .register(registration("selam", "requester"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::UsernameTaken(name) if name == "selam"));
}

#[tokio::test]
async fn test_registration_checks_org_references() {
    let app = TestApp::new().await;

    let mut input = registration("selam", "requester");
    input.branch_id = Some(ObjectId::new());
    let err = app
        .state
        .auth_service
        .register(input, None)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::ReferenceNotFound { field: "branch_id", .. }));
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_alike() {
    let app = TestApp::new().await;
    let service = &app.state.auth_service;

    let wrong_password = service
        .login(LoginRequest {
            username: "admin.user".to_string(),
            password: "guess".to_string(),
        })
        .await
        .unwrap_err();
    let unknown_user = service
        .login(LoginRequest {
            username: "nobody".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_token_round_trip_and_revocation() {
    let app = TestApp::new().await;
    let service = &app.state.auth_service;
    let user = app.user("selam", "requester").await;

    let claims = service.validate_token(&user.token).await.unwrap();
    assert_eq!(claims.user_id().unwrap(), user.user.id);
    assert_eq!(claims.role, "requester");

    service
        .logout(&user.token, &claims, Some("10.0.0.7".to_string()))
        .await
        .unwrap();

    let err = service.validate_token(&user.token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenRevoked));

    let entries = app
        .collections
        .token_blacklist
        .find_all_by("user_id", user.user.id)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].client_ip.as_deref(), Some("10.0.0.7"));
}

#[tokio::test]
async fn test_logout_purges_expired_blacklist_entries() {
    let app = TestApp::new().await;
    let blacklist = &app.collections.token_blacklist;
    let user = app.user("selam", "requester").await;

    let stale = TokenBlacklist {
        id: ObjectId::new(),
        token: "expired.token.value".to_string(),
        user_id: user.user.id,
        client_ip: None,
        expires_at: Utc::now() - Duration::hours(1),
        audit: Audit::new(Some(user.user.id)),
    };
    blacklist.create(&stale).await.unwrap();

    let claims = app.state.auth_service.validate_token(&user.token).await.unwrap();
    app.state
        .auth_service
        .logout(&user.token, &claims, None)
        .await
        .unwrap();

    let remaining = blacklist.find_all().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].token, user.token);
    assert_eq!(app.state.auth_service.purge_expired_tokens().await.unwrap(), 0);
}

#[tokio::test]
async fn test_profile_update_is_owner_or_admin() {
    let app = TestApp::new().await;
    let service = &app.state.auth_service;
    let owner = app.user("selam", "requester").await;
    let other = app.user("dawit", "requester").await;
    let profile_id = owner.user.profile.id;

    let update = UpdateProfileRequest {
        phone: Some("+251911000000".to_string()),
        ..Default::default()
    };

    let err = service
        .update_profile(profile_id, update.clone(), &other.actor())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden(_)));

    let updated = service
        .update_profile(profile_id, update, &owner.actor())
        .await
        .unwrap();
    assert_eq!(updated.phone.as_deref(), Some("+251911000000"));
    assert_eq!(updated.first_name, "Test");

    let renamed = service
        .update_profile(
            profile_id,
            UpdateProfileRequest {
                first_name: Some("Selamawit".to_string()),
                ..Default::default()
            },
            &app.admin.actor(),
        )
        .await
        .unwrap();
    assert_eq!(renamed.first_name, "Selamawit");
    assert_eq!(renamed.phone.as_deref(), Some("+251911000000"));
}

#[tokio::test]
async fn test_role_management() {
    let app = TestApp::new().await;
    let service = &app.state.auth_service;
    let requester = app.user("selam", "requester").await;

    let input = |name: &str| CreateRoleRequest {
        name: name.to_string(),
        description: Some("Branch auditors".to_string()),
    };

    let err = service
        .create_role(input("auditor"), &requester.actor())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden(_)));

    let role = service
        .create_role(input(" Auditor "), &app.admin.actor())
        .await
        .unwrap();
    assert_eq!(role.name, "auditor");

    let err = service
        .create_role(input("auditor"), &app.admin.actor())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::RoleExists(_)));

    let err = service
        .create_role(input("superadmin"), &app.admin.actor())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ReservedRole(_)));

    // the new role is immediately assignable
    let auditor = register_user(
        &app.state,
        "meron",
        "auditor",
        None,
        Some(&app.admin.actor()),
    )
    .await;
    assert_eq!(auditor.user.role, "auditor");
    assert_eq!(service.list_roles().await.unwrap().len(), 6);
}
