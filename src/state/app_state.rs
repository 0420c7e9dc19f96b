//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{AuthService, LocalAuthenticator};
use crate::config::Config;
use crate::files::FileStore;
use crate::notifications::{Mailer, Notifier};
use crate::reference::ReferenceService;
use crate::requests::RequestService;
use crate::store::{Collections, DocumentStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn DocumentStore>,
    pub auth_service: Arc<AuthService>,
    pub reference_service: Arc<ReferenceService>,
    pub request_service: Arc<RequestService>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn DocumentStore>,
        auth_service: Arc<AuthService>,
        reference_service: Arc<ReferenceService>,
        request_service: Arc<RequestService>,
    ) -> Self {
        Self {
            config,
            store,
            auth_service,
            reference_service,
            request_service,
        }
    }

    /// Wire every service on top of one document store
    pub fn from_parts(
        config: Config,
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let collections = Collections::new(store.clone());

        let authenticator = Arc::new(LocalAuthenticator::new(collections.users.clone()));
        let auth_service = AuthService::new(
            collections.clone(),
            authenticator,
            config.jwt_secret.clone(),
            config.jwt_ttl_seconds,
            config.bcrypt_cost,
            config.usecase_timeout,
        );

        let reference_service =
            ReferenceService::new(collections.clone(), config.usecase_timeout);

        let files = FileStore::new(
            config.upload_dir.clone(),
            config.public_file_base_url.clone(),
            collections.files.clone(),
        );
        let notifier = Notifier::new(mailer, collections.clone(), config.mail_from.clone());
        let request_service =
            RequestService::new(collections, files, notifier, config.usecase_timeout);

        Self::new(
            Arc::new(config),
            store,
            Arc::new(auth_service),
            Arc::new(reference_service),
            Arc::new(request_service),
        )
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<ReferenceService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.reference_service.clone()
    }
}

impl FromRef<AppState> for Arc<RequestService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.request_service.clone()
    }
}
