//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use serde_json::Value;
use tempfile::TempDir;

use forex_request_backend::auth::{Actor, LoginRequest, RegisterRequest, UserResponse};
use forex_request_backend::config::Config;
use forex_request_backend::models::{
    AttachmentKind, Branch, Country, Currency, CustomerType, Department, TravelPurpose,
};
use forex_request_backend::notifications::RecordingMailer;
use forex_request_backend::reference::{
    CreateBranchRequest, CreateCountryRequest, CreateCurrencyRequest, CreateDepartmentRequest,
    CreateNamedRequest, CreateSubprocessRequest,
};
use forex_request_backend::requests::{AttachmentUpload, CreateRequestForm};
use forex_request_backend::state::AppState;
use forex_request_backend::store::{
    Collections, DocumentStore, MemoryDocumentStore, ObjectId, StoreError,
};

pub const PASSWORD: &str = "correct-horse-battery";
pub const JWT_SECRET: &str = "integration-test-secret";

pub fn test_config(upload_dir: &TempDir) -> Config {
    Config {
        jwt_secret: JWT_SECRET.to_string(),
        bcrypt_cost: 4,
        upload_dir: upload_dir.path().to_path_buf(),
        public_file_base_url: "http://localhost:3001/files".to_string(),
        usecase_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

/// Reference data every request needs
pub struct Seed {
    pub usd: Currency,
    pub eur: Currency,
    pub etb: Currency,
    pub country: Country,
    pub purpose: TravelPurpose,
    pub customer_type: CustomerType,
    pub branch: Branch,
    pub department: Department,
}

/// A registered user with a live token
pub struct TestUser {
    pub user: UserResponse,
    pub token: String,
}

impl TestUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user.id, self.user.role.clone())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub collections: Collections,
    pub mailer: RecordingMailer,
    pub upload_dir: TempDir,
    pub admin: TestUser,
    pub seed: Seed,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_store(Arc::new(MemoryDocumentStore::new())).await
    }

    pub async fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        let upload_dir = TempDir::new().unwrap();
        let mailer = RecordingMailer::new();
        let state = AppState::from_parts(
            test_config(&upload_dir),
            store.clone(),
            Arc::new(mailer.clone()),
        );
        state.auth_service.ensure_default_roles().await.unwrap();

        let collections = Collections::new(store);
        state
            .auth_service
            .ensure_admin("admin.user", PASSWORD)
            .await
            .unwrap();
        let admin = login(&state, "admin.user").await;
        let seed = seed_reference_data(&state, &admin.actor()).await;

        Self {
            state,
            collections,
            mailer,
            upload_dir,
            admin,
            seed,
        }
    }

    pub async fn user(&self, username: &str, role: &str) -> TestUser {
        register_user(
            &self.state,
            username,
            role,
            Some(&self.seed),
            Some(&self.admin.actor()),
        )
        .await
    }

    /// Files currently present in the upload directory
    pub fn stored_files(&self) -> Vec<String> {
        std::fs::read_dir(self.upload_dir.path())
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn form(&self) -> CreateRequestForm {
        create_form(&self.seed)
    }
}

/// Register through the service, then log in
pub async fn register_user(
    state: &AppState,
    username: &str,
    role: &str,
    seed: Option<&Seed>,
    registrar: Option<&Actor>,
) -> TestUser {
    state
        .auth_service
        .register(
            RegisterRequest {
                username: username.to_string(),
                password: PASSWORD.to_string(),
                role: role.to_string(),
                first_name: "Test".to_string(),
                middle_name: None,
                last_name: username.to_string(),
                email: Some(format!("{}@bank.example", username)),
                phone: None,
                department_id: seed.map(|s| s.department.id),
                branch_id: seed.map(|s| s.branch.id),
            },
            registrar,
        )
        .await
        .unwrap();

    login(state, username).await
}

pub async fn login(state: &AppState, username: &str) -> TestUser {
    let login = state
        .auth_service
        .login(LoginRequest {
            username: username.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();

    TestUser {
        user: login.user,
        token: login.token,
    }
}

async fn seed_reference_data(state: &AppState, admin: &Actor) -> Seed {
    let reference = &state.reference_service;

    let currency = |name: &str, code: &str| CreateCurrencyRequest {
        name: name.to_string(),
        code: code.to_string(),
        symbol: None,
    };
    let named = |name: &str| CreateNamedRequest {
        name: name.to_string(),
    };

    let usd = reference
        .create_currency(currency("US Dollar", "USD"), admin)
        .await
        .unwrap();
    let eur = reference
        .create_currency(currency("Euro", "EUR"), admin)
        .await
        .unwrap();
    let etb = reference
        .create_currency(currency("Ethiopian Birr", "ETB"), admin)
        .await
        .unwrap();
    let country = reference
        .create_country(
            CreateCountryRequest {
                name: "Kenya".to_string(),
                code: "KE".to_string(),
            },
            admin,
        )
        .await
        .unwrap();
    let purpose = reference
        .create_travel_purpose(named("Education"), admin)
        .await
        .unwrap();
    let customer_type = reference
        .create_customer_type(named("Individual"), admin)
        .await
        .unwrap();
    let district = reference
        .create_district(named("Addis Ababa"), admin)
        .await
        .unwrap();
    let branch = reference
        .create_branch(
            CreateBranchRequest {
                name: "Bole".to_string(),
                code: Some("BL01".to_string()),
                district_id: district.id,
            },
            admin,
        )
        .await
        .unwrap();
    let process = reference
        .create_process(named("Trade Services"), admin)
        .await
        .unwrap();
    let subprocess = reference
        .create_subprocess(
            CreateSubprocessRequest {
                name: "Foreign Exchange".to_string(),
                process_id: process.id,
            },
            admin,
        )
        .await
        .unwrap();
    let department = reference
        .create_department(
            CreateDepartmentRequest {
                name: "FX Desk".to_string(),
                subprocess_id: subprocess.id,
            },
            admin,
        )
        .await
        .unwrap();

    Seed {
        usd,
        eur,
        etb,
        country,
        purpose,
        customer_type,
        branch,
        department,
    }
}

pub fn create_form(seed: &Seed) -> CreateRequestForm {
    let mut form = CreateRequestForm::default();
    for (field, value) in [
        ("name", "Abebe Kebede".to_string()),
        ("accounts_to_deduct", "1000123,1000456".to_string()),
        ("average_deposit", "250000".to_string()),
        ("previous_fcy_generation", "1200".to_string()),
        ("current_fcy_generation", "900".to_string()),
        ("fcy_requested_amount", "5000".to_string()),
        ("travel_purpose_id", seed.purpose.id.to_hex()),
        ("travel_country_id", seed.country.id.to_hex()),
        ("fcy_requested_id", seed.usd.id.to_hex()),
        ("account_currency_id", seed.etb.id.to_hex()),
        ("customer_type_id", seed.customer_type.id.to_hex()),
    ] {
        form.set_field(field, value).unwrap();
    }
    form
}

pub fn upload(kind: AttachmentKind, file_name: &str) -> AttachmentUpload {
    AttachmentUpload {
        kind,
        file_name: file_name.to_string(),
        content_type: "application/pdf".to_string(),
        bytes: Bytes::from(format!("%PDF-1.4 {}", file_name)),
    }
}

pub fn mandatory_uploads() -> Vec<AttachmentUpload> {
    vec![
        upload(AttachmentKind::Passport, "passport scan.pdf"),
        upload(AttachmentKind::Ticket, "ticket.pdf"),
    ]
}

/// Memory store whose reads or inserts on one collection fail on demand
pub struct FailingStore {
    inner: MemoryDocumentStore,
    collection: &'static str,
    pub fail_reads: AtomicBool,
    pub fail_inserts: AtomicBool,
}

impl FailingStore {
    pub fn new(collection: &'static str) -> Self {
        Self {
            inner: MemoryDocumentStore::new(),
            collection,
            fail_reads: AtomicBool::new(false),
            fail_inserts: AtomicBool::new(false),
        }
    }

    fn check(&self, flag: &AtomicBool, collection: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) && collection == self.collection {
            Err(StoreError::Backend("connection reset".to_string()))
        } else {
            Ok(())
        }
    }

    /// Raw lookup that ignores the soft-delete flag
    pub async fn raw(&self, collection: &str, id: ObjectId) -> Option<Value> {
        self.inner.raw(collection, id).await
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn insert(&self, collection: &str, id: ObjectId, document: Value) -> Result<(), StoreError> {
        self.check(&self.fail_inserts, collection)?;
        self.inner.insert(collection, id, document).await
    }

    async fn find_by_id(&self, collection: &str, id: ObjectId) -> Result<Option<Value>, StoreError> {
        self.check(&self.fail_reads, collection)?;
        self.inner.find_by_id(collection, id).await
    }

    async fn find_many(&self, collection: &str, ids: &[ObjectId]) -> Result<Vec<Value>, StoreError> {
        self.check(&self.fail_reads, collection)?;
        self.inner.find_many(collection, ids).await
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        self.check(&self.fail_reads, collection)?;
        self.inner.find_all(collection).await
    }

    async fn find_all_by(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        self.check(&self.fail_reads, collection)?;
        self.inner.find_all_by(collection, field, value).await
    }

    async fn replace(&self, collection: &str, id: ObjectId, document: Value) -> Result<bool, StoreError> {
        self.inner.replace(collection, id, document).await
    }

    async fn remove(&self, collection: &str, id: ObjectId) -> Result<bool, StoreError> {
        self.inner.remove(collection, id).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}
