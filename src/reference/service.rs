use std::time::Duration;

use thiserror::Error;
use validator::Validate;

use super::model::*;
use crate::auth::{Actor, Permission};
use crate::deadline::{with_deadline, DeadlineExceeded};
use crate::models::Audit;
use crate::store::{Collections, Document, ObjectId, Repository, StoreError};

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("{0}")]
    Validation(String),

    #[error("{field} '{id}' does not exist")]
    ParentNotFound { field: &'static str, id: ObjectId },

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),
}

impl From<validator::ValidationErrors> for ReferenceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ReferenceError::Validation(err.to_string())
    }
}

/// Lookup tables: plain list and create, parents checked on create
#[derive(Clone)]
pub struct ReferenceService {
    collections: Collections,
    timeout: Duration,
}

impl ReferenceService {
    pub fn new(collections: Collections, timeout: Duration) -> Self {
        Self {
            collections,
            timeout,
        }
    }

    pub async fn list_currencies(&self) -> Result<Vec<Currency>, ReferenceError> {
        self.list(&self.collections.currencies).await
    }

    pub async fn create_currency(
        &self,
        input: CreateCurrencyRequest,
        actor: &Actor,
    ) -> Result<Currency, ReferenceError> {
        authorize(actor)?;
        input.validate()?;

        let currency = Currency {
            id: ObjectId::new(),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_uppercase(),
            symbol: input.symbol,
            audit: Audit::new(Some(actor.user_id)),
        };
        self.insert(&self.collections.currencies, currency).await
    }

    pub async fn list_countries(&self) -> Result<Vec<Country>, ReferenceError> {
        self.list(&self.collections.countries).await
    }

    pub async fn create_country(
        &self,
        input: CreateCountryRequest,
        actor: &Actor,
    ) -> Result<Country, ReferenceError> {
        authorize(actor)?;
        input.validate()?;

        let country = Country {
            id: ObjectId::new(),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_uppercase(),
            audit: Audit::new(Some(actor.user_id)),
        };
        self.insert(&self.collections.countries, country).await
    }

    pub async fn list_districts(&self) -> Result<Vec<District>, ReferenceError> {
        self.list(&self.collections.districts).await
    }

    pub async fn create_district(
        &self,
        input: CreateNamedRequest,
        actor: &Actor,
    ) -> Result<District, ReferenceError> {
        authorize(actor)?;
        input.validate()?;

        let district = District {
            id: ObjectId::new(),
            name: input.name.trim().to_string(),
            audit: Audit::new(Some(actor.user_id)),
        };
        self.insert(&self.collections.districts, district).await
    }

    /// All branches, or only those of one district
    pub async fn list_branches(&self, filter: BranchFilter) -> Result<Vec<Branch>, ReferenceError> {
        match filter.district_id {
            Some(district_id) => {
                self.list_by(&self.collections.branches, "district_id", district_id)
                    .await
            }
            None => self.list(&self.collections.branches).await,
        }
    }

    pub async fn create_branch(
        &self,
        input: CreateBranchRequest,
        actor: &Actor,
    ) -> Result<Branch, ReferenceError> {
        authorize(actor)?;
        input.validate()?;
        self.require_parent(&self.collections.districts, "district_id", input.district_id)
            .await?;

        let branch = Branch {
            id: ObjectId::new(),
            name: input.name.trim().to_string(),
            code: input.code,
            district_id: input.district_id,
            audit: Audit::new(Some(actor.user_id)),
        };
        self.insert(&self.collections.branches, branch).await
    }

    pub async fn list_processes(&self) -> Result<Vec<Process>, ReferenceError> {
        self.list(&self.collections.processes).await
    }

    pub async fn create_process(
        &self,
        input: CreateNamedRequest,
        actor: &Actor,
    ) -> Result<Process, ReferenceError> {
        authorize(actor)?;
        input.validate()?;

        let process = Process {
            id: ObjectId::new(),
            name: input.name.trim().to_string(),
            audit: Audit::new(Some(actor.user_id)),
        };
        self.insert(&self.collections.processes, process).await
    }

    pub async fn list_subprocesses(
        &self,
        process_id: ObjectId,
    ) -> Result<Vec<Subprocess>, ReferenceError> {
        self.list_by(&self.collections.subprocesses, "process_id", process_id)
            .await
    }

    pub async fn create_subprocess(
        &self,
        input: CreateSubprocessRequest,
        actor: &Actor,
    ) -> Result<Subprocess, ReferenceError> {
        authorize(actor)?;
        input.validate()?;
        self.require_parent(&self.collections.processes, "process_id", input.process_id)
            .await?;

        let subprocess = Subprocess {
            id: ObjectId::new(),
            name: input.name.trim().to_string(),
            process_id: input.process_id,
            audit: Audit::new(Some(actor.user_id)),
        };
        self.insert(&self.collections.subprocesses, subprocess).await
    }

    pub async fn list_departments(
        &self,
        subprocess_id: ObjectId,
    ) -> Result<Vec<Department>, ReferenceError> {
        self.list_by(&self.collections.departments, "subprocess_id", subprocess_id)
            .await
    }

    pub async fn create_department(
        &self,
        input: CreateDepartmentRequest,
        actor: &Actor,
    ) -> Result<Department, ReferenceError> {
        authorize(actor)?;
        input.validate()?;
        self.require_parent(
            &self.collections.subprocesses,
            "subprocess_id",
            input.subprocess_id,
        )
        .await?;

        let department = Department {
            id: ObjectId::new(),
            name: input.name.trim().to_string(),
            subprocess_id: input.subprocess_id,
            audit: Audit::new(Some(actor.user_id)),
        };
        self.insert(&self.collections.departments, department).await
    }

    pub async fn list_travel_purposes(&self) -> Result<Vec<TravelPurpose>, ReferenceError> {
        self.list(&self.collections.travel_purposes).await
    }

    pub async fn create_travel_purpose(
        &self,
        input: CreateNamedRequest,
        actor: &Actor,
    ) -> Result<TravelPurpose, ReferenceError> {
        authorize(actor)?;
        input.validate()?;

        let purpose = TravelPurpose {
            id: ObjectId::new(),
            name: input.name.trim().to_string(),
            audit: Audit::new(Some(actor.user_id)),
        };
        self.insert(&self.collections.travel_purposes, purpose).await
    }

    pub async fn list_customer_types(&self) -> Result<Vec<CustomerType>, ReferenceError> {
        self.list(&self.collections.customer_types).await
    }

    pub async fn create_customer_type(
        &self,
        input: CreateNamedRequest,
        actor: &Actor,
    ) -> Result<CustomerType, ReferenceError> {
        authorize(actor)?;
        input.validate()?;

        let customer_type = CustomerType {
            id: ObjectId::new(),
            name: input.name.trim().to_string(),
            audit: Audit::new(Some(actor.user_id)),
        };
        self.insert(&self.collections.customer_types, customer_type)
            .await
    }

    async fn list<T: Document>(&self, repo: &Repository<T>) -> Result<Vec<T>, ReferenceError> {
        with_deadline(self.timeout, async { Ok(repo.find_all().await?) }).await
    }

    async fn list_by<T: Document>(
        &self,
        repo: &Repository<T>,
        field: &str,
        parent: ObjectId,
    ) -> Result<Vec<T>, ReferenceError> {
        with_deadline(self.timeout, async {
            Ok(repo.find_all_by(field, parent).await?)
        })
        .await
    }

    async fn insert<T: Document>(
        &self,
        repo: &Repository<T>,
        document: T,
    ) -> Result<T, ReferenceError> {
        with_deadline(self.timeout, async {
            repo.create(&document).await?;
            tracing::info!(
                collection = T::COLLECTION,
                id = %document.id(),
                "Reference entry created"
            );
            Ok(document)
        })
        .await
    }

    async fn require_parent<T: Document>(
        &self,
        repo: &Repository<T>,
        field: &'static str,
        id: ObjectId,
    ) -> Result<(), ReferenceError> {
        let exists = with_deadline(self.timeout, async {
            Ok::<_, ReferenceError>(repo.exists(id).await?)
        })
        .await?;

        if exists {
            Ok(())
        } else {
            Err(ReferenceError::ParentNotFound { field, id })
        }
    }
}

fn authorize(actor: &Actor) -> Result<(), ReferenceError> {
    if Permission::ManageReferenceData.allows(&actor.role) {
        Ok(())
    } else {
        Err(ReferenceError::Forbidden(
            "Only administrators may manage reference data".to_string(),
        ))
    }
}
