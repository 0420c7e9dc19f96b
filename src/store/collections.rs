use std::sync::Arc;

use super::{DocumentStore, Repository};
use crate::models::{
    Branch, Country, Currency, CustomerType, Department, District, FileRecord, Process, Profile,
    Request, Role, Subprocess, TokenBlacklist, TravelPurpose, User,
};

/// Every collection the backend persists. Table names in `migrations/` match.
pub const COLLECTION_NAMES: &[&str] = &[
    "requests",
    "users",
    "profiles",
    "roles",
    "token_blacklist",
    "files",
    "currencies",
    "countries",
    "districts",
    "branches",
    "processes",
    "subprocesses",
    "departments",
    "travel_purposes",
    "customer_types",
];

/// Typed repositories over one shared backend
#[derive(Clone)]
pub struct Collections {
    store: Arc<dyn DocumentStore>,
    pub requests: Repository<Request>,
    pub users: Repository<User>,
    pub profiles: Repository<Profile>,
    pub roles: Repository<Role>,
    pub token_blacklist: Repository<TokenBlacklist>,
    pub files: Repository<FileRecord>,
    pub currencies: Repository<Currency>,
    pub countries: Repository<Country>,
    pub districts: Repository<District>,
    pub branches: Repository<Branch>,
    pub processes: Repository<Process>,
    pub subprocesses: Repository<Subprocess>,
    pub departments: Repository<Department>,
    pub travel_purposes: Repository<TravelPurpose>,
    pub customer_types: Repository<CustomerType>,
}

impl Collections {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            requests: Repository::new(store.clone()),
            users: Repository::new(store.clone()),
            profiles: Repository::new(store.clone()),
            roles: Repository::new(store.clone()),
            token_blacklist: Repository::new(store.clone()),
            files: Repository::new(store.clone()),
            currencies: Repository::new(store.clone()),
            countries: Repository::new(store.clone()),
            districts: Repository::new(store.clone()),
            branches: Repository::new(store.clone()),
            processes: Repository::new(store.clone()),
            subprocesses: Repository::new(store.clone()),
            departments: Repository::new(store.clone()),
            travel_purposes: Repository::new(store.clone()),
            customer_types: Repository::new(store.clone()),
            store,
        }
    }

    /// Underlying backend, for health checks
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Document;

    #[test]
    fn test_every_document_collection_is_registered() {
        for name in [
            Request::COLLECTION,
            User::COLLECTION,
            Profile::COLLECTION,
            Role::COLLECTION,
            TokenBlacklist::COLLECTION,
            FileRecord::COLLECTION,
            Currency::COLLECTION,
            Country::COLLECTION,
            District::COLLECTION,
            Branch::COLLECTION,
            Process::COLLECTION,
            Subprocess::COLLECTION,
            Department::COLLECTION,
            TravelPurpose::COLLECTION,
            CustomerType::COLLECTION,
        ] {
            assert!(COLLECTION_NAMES.contains(&name), "{} missing", name);
        }
    }
}
