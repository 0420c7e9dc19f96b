//! Persisted entities of the forex request backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::ObjectId;

pub mod file;
pub mod reference;
pub mod request;
pub mod user;

pub use file::FileRecord;
pub use reference::*;
pub use request::{AcceptanceStatus, AttachmentKind, Request, RequestStatus};
pub use user::{Profile, Role, TokenBlacklist, User};

/// Audit and soft-delete fields shared by every document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<ObjectId>,
    #[serde(default)]
    pub updated_by: Option<ObjectId>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub deleted_by: Option<ObjectId>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Audit {
    pub fn new(created_by: Option<ObjectId>) -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            created_by,
            updated_by: created_by,
            is_deleted: false,
            deleted_by: None,
            deleted_at: None,
        }
    }

    /// Stamp an update by `actor`
    pub fn touch(&mut self, actor: Option<ObjectId>) {
        self.updated_at = Utc::now();
        self.updated_by = actor;
    }
}

/// API response envelope: `{ message, data? }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

/// Implements [`crate::store::Document`] for an entity with `id` and flattened `audit` fields.
macro_rules! document {
    ($ty:ty, $collection:literal) => {
        impl $crate::store::Document for $ty {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> $crate::store::ObjectId {
                self.id
            }

            fn audit(&self) -> &$crate::models::Audit {
                &self.audit
            }

            fn audit_mut(&mut self) -> &mut $crate::models::Audit {
                &mut self.audit
            }
        }
    };
}

pub(crate) use document;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_omits_missing_data() {
        let json = serde_json::to_value(ApiResponse::message("logged out")).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "logged out" }));

        let json = serde_json::to_value(ApiResponse::ok("ok", 3)).unwrap();
        assert_eq!(json["data"], 3);
    }

    #[test]
    fn test_touch_updates_actor() {
        let creator = ObjectId::new();
        let editor = ObjectId::new();
        let mut audit = Audit::new(Some(creator));

        audit.touch(Some(editor));
        assert_eq!(audit.created_by, Some(creator));
        assert_eq!(audit.updated_by, Some(editor));
        assert!(audit.updated_at >= audit.created_at);
    }
}
