use thiserror::Error;

use crate::deadline::DeadlineExceeded;
use crate::files::FileStoreError;
use crate::models::RequestStatus;
use crate::store::{ObjectId, StoreError};

/// Lifecycle engine errors
#[derive(Error, Debug)]
pub enum RequestError {
    /// Malformed or missing input, naming the offending field
    #[error("{0}")]
    Validation(String),

    #[error("Invalid {field}: '{value}' is not a valid object id")]
    InvalidId { field: String, value: String },

    #[error("the request id doesn't exist")]
    NotFound,

    #[error("{field} '{id}' does not exist")]
    ReferenceNotFound { field: &'static str, id: ObjectId },

    #[error("Cannot move a {from} request to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("{0}")]
    Forbidden(String),

    #[error("Attachment upload failed: {0}")]
    Attachment(#[from] FileStoreError),

    #[error("no documents")]
    NoDocuments,

    /// A lookup failed while building a read view
    #[error("aggregation failed: {0}")]
    Aggregation(StoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),
}

impl RequestError {
    pub(crate) fn invalid_id(field: &str, value: &str) -> Self {
        RequestError::InvalidId {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}
