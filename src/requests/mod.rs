//! Forex request lifecycle
//!
//! `new -> validated -> approved -> accepted | declined`, with `rejected`
//! reachable from `new` and `validated`. Reads run through the populate
//! pipeline in [`populate`].

mod error;
pub mod model;
pub mod populate;
mod service;

pub use error::RequestError;
pub use model::{
    ActorName, ApproveRequestInput, AttachmentUpload, CreateRequestForm, ListQuery, NewRequest,
    RejectRequestInput, RequestView, TextOrNumber, ValidateRequestInput,
};
pub use service::{generate_request_code, RequestService};
