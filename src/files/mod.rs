//! File attachment store
//!
//! Uploaded attachments are written to disk under sanitized, collision-free
//! names and recorded as [`crate::models::FileRecord`] documents.

mod sanitize;
mod store;

pub use sanitize::sanitize_filename;
pub use store::{FileStore, FileStoreError};
