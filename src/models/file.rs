use serde::{Deserialize, Serialize};

use super::{document, Audit};
use crate::store::ObjectId;

/// Metadata of an uploaded attachment stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: ObjectId,
    /// `{prefix}-{file_id}-{name}` under the upload directory
    pub storage_name: String,
    /// Sanitized original filename
    pub name: String,
    pub file_id: String,
    pub path: String,
    pub url: String,
    pub size: u64,
    pub content_type: String,
    #[serde(flatten)]
    pub audit: Audit,
}

document!(FileRecord, "files");
