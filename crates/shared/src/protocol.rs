use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Cid, DocumentId};

/// One stored file as returned by `GET /documents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub name: String,
    pub cid: Cid,
    pub size: u64,
    #[serde(default)]
    pub number_of_files: u32,
    pub mime_type: String,
    #[serde(default)]
    pub group_id: Option<String>,
    /// Free-form metadata attached at upload time (issuer, department, ...).
    #[serde(default)]
    pub keyvalues: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPage {
    pub files: Vec<DocumentSummary>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Listing envelope: the backend wraps the page in a `data` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub data: DocumentPage,
}

/// Verification detail for a single document, returned by the detail and
/// content-search endpoints. Field names are camelCase on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetail {
    pub id: DocumentId,
    pub name: String,
    pub cid: Cid,
    pub size: u64,
    #[serde(default)]
    pub issuer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_valid: bool,
    pub is_exist_ethereum: bool,
    pub is_exist_base: bool,
}

/// Acknowledgement for a successful multipart upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub id: DocumentId,
    pub cid: Cid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceResponse {
    pub message_string: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
}
