use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::validation::PhotoInfo;

/// Student row as stored
#[derive(Debug, Clone, FromRow)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub company: Option<String>,
    pub phone1: String,
    pub phone2: Option<String>,
    pub email: String,
    pub avatar: Option<Vec<u8>>,
    pub avatar_mime: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// List projection: scalar fields and whether an avatar exists
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: i64,
    pub name: String,
    pub company: Option<String>,
    pub phone1: String,
    pub phone2: Option<String>,
    pub email: String,
    pub has_avatar: bool,
    pub created_at: String,
}

/// Full record with the avatar base64-encoded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDetail {
    pub id: i64,
    pub name: String,
    pub company: Option<String>,
    pub phone1: String,
    pub phone2: Option<String>,
    pub email: String,
    pub avatar: Option<String>,
    pub avatar_mime: Option<String>,
    /// Where a client can load the avatar image from
    pub avatar_url: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Create response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCreated {
    pub id: i64,
    pub name: String,
    pub company: Option<String>,
    pub phone1: String,
    pub phone2: Option<String>,
    pub email: String,
    pub message: String,
}

/// Scalar fields of a create or update submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentFields {
    pub name: String,
    pub company: Option<String>,
    pub phone1: String,
    pub phone2: Option<String>,
    pub email: String,
}

impl StudentFields {
    /// Trimmed copy; blank optional fields become `None`
    pub fn normalized(&self) -> Self {
        fn opt(v: &Option<String>) -> Option<String> {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }

        Self {
            name: self.name.trim().to_string(),
            company: opt(&self.company),
            phone1: self.phone1.trim().to_string(),
            phone2: opt(&self.phone2),
            email: self.email.trim().to_string(),
        }
    }
}

/// Photo part of a multipart submission, fully buffered
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub bytes: Bytes,
    pub content_type: String,
    pub file_name: Option<String>,
}

impl PhotoUpload {
    pub fn info(&self) -> PhotoInfo<'_> {
        PhotoInfo {
            content_type: &self.content_type,
            size: self.bytes.len(),
        }
    }
}

/// Raw avatar blob and its content type
#[derive(Debug, Clone)]
pub struct StoredAvatar {
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Database diagnostics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DbInfo {
    pub database_path: String,
    pub sqlite_version: String,
    pub student_count: i64,
}
