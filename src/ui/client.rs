use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{PhotoUpload, StudentCreated, StudentDetail, StudentFields, StudentSummary};
use crate::services::StudentStore;
use crate::validation::{ValidationErrors, Violation};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The API answered with an error status
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        details: ValidationErrors,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
        }
    }

    pub fn details(&self) -> Option<&ValidationErrors> {
        match self {
            ClientError::Api { details, .. } if !details.is_empty() => Some(details),
            _ => None,
        }
    }
}

impl From<AppError> for ClientError {
    fn from(e: AppError) -> Self {
        let status = e.status().as_u16();
        match e {
            AppError::Validation(errors) => ClientError::Api {
                status,
                message: errors.to_string(),
                details: errors,
            },
            AppError::NotFound(message)
            | AppError::BadRequest(message)
            | AppError::UnsupportedMediaType(message)
            | AppError::PayloadTooLarge(message) => ClientError::Api {
                status,
                message,
                details: ValidationErrors::default(),
            },
            other => {
                tracing::error!("Store error: {}", other);
                ClientError::Api {
                    status,
                    message: "Internal server error".to_string(),
                    details: ValidationErrors::default(),
                }
            }
        }
    }
}

/// Operations the UI needs from the student API
#[async_trait]
pub trait StudentApi: Send + Sync {
    async fn list(&self) -> Result<Vec<StudentSummary>, ClientError>;

    async fn get(&self, id: i64) -> Result<StudentDetail, ClientError>;

    async fn create(
        &self,
        fields: &StudentFields,
        photo: &PhotoUpload,
    ) -> Result<StudentCreated, ClientError>;

    async fn delete(&self, id: i64) -> Result<(), ClientError>;
}

/// Talks to the REST API over HTTP
pub struct HttpStudentClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<Vec<Violation>>,
}

impl HttpStudentClient {
    /// `base_url` is the API root, e.g. `http://localhost:3000/api`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await?;
        let (message, details) = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(err) => (err.error, err.details.unwrap_or_default()),
            Err(_) => (body, Vec::new()),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
            details: details.into(),
        })
    }
}

#[async_trait]
impl StudentApi for HttpStudentClient {
    async fn list(&self) -> Result<Vec<StudentSummary>, ClientError> {
        let resp = self
            .client
            .get(format!("{}/students", self.base_url))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn get(&self, id: i64) -> Result<StudentDetail, ClientError> {
        let resp = self
            .client
            .get(format!("{}/students/{}", self.base_url, id))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn create(
        &self,
        fields: &StudentFields,
        photo: &PhotoUpload,
    ) -> Result<StudentCreated, ClientError> {
        let part = Part::bytes(photo.bytes.to_vec())
            .file_name(photo.file_name.clone().unwrap_or_else(|| "photo".to_string()))
            .mime_str(&photo.content_type)?;

        let form = Form::new()
            .text("name", fields.name.clone())
            .text("company", fields.company.clone().unwrap_or_default())
            .text("phone1", fields.phone1.clone())
            .text("phone2", fields.phone2.clone().unwrap_or_default())
            .text("email", fields.email.clone())
            .part("photo", part);

        let resp = self
            .client
            .post(format!("{}/students", self.base_url))
            .multipart(form)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn delete(&self, id: i64) -> Result<(), ClientError> {
        let resp = self
            .client
            .delete(format!("{}/students/{}", self.base_url, id))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

/// Calls the store in-process; backs the server-rendered pages
#[derive(Clone)]
pub struct LocalStudentApi {
    store: StudentStore,
}

impl LocalStudentApi {
    pub fn new(store: StudentStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StudentApi for LocalStudentApi {
    async fn list(&self) -> Result<Vec<StudentSummary>, ClientError> {
        Ok(self.store.list_summaries().await?)
    }

    async fn get(&self, id: i64) -> Result<StudentDetail, ClientError> {
        Ok(self.store.get_by_id(id).await?)
    }

    async fn create(
        &self,
        fields: &StudentFields,
        photo: &PhotoUpload,
    ) -> Result<StudentCreated, ClientError> {
        Ok(self.store.create(fields, Some(photo)).await?)
    }

    async fn delete(&self, id: i64) -> Result<(), ClientError> {
        Ok(self.store.delete(id).await?)
    }
}
