use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};

use crate::avatar::SEED_MIME;
use crate::error::{AppError, Result};
use crate::handlers::upload::StudentSubmission;
use crate::models::{DbInfo, MessageResponse, StudentCreated, StudentDetail, StudentSummary};
use crate::AppState;

pub(crate) fn parse_id(raw: &str) -> Result<i64> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid student id".to_string()))
}

/// List students
/// GET /api/students
pub async fn list_students(State(state): State<AppState>) -> Result<Json<Vec<StudentSummary>>> {
    let students = state.store.list_summaries().await?;
    Ok(Json(students))
}

/// Get a single student with its avatar
/// GET /api/students/:id
pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StudentDetail>> {
    let student = state.store.get_by_id(parse_id(&id)?).await?;
    Ok(Json(student))
}

/// Register a student
/// POST /api/students
pub async fn create_student(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<StudentCreated>)> {
    let submission = StudentSubmission::from_multipart(multipart).await?;
    let created = state
        .store
        .create(&submission.fields, submission.photo.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a student; the photo is optional
/// PUT /api/students/:id
pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    let submission = StudentSubmission::from_multipart(multipart).await?;
    state
        .store
        .update(id, &submission.fields, submission.photo.as_ref())
        .await?;
    Ok(Json(MessageResponse::new("Student updated successfully")))
}

/// Delete a student
/// DELETE /api/students/:id
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.store.delete(parse_id(&id)?).await?;
    Ok(Json(MessageResponse::new("Student deleted successfully")))
}

/// Raw avatar bytes
/// GET /api/uploads/:id
pub async fn get_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let avatar = state
        .store
        .avatar(parse_id(&id)?)
        .await?
        .ok_or_else(|| AppError::NotFound("Avatar not found".to_string()))?;

    if avatar.mime.as_deref() == Some(SEED_MIME) {
        let seed = String::from_utf8_lossy(&avatar.bytes);
        let url = state.store.provider().url_for(&seed);
        return Ok(Redirect::temporary(&url).into_response());
    }

    let content_type = avatar
        .mime
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, avatar.bytes.len())
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(avatar.bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Database diagnostics
/// GET /api/db-info
pub async fn db_info(State(state): State<AppState>) -> Result<Json<DbInfo>> {
    Ok(Json(state.store.stats().await?))
}
