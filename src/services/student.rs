use base64::{engine::general_purpose, Engine as _};
use chrono::{SecondsFormat, Utc};

use crate::avatar::{AvatarMode, AvatarProvider, SEED_MIME};
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{
    DbInfo, PhotoUpload, StoredAvatar, Student, StudentCreated, StudentDetail, StudentFields,
    StudentSummary,
};
use crate::validation::{validate_submission, PhotoRule, RuleSet};

/// Student record store
#[derive(Clone)]
pub struct StudentStore {
    db: Database,
    avatar_mode: AvatarMode,
    provider: AvatarProvider,
    rules: RuleSet,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl StudentStore {
    pub fn new(db: Database, avatar_mode: AvatarMode, provider: AvatarProvider, rules: RuleSet) -> Self {
        Self {
            db,
            avatar_mode,
            provider,
            rules,
        }
    }

    pub fn rules(&self) -> RuleSet {
        self.rules
    }

    pub fn provider(&self) -> &AvatarProvider {
        &self.provider
    }

    /// Validate and insert a new student; the photo is mandatory
    pub async fn create(&self, fields: &StudentFields, photo: Option<&PhotoUpload>) -> Result<StudentCreated> {
        let fields = fields.normalized();
        validate_submission(&fields, photo.map(PhotoUpload::info), PhotoRule::Required, self.rules)?;
        let photo = photo.ok_or_else(|| AppError::Internal("photo missing after validation".to_string()))?;

        let blob = self
            .avatar_mode
            .to_blob(&fields.name, &photo.bytes, &photo.content_type);
        let now = now();

        let result = sqlx::query(
            r#"
            INSERT INTO students (name, company, phone1, phone2, email, avatar, avatar_mime, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.company)
        .bind(&fields.phone1)
        .bind(&fields.phone2)
        .bind(&fields.email)
        .bind(&blob.bytes)
        .bind(&blob.mime)
        .bind(&now)
        .bind(&now)
        .execute(self.db.pool())
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!(
            id,
            avatar_mode = %self.avatar_mode,
            avatar_len = blob.bytes.len(),
            "Student created"
        );

        Ok(StudentCreated {
            id,
            name: fields.name,
            company: fields.company,
            phone1: fields.phone1,
            phone2: fields.phone2,
            email: fields.email,
            message: "Student created successfully".to_string(),
        })
    }

    /// All students, newest first, without avatar bytes
    pub async fn list_summaries(&self) -> Result<Vec<StudentSummary>> {
        let students = sqlx::query_as(
            r#"
            SELECT id, name, company, phone1, phone2, email,
                   CASE WHEN avatar IS NOT NULL THEN 1 ELSE 0 END AS has_avatar,
                   created_at
            FROM students
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(students)
    }

    /// Full record with the avatar base64-encoded
    pub async fn get_by_id(&self, id: i64) -> Result<StudentDetail> {
        let student: Student = sqlx::query_as("SELECT * FROM students WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

        let avatar_url = self.avatar_url(&student);
        Ok(StudentDetail {
            id: student.id,
            name: student.name,
            company: student.company,
            phone1: student.phone1,
            phone2: student.phone2,
            email: student.email,
            avatar: student
                .avatar
                .as_deref()
                .map(|bytes| general_purpose::STANDARD.encode(bytes)),
            avatar_mime: student.avatar_mime,
            avatar_url,
            created_at: student.created_at,
            updated_at: student.updated_at,
        })
    }

    /// Uploaded photos are served by id; seeds and missing avatars go to the provider
    fn avatar_url(&self, student: &Student) -> String {
        match (&student.avatar, student.avatar_mime.as_deref()) {
            (Some(seed), Some(SEED_MIME)) => self.provider.url_for(&String::from_utf8_lossy(seed)),
            (Some(_), _) => format!("/api/uploads/{}", student.id),
            (None, _) => self.provider.url_for(&student.name),
        }
    }

    /// Replace scalar fields, and the avatar when a new photo is given
    pub async fn update(&self, id: i64, fields: &StudentFields, photo: Option<&PhotoUpload>) -> Result<()> {
        let fields = fields.normalized();
        validate_submission(&fields, photo.map(PhotoUpload::info), PhotoRule::Optional, self.rules)?;

        let blob = photo.map(|p| self.avatar_mode.to_blob(&fields.name, &p.bytes, &p.content_type));
        let now = now();

        let result = match &blob {
            Some(blob) => {
                sqlx::query(
                    r#"
                    UPDATE students
                    SET name = ?, company = ?, phone1 = ?, phone2 = ?, email = ?,
                        avatar = ?, avatar_mime = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&fields.name)
                .bind(&fields.company)
                .bind(&fields.phone1)
                .bind(&fields.phone2)
                .bind(&fields.email)
                .bind(&blob.bytes)
                .bind(&blob.mime)
                .bind(&now)
                .bind(id)
                .execute(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE students
                    SET name = ?, company = ?, phone1 = ?, phone2 = ?, email = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&fields.name)
                .bind(&fields.company)
                .bind(&fields.phone1)
                .bind(&fields.phone2)
                .bind(&fields.email)
                .bind(&now)
                .bind(id)
                .execute(self.db.pool())
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Student not found".to_string()));
        }

        tracing::info!(id, avatar_replaced = blob.is_some(), "Student updated");
        Ok(())
    }

    /// Remove a student; missing ids are not an error
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        tracing::info!(id, removed = result.rows_affected(), "Student deleted");
        Ok(())
    }

    /// Raw avatar bytes for a student, if any
    pub async fn avatar(&self, id: i64) -> Result<Option<StoredAvatar>> {
        let row: Option<(Option<Vec<u8>>, Option<String>)> =
            sqlx::query_as("SELECT avatar, avatar_mime FROM students WHERE id = ?")
                .bind(id)
                .fetch_optional(self.db.pool())
                .await?;

        Ok(row.and_then(|(bytes, mime)| bytes.map(|bytes| StoredAvatar { bytes, mime })))
    }

    pub async fn stats(&self) -> Result<DbInfo> {
        let (sqlite_version,): (String,) = sqlx::query_as("SELECT sqlite_version()")
            .fetch_one(self.db.pool())
            .await?;
        let (student_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM students")
            .fetch_one(self.db.pool())
            .await?;

        Ok(DbInfo {
            database_path: self.db.path().to_string(),
            sqlite_version,
            student_count,
        })
    }
}
