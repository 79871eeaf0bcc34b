//! Registration form as an explicit state machine.
//!
//! States change only through [`FormEvent`]s, so the flow is the same whether
//! the events come from a browser, a test, or a server-side form post.

use base64::{engine::general_purpose, Engine as _};

use crate::models::{PhotoUpload, StudentCreated, StudentFields};
use crate::ui::client::{ClientError, StudentApi};
use crate::validation::{validate_submission, PhotoRule, RuleSet, ValidationErrors};

#[derive(Debug, Clone, PartialEq)]
pub enum FormState {
    Idle,
    FileSelected,
    Submitting,
    Error(FormError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormError {
    /// Field rules failed, locally or on the server
    Invalid(ValidationErrors),
    /// The request failed for another reason
    Rejected(String),
}

#[derive(Debug, Clone)]
pub enum FormEvent {
    Edited(StudentFields),
    FileChosen(PhotoUpload),
    FileCleared,
    Submit,
    Succeeded,
    Failed(FormError),
}

impl From<ClientError> for FormError {
    fn from(e: ClientError) -> Self {
        match e.details() {
            Some(details) => FormError::Invalid(details.clone()),
            None => FormError::Rejected(e.to_string()),
        }
    }
}

/// Registration form data plus its current state
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    state: FormState,
    fields: StudentFields,
    photo: Option<PhotoUpload>,
    rules: RuleSet,
}

impl RegistrationForm {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            state: FormState::Idle,
            fields: StudentFields::default(),
            photo: None,
            rules,
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn fields(&self) -> &StudentFields {
        &self.fields
    }

    pub fn photo(&self) -> Option<&PhotoUpload> {
        self.photo.as_ref()
    }

    pub fn rules(&self) -> RuleSet {
        self.rules
    }

    pub fn errors(&self) -> Option<&ValidationErrors> {
        match &self.state {
            FormState::Error(FormError::Invalid(errors)) => Some(errors),
            _ => None,
        }
    }

    /// Message for failures that are not tied to a field
    pub fn notice(&self) -> Option<&str> {
        match &self.state {
            FormState::Error(FormError::Rejected(msg)) => Some(msg),
            _ => None,
        }
    }

    /// `data:` URL of the chosen photo for the live preview
    pub fn preview_data_url(&self) -> Option<String> {
        self.photo.as_ref().map(|p| {
            format!(
                "data:{};base64,{}",
                p.content_type,
                general_purpose::STANDARD.encode(&p.bytes)
            )
        })
    }

    fn resting_state(&self) -> FormState {
        if self.photo.is_some() {
            FormState::FileSelected
        } else {
            FormState::Idle
        }
    }

    /// Apply one event and return the new state
    pub fn handle(&mut self, event: FormEvent) -> &FormState {
        let submitting = self.state == FormState::Submitting;

        match event {
            FormEvent::Edited(fields) if !submitting => {
                self.fields = fields;
                if matches!(self.state, FormState::Error(_)) {
                    self.state = self.resting_state();
                }
            }
            FormEvent::FileChosen(photo) if !submitting => {
                self.photo = Some(photo);
                self.state = FormState::FileSelected;
            }
            FormEvent::FileCleared if !submitting => {
                self.photo = None;
                self.state = FormState::Idle;
            }
            FormEvent::Submit if !submitting => {
                let result = validate_submission(
                    &self.fields,
                    self.photo.as_ref().map(PhotoUpload::info),
                    PhotoRule::Required,
                    self.rules,
                );
                self.state = match result {
                    Ok(()) => FormState::Submitting,
                    Err(errors) => FormState::Error(FormError::Invalid(errors)),
                };
            }
            FormEvent::Succeeded if submitting => {
                self.fields = StudentFields::default();
                self.photo = None;
                self.state = FormState::Idle;
            }
            FormEvent::Failed(error) if submitting => {
                self.state = FormState::Error(error);
            }
            ignored => {
                tracing::debug!("Ignoring {} in state {:?}", event_name(&ignored), self.state);
            }
        }
        &self.state
    }

    /// Put the form in an error state for a submission that was refused before
    /// it reached the form, e.g. an upload that could not be read
    pub fn reject(&mut self, error: FormError) {
        if self.state != FormState::Submitting {
            self.state = FormState::Error(error);
        }
    }

    /// Validate, send, and settle the form. Returns the created student on success;
    /// on failure the fields and photo are kept for correction.
    pub async fn submit<A: StudentApi + ?Sized>(&mut self, api: &A) -> Option<StudentCreated> {
        // one request in flight at a time
        if self.state == FormState::Submitting {
            return None;
        }
        if self.handle(FormEvent::Submit) != &FormState::Submitting {
            return None;
        }
        let Some(photo) = self.photo.clone() else {
            self.handle(FormEvent::Failed(FormError::Rejected(
                "Student photo is required".to_string(),
            )));
            return None;
        };

        match api.create(&self.fields, &photo).await {
            Ok(created) => {
                self.handle(FormEvent::Succeeded);
                Some(created)
            }
            Err(e) => {
                tracing::warn!("Registration failed: {}", e);
                self.handle(FormEvent::Failed(e.into()));
                None
            }
        }
    }
}

fn event_name(event: &FormEvent) -> &'static str {
    match event {
        FormEvent::Edited(_) => "Edited",
        FormEvent::FileChosen(_) => "FileChosen",
        FormEvent::FileCleared => "FileCleared",
        FormEvent::Submit => "Submit",
        FormEvent::Succeeded => "Succeeded",
        FormEvent::Failed(_) => "Failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::AvatarMode;
    use crate::testing::app_state;
    use crate::ui::client::LocalStudentApi;
    use crate::validation::{Field, RuleKind};
    use bytes::Bytes;

    fn jo() -> StudentFields {
        StudentFields {
            name: "Jo".to_string(),
            company: None,
            phone1: "1234567890".to_string(),
            phone2: None,
            email: "jo@x.co".to_string(),
        }
    }

    fn gif() -> PhotoUpload {
        PhotoUpload {
            bytes: Bytes::from_static(b"GIF89a"),
            content_type: "image/gif".to_string(),
            file_name: Some("jo.gif".to_string()),
        }
    }

    #[test]
    fn test_file_selection_transitions() {
        let mut form = RegistrationForm::new(RuleSet::default());
        assert_eq!(form.state(), &FormState::Idle);

        assert_eq!(form.handle(FormEvent::FileChosen(gif())), &FormState::FileSelected);
        assert_eq!(
            form.preview_data_url().as_deref(),
            Some("data:image/gif;base64,R0lGODlh")
        );
        assert_eq!(form.handle(FormEvent::FileCleared), &FormState::Idle);
        assert!(form.photo().is_none());
    }

    #[test]
    fn test_submit_without_photo_lists_all_errors() {
        let mut form = RegistrationForm::new(RuleSet::default());
        let mut fields = jo();
        fields.name = "J".to_string();
        form.handle(FormEvent::Edited(fields));

        form.handle(FormEvent::Submit);
        let errors = form.errors().unwrap();
        assert!(errors.has(Field::Name, RuleKind::TooShort));
        assert!(errors.has(Field::Photo, RuleKind::Required));

        // editing clears the error state but keeps the values
        form.handle(FormEvent::Edited(jo()));
        assert_eq!(form.state(), &FormState::Idle);
        assert_eq!(form.fields().name, "Jo");
    }

    #[test]
    fn test_submitting_ignores_input() {
        let mut form = RegistrationForm::new(RuleSet::default());
        form.handle(FormEvent::Edited(jo()));
        form.handle(FormEvent::FileChosen(gif()));
        assert_eq!(form.handle(FormEvent::Submit), &FormState::Submitting);

        form.handle(FormEvent::FileCleared);
        form.handle(FormEvent::Submit);
        assert_eq!(form.state(), &FormState::Submitting);
        assert!(form.photo().is_some());

        let failed = form.handle(FormEvent::Failed(FormError::Rejected("offline".to_string())));
        assert_eq!(failed, &FormState::Error(FormError::Rejected("offline".to_string())));
        assert_eq!(form.notice(), Some("offline"));
        assert_eq!(form.fields().email, "jo@x.co");
    }

    #[test]
    fn test_outcome_events_outside_submitting_are_ignored() {
        let mut form = RegistrationForm::new(RuleSet::default());
        form.handle(FormEvent::Edited(jo()));
        assert_eq!(form.handle(FormEvent::Succeeded), &FormState::Idle);
        assert_eq!(form.fields().name, "Jo");
    }

    #[tokio::test]
    async fn test_submit_success_resets_form() {
        let state = app_state(AvatarMode::Photo).await;
        let api = LocalStudentApi::new(state.store.clone());

        let mut form = RegistrationForm::new(RuleSet::default());
        form.handle(FormEvent::Edited(jo()));
        form.handle(FormEvent::FileChosen(gif()));

        let created = form.submit(&api).await.unwrap();
        assert_eq!(created.name, "Jo");
        assert_eq!(form.state(), &FormState::Idle);
        assert_eq!(form.fields(), &StudentFields::default());
        assert_eq!(state.store.list_summaries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_server_rejection_keeps_values() {
        // the server requires a company, the form does not
        let db = crate::db::Database::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        let strict = LocalStudentApi::new(crate::services::StudentStore::new(
            db,
            AvatarMode::Photo,
            crate::avatar::AvatarProvider::new("https://example.test/svg"),
            RuleSet {
                require_company: true,
            },
        ));

        let mut form = RegistrationForm::new(RuleSet::default());
        form.handle(FormEvent::Edited(jo()));
        form.handle(FormEvent::FileChosen(gif()));
        assert!(form.submit(&strict).await.is_none());

        let errors = form.errors().unwrap();
        assert!(errors.has(Field::Company, RuleKind::Required));
        assert_eq!(form.fields().name, "Jo");
        assert!(form.photo().is_some());
    }
}
