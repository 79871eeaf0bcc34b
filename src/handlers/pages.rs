use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::error::AppError;
use crate::handlers::student::parse_id;
use crate::handlers::upload::StudentSubmission;
use crate::ui::form::{FormError, FormEvent, RegistrationForm};
use crate::ui::render;
use crate::ui::view::{Page, ViewModel};
use crate::validation::{Field, RuleKind, ValidationErrors, Violation};
use crate::AppState;

async fn list_page(state: &AppState, notice: Option<String>) -> Html<String> {
    let mut vm = ViewModel::default();
    vm.load(state.api.as_ref()).await;
    if notice.is_some() {
        vm.notice = notice;
    }
    Html(render::render_student_list(&vm))
}

/// GET /
pub async fn student_list(State(state): State<AppState>) -> Html<String> {
    list_page(&state, None).await
}

/// GET /register
pub async fn registration_form(State(state): State<AppState>) -> Html<String> {
    let vm = ViewModel::default().navigate(Page::Registration, None);
    let form = RegistrationForm::new(state.store.rules());
    Html(render::render_page(&vm, &form))
}

/// Map an unreadable upload onto the form, as a photo error where it is one
fn upload_rejection(e: AppError) -> FormError {
    match e {
        AppError::UnsupportedMediaType(msg) => FormError::Invalid(ValidationErrors::from(vec![
            Violation::new(Field::Photo, RuleKind::UnsupportedType, msg),
        ])),
        AppError::PayloadTooLarge(msg) => FormError::Invalid(ValidationErrors::from(vec![
            Violation::new(Field::Photo, RuleKind::TooLarge, msg),
        ])),
        AppError::BadRequest(msg) => FormError::Rejected(msg),
        other => {
            tracing::error!("Registration upload failed: {}", other);
            FormError::Rejected("Internal server error".to_string())
        }
    }
}

/// POST /register
///
/// Runs the posted form through the same state machine as any other client.
/// Success redirects to the list; failure re-renders the form with the
/// entered values and the errors.
pub async fn submit_registration(State(state): State<AppState>, multipart: Multipart) -> Response {
    let mut form = RegistrationForm::new(state.store.rules());

    let submission = match StudentSubmission::from_multipart(multipart).await {
        Ok(submission) => submission,
        Err(rejection) => {
            tracing::warn!("Rejected registration upload: {}", rejection.error);
            form.handle(FormEvent::Edited(rejection.fields));
            form.reject(upload_rejection(rejection.error));
            return (StatusCode::BAD_REQUEST, Html(render::render_registration(&form)))
                .into_response();
        }
    };

    form.handle(FormEvent::Edited(submission.fields));
    form.handle(match submission.photo {
        Some(photo) => FormEvent::FileChosen(photo),
        None => FormEvent::FileCleared,
    });

    match form.submit(state.api.as_ref()).await {
        Some(created) => {
            tracing::info!("Registered student {} via form", created.id);
            Redirect::to("/").into_response()
        }
        None => (StatusCode::BAD_REQUEST, Html(render::render_registration(&form))).into_response(),
    }
}

/// GET /students/:id
pub async fn student_card(State(state): State<AppState>, Path(id): Path<String>) -> Html<String> {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(_) => return list_page(&state, Some("Invalid student id".to_string())).await,
    };

    let mut vm = ViewModel::default().navigate(Page::StudentCard, Some(id));
    vm.load(state.api.as_ref()).await;

    let form = RegistrationForm::new(state.store.rules());
    Html(render::render_page(&vm, &form))
}
