//! Shared fixtures for handler and UI tests.

use std::sync::Arc;

use crate::avatar::{AvatarMode, AvatarProvider};
use crate::config::Config;
use crate::db::Database;
use crate::services::StudentStore;
use crate::ui::client::LocalStudentApi;
use crate::validation::RuleSet;
use crate::AppState;

pub const BOUNDARY: &str = "----studentcardtestboundary";

pub async fn app_state(mode: AvatarMode) -> AppState {
    let db = Database::in_memory().await.unwrap();
    db.run_migrations().await.unwrap();

    let mut config = Config::default();
    config.avatar.mode = mode;
    let store = StudentStore::new(
        db,
        mode,
        AvatarProvider::new(config.avatar.provider_url.clone()),
        RuleSet::default(),
    );

    AppState {
        api: Arc::new(LocalStudentApi::new(store.clone())),
        store,
        config: Arc::new(config),
    }
}

/// Serve the router on an ephemeral port and return the API root
pub async fn spawn_server(state: AppState) -> String {
    let app = crate::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

/// Minimal JPEG-looking payload of the given size
pub fn jpeg_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
    if len >= 3 {
        bytes[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
    }
    bytes
}

/// File part of a hand-built multipart body
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

/// Build a `multipart/form-data` body; returns the content type header and the body
pub fn multipart_body(texts: &[(&str, &str)], files: &[FilePart<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in texts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    for file in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                file.field, file.file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.content_type).as_bytes());
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// The scalar fields of a valid registration
pub fn jo_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("name", "Jo"),
        ("company", ""),
        ("phone1", "1234567890"),
        ("phone2", ""),
        ("email", "jo@x.co"),
    ]
}
