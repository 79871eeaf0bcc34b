use std::path::PathBuf;
use tower_http::services::ServeDir;

/// Stylesheet and other assets for the server-rendered pages
pub fn static_service(dir: &str) -> ServeDir {
    let dir = PathBuf::from(dir);
    if !dir.is_dir() {
        tracing::warn!("Static directory {:?} does not exist", dir);
    }
    ServeDir::new(dir)
}
