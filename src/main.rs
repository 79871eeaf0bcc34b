mod avatar;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod static_files;
mod ui;
mod validation;

#[cfg(test)]
mod testing;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::avatar::AvatarProvider;
use crate::config::Config;
use crate::db::Database;
use crate::services::StudentStore;
use crate::ui::client::{HttpStudentClient, LocalStudentApi, StudentApi};
use crate::validation::RuleSet;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: StudentStore,
    pub config: Arc<Config>,
    /// Data source for the HTML pages
    pub api: Arc<dyn StudentApi>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "student_card=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting student card service...");

    // Load configuration
    let config = Arc::new(Config::load()?);
    tracing::info!("Configuration loaded");

    // Initialize database
    let db = Database::new(&config.database.path, config.database.max_connections).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized at {}", config.database.path);

    let store = StudentStore::new(
        db,
        config.avatar.mode,
        AvatarProvider::new(config.avatar.provider_url.clone()),
        RuleSet {
            require_company: config.validation.require_company,
        },
    );

    let api: Arc<dyn StudentApi> = match &config.api.base_url {
        Some(url) => {
            tracing::info!("Pages read students from remote API at {}", url);
            Arc::new(HttpStudentClient::new(url.clone()))
        }
        None => Arc::new(LocalStudentApi::new(store.clone())),
    };

    let state = AppState {
        store,
        config: config.clone(),
        api,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/students",
            get(handlers::student::list_students).post(handlers::student::create_student),
        )
        .route(
            "/students/:id",
            get(handlers::student::get_student)
                .put(handlers::student::update_student)
                .delete(handlers::student::delete_student),
        )
        .route("/uploads/:id", get(handlers::student::get_upload))
        .route("/db-info", get(handlers::student::db_info));

    let page_routes = Router::new()
        .route("/", get(handlers::pages::student_list))
        .route(
            "/register",
            get(handlers::pages::registration_form).post(handlers::pages::submit_registration),
        )
        .route("/students/:id", get(handlers::pages::student_card));

    Router::new()
        .nest("/api", api_routes)
        .merge(page_routes)
        .route("/health", get(|| async { "ok" }))
        .nest_service(
            "/static",
            static_files::static_service(&state.config.server.static_dir),
        )
        .layer(DefaultBodyLimit::max(state.config.upload.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
