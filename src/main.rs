// ABOUTME: Main entry point for the virtual dental checkup API
// ABOUTME: Loads configuration, wires storage, tokens and uploads into the router, and serves it

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod auth_helpers;
mod checkups;
mod config;
mod crypto;
mod entities;
mod error;
mod extract;
mod lifecycle;
mod middleware;
mod migration;
mod session;
mod storage;
mod types;
mod uploads;

#[cfg(test)]
mod storage_tests;

use auth_helpers::CurrentUser;
use config::AppConfig;
use entities::user::Role;
use lifecycle::CheckupService;
use session::TokenIssuer;
use storage::Storage;
use uploads::UploadStore;

/// Room for a full update: every image at the size ceiling plus the text fields.
const UPDATE_BODY_LIMIT: usize =
    uploads::MAX_IMAGES_PER_UPDATE * uploads::MAX_IMAGE_BYTES + 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub tokens: TokenIssuer,
    pub checkups: CheckupService,
    pub uploads: UploadStore,
}

impl AppState {
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let storage = Arc::new(Storage::connect(&config.database_url).await?);
        let uploads = UploadStore::new(&config.upload_dir);
        uploads.ensure_dir().await?;

        Ok(Self {
            checkups: CheckupService::new(storage.clone()),
            tokens: TokenIssuer::new(&config.jwt_secret, config.token_ttl_seconds),
            storage,
            uploads,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let upload_dir = state.uploads.dir().to_path_buf();

    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/dentists", get(list_dentists))
        .route("/checkups/request", post(checkups::request_checkup))
        .route("/checkups/patient", get(checkups::patient_checkups))
        .route("/checkups/dentist", get(checkups::dentist_checkups))
        .route(
            "/checkups/:checkup_id",
            put(checkups::update_checkup)
                .get(checkups::get_checkup)
                .layer(DefaultBodyLimit::max(UPDATE_BODY_LIMIT)),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(axum_middleware::from_fn(middleware::security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "checkup_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let state = AppState::from_config(&config).await?;
    let app = build_router(state);

    let listener = TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("Server running on http://{}", config.bind_addr());

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<types::HealthResponse> {
    Json(types::HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn list_dentists(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> error::Result<Json<Vec<types::UserSummary>>> {
    let dentists = state.storage.list_users_by_role(Role::Dentist).await?;
    Ok(Json(dentists.into_iter().map(Into::into).collect()))
}
