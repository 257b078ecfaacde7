//! # qrdrop: share a batch of files by link or QR code
//!
//! A sender uploads one or more files and gets a page showing a share link and a QR code for it.
//! Whoever opens the link sees the batch's files and can download any one of them directly, or
//! tick several and get them as a single zip.
//!
//! ## Architecture
//!
//! The HTTP layer is built on [Axum](https://github.com/tokio-rs/axum). File metadata lives in
//! SQLite (via sqlx); file bytes live on disk.
//!
//! - **Batch registry** ([`db`]): which filenames belong to which batch, in upload order. A batch
//!   exists once a file references it; there is no batch row.
//! - **Content store** ([`storage`]): file bytes keyed by `{batch_id}/{filename}`, so equal names
//!   in different batches never collide.
//! - **Archive assembler** ([`archive`]): packs a selection of a batch into an in-memory zip,
//!   skipping names that have no stored content.
//! - **Share codes** ([`share`]): batch ids, receiver links, and the QR images that encode them,
//!   written to the static directory and served under `/static`.
//! - **Pages** ([`templates`]): server-rendered HTML for the upload form, sender, and receiver
//!   views.
//!
//! An upload writes its bytes to the content store, registers its filenames in one short database
//! transaction, then (re)publishes the batch's QR image and redirects the sender to
//! `/sender/{batch_id}`. Content of an upload that fails to register is deleted again.

pub mod api;
pub mod archive;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod share;
mod static_assets;
pub mod storage;
pub mod telemetry;
pub mod templates;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    openapi::ApiDoc,
    share::{QrPngEncoder, ShareCodes},
    storage::{ContentStore, LocalContentStore},
    templates::Templates,
};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use bon::Builder;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;
pub use types::BatchId;

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub content: Arc<dyn ContentStore>,
    pub share: ShareCodes,
    pub templates: Templates,
}

impl AppState {
    /// Wire the default collaborators (local disk storage, PNG QR codes) from the configuration.
    pub fn from_config(config: Config, db: SqlitePool) -> anyhow::Result<Self> {
        let content: Arc<dyn ContentStore> = Arc::new(LocalContentStore::new(config.storage.upload_dir.clone()));
        let share = ShareCodes::new(
            config.public_url.clone(),
            config.storage.static_dir.clone(),
            Arc::new(QrPngEncoder::from(&config.share)),
        );

        Ok(Self::builder()
            .db(db)
            .content(content)
            .share(share)
            .templates(Templates::load()?)
            .config(config)
            .build())
    }
}

/// Get the qrdrop database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.config.storage.static_dir);

    Router::new()
        .route("/", get(api::handlers::pages::index))
        .route("/upload", post(api::handlers::uploads::upload_files))
        .route("/upload_additional/{batch_id}", post(api::handlers::uploads::upload_additional))
        .route("/sender/{batch_id}", get(api::handlers::pages::sender_view))
        .route("/receiver/{batch_id}", get(api::handlers::pages::receiver_view))
        .route("/download/{filename}", get(api::handlers::downloads::download_file))
        .route("/download_multiple", get(api::handlers::downloads::download_multiple))
        .route("/assets/{*path}", get(api::handlers::static_assets::serve_embedded_asset))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state)
        .nest_service("/static", static_dir)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        // Uploads are read whole; size limits are left to a fronting proxy
        .layer(DefaultBodyLimit::disable())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Create the directories the server writes into.
async fn prepare_directories(config: &Config) -> anyhow::Result<()> {
    for dir in [&config.storage.upload_dir, &config.storage.static_dir] {
        tokio::fs::create_dir_all(dir).await?;
        debug!(dir = %dir.display(), "Ensured directory exists");
    }
    Ok(())
}

pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = db::connect(&config.database).await?;
        Self::new_with_pool(config, pool).await
    }

    /// Create an application on an existing pool. Migrations are applied to it.
    pub async fn new_with_pool(config: Config, pool: SqlitePool) -> anyhow::Result<Self> {
        debug!("Starting qrdrop with configuration: {:#?}", config);

        migrator().run(&pool).await?;
        prepare_directories(&config).await?;

        let state = AppState::from_config(config.clone(), pool.clone())?;
        let router = build_router(state);

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "qrdrop listening on http://{}, share links point at {}",
            bind_addr, self.config.public_url
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
