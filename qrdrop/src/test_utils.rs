//! Shared fixtures for handler tests.

use crate::config::{Config, DatabaseConfig, PoolSettings, StorageConfig};
use crate::db::handlers::Batches;
use crate::types::BatchId;
use crate::{AppState, build_router};
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use sqlx::SqlitePool;
use std::path::Path;
use tempfile::TempDir;

pub fn create_test_config(dir: &Path) -> Config {
    Config {
        public_url: url::Url::parse("http://qrdrop.test").expect("valid test URL"),
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            pool: PoolSettings {
                max_connections: 1,
                min_connections: 0,
                acquire_timeout_secs: 5,
                idle_timeout_secs: 0,
                max_lifetime_secs: 0,
            },
        },
        storage: StorageConfig {
            upload_dir: dir.join("uploads"),
            static_dir: dir.join("static"),
        },
        ..Default::default()
    }
}

/// Test server over the given database and fresh temporary directories.
///
/// The pool is the migrated database `#[sqlx::test]` hands each test. The returned state shares
/// the server's pool and directories; keep the `TempDir` alive for the duration of the test.
pub async fn create_test_app(pool: SqlitePool) -> (TestServer, AppState, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = create_test_config(dir.path());
    std::fs::create_dir_all(&config.storage.upload_dir).expect("Failed to create upload dir");
    std::fs::create_dir_all(&config.storage.static_dir).expect("Failed to create static dir");

    let state = AppState::from_config(config, pool).expect("Failed to build app state");
    let server = TestServer::new(build_router(state.clone())).expect("Failed to create test server");

    (server, state, dir)
}

/// Multipart form with one `files` part per entry.
pub fn upload_form(files: &[(&str, &[u8])]) -> MultipartForm {
    files.iter().fold(MultipartForm::new(), |form, (name, content)| {
        form.add_part(
            "files",
            Part::bytes(content.to_vec())
                .file_name(name.to_string())
                .mime_type("application/octet-stream"),
        )
    })
}

/// Filenames the registry holds for `batch_id`.
pub async fn names_in_batch(state: &AppState, batch_id: BatchId) -> Vec<String> {
    let mut conn = state.db.acquire().await.expect("Failed to acquire connection");
    Batches::new(&mut conn)
        .list_files(batch_id)
        .await
        .expect("Failed to list files")
}
