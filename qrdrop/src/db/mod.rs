//! Record store: the durable table mapping batch ids to filenames.
//!
//! This module implements the data access layer using SQLx with SQLite.
//! It follows the Repository pattern to keep SQL out of the request handlers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - registry operations & queries)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   SQLite    │
//! └─────────────┘
//! ```
//!
//! # Transactions
//!
//! Repositories borrow a connection, so the caller decides the transaction scope. Writes should
//! always go through a transaction, kept short: SQLite has a single writer, and other uploads wait
//! on the lock until it commits.
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! Batches::new(&mut tx).create_batch(new_batch_id(), &filenames).await?;
//! tx.commit().await?;
//! ```
//!
//! # Migrations
//!
//! Migrations live in the crate's `migrations/` directory and run on startup through
//! [`crate::migrator`], from `Application::new_with_pool`.

pub mod errors;
pub mod handlers;

use crate::config::{DatabaseConfig, PoolSettings};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Build pool options from configured settings. A timeout of 0 disables that limit.
pub fn pool_options(settings: &PoolSettings) -> SqlitePoolOptions {
    let idle_timeout = (settings.idle_timeout_secs > 0).then(|| Duration::from_secs(settings.idle_timeout_secs));
    let max_lifetime = (settings.max_lifetime_secs > 0).then(|| Duration::from_secs(settings.max_lifetime_secs));

    SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(idle_timeout)
        .max_lifetime(max_lifetime)
}

/// Open the record store, creating the SQLite file if needed. Migrations are run by the caller.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

    let pool = pool_options(&config.pool).connect_with(options).await?;

    info!(
        "Record store ready (url: {}, pool: {} connections)",
        config.url,
        pool.options().get_max_connections()
    );

    Ok(pool)
}
