//! The batch registry.
//!
//! A batch has no row of its own: it exists once at least one `files` row references its id, and
//! its file list is those rows ordered by insertion.

use crate::db::errors::{DbError, Result};
use crate::types::BatchId;
use sqlx::SqliteConnection;
use tracing::{debug, instrument};

pub struct Batches<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Batches<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Register a new batch holding `filenames`, in order, under `batch_id`.
    ///
    /// The id comes from [`crate::share::new_batch_id`], so callers can store content under it
    /// before the batch is registered.
    #[instrument(skip(self, filenames), fields(files = filenames.len()), err)]
    pub async fn create_batch(&mut self, batch_id: BatchId, filenames: &[String]) -> Result<BatchId> {
        ensure_filenames(filenames)?;

        let batch = batch_id.to_string();
        for filename in filenames {
            self.insert_file(&batch, filename).await?;
        }

        debug!(%batch_id, "Created batch");
        Ok(batch_id)
    }

    /// Add `filenames` after the existing files of `batch_id`.
    ///
    /// Fails with [`DbError::NotFound`] when no file references the batch yet. The existence
    /// check is part of the first insert, so a transaction opened for the append takes the write
    /// lock on its first statement.
    #[instrument(skip(self, filenames), fields(files = filenames.len()), err)]
    pub async fn append_to_batch(&mut self, batch_id: BatchId, filenames: &[String]) -> Result<()> {
        ensure_filenames(filenames)?;

        let batch = batch_id.to_string();
        let Some((first, rest)) = filenames.split_first() else {
            return Ok(());
        };

        let inserted = sqlx::query(
            "INSERT INTO files (filename, batch_id) \
             SELECT ?, ? WHERE EXISTS (SELECT 1 FROM files WHERE batch_id = ?)",
        )
        .bind(first)
        .bind(&batch)
        .bind(&batch)
        .execute(&mut *self.db)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        for filename in rest {
            self.insert_file(&batch, filename).await?;
        }
        Ok(())
    }

    /// Filenames of the batch in upload order; empty if the id is unknown.
    #[instrument(skip(self), err)]
    pub async fn list_files(&mut self, batch_id: BatchId) -> Result<Vec<String>> {
        let filenames = sqlx::query_scalar::<_, String>("SELECT filename FROM files WHERE batch_id = ? ORDER BY id")
            .bind(batch_id.to_string())
            .fetch_all(&mut *self.db)
            .await?;

        Ok(filenames)
    }

    /// Whether any file references `batch_id`.
    pub async fn exists(&mut self, batch_id: BatchId) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM files WHERE batch_id = ?)")
            .bind(batch_id.to_string())
            .fetch_one(&mut *self.db)
            .await?;

        Ok(found != 0)
    }

    async fn insert_file(&mut self, batch: &str, filename: &str) -> Result<()> {
        sqlx::query("INSERT INTO files (filename, batch_id) VALUES (?, ?)")
            .bind(filename)
            .bind(batch)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }
}

fn ensure_filenames(filenames: &[String]) -> Result<()> {
    if filenames.is_empty() {
        return Err(DbError::InvalidData {
            message: "No files selected".to_string(),
        });
    }
    if filenames.iter().any(|name| name.is_empty()) {
        return Err(DbError::InvalidData {
            message: "Filenames cannot be empty".to_string(),
        });
    }
    Ok(())
}
