use crate::AppState;
use crate::db::errors::DbError;
use crate::db::handlers::Batches;
use crate::errors::{Error, Result};
use crate::share::new_batch_id;
use crate::storage::{ContentKey, validate_filename};
use crate::types::BatchId;
use axum::{
    extract::{Multipart, Path, State},
    response::Redirect,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};

/// One file part from an upload form.
#[derive(Debug)]
pub(crate) struct Upload {
    pub filename: String,
    pub content: Bytes,
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "uploads",
    summary = "Upload files",
    description = "Create a new batch from the `files` parts of a multipart form and redirect to its sender page.",
    request_body(content_type = "multipart/form-data", description = "One or more file parts named `files`"),
    responses(
        (status = 303, description = "Batch created; redirect to /sender/{batch_id}"),
        (status = 400, description = "No files selected, or a filename is not usable"),
        (status = 500, description = "Internal server error")
    )
)]
#[instrument(skip_all, err)]
pub async fn upload_files(State(state): State<AppState>, multipart: Multipart) -> Result<Redirect> {
    let uploads = read_uploads(multipart).await?;
    store_uploads(&state, None, uploads).await
}

#[utoipa::path(
    post,
    path = "/upload_additional/{batch_id}",
    tag = "uploads",
    summary = "Add files to a batch",
    description = "Append the `files` parts of a multipart form to an existing batch and redirect back to its sender page.",
    params(("batch_id" = uuid::Uuid, Path, description = "Batch to append to")),
    request_body(content_type = "multipart/form-data", description = "One or more file parts named `files`"),
    responses(
        (status = 303, description = "Files appended; redirect to /sender/{batch_id}"),
        (status = 400, description = "No files selected, or a filename is not usable"),
        (status = 404, description = "Batch not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[instrument(skip(state, multipart), err)]
pub async fn upload_additional(
    State(state): State<AppState>,
    Path(batch_id): Path<BatchId>,
    multipart: Multipart,
) -> Result<Redirect> {
    let uploads = read_uploads(multipart).await?;
    store_uploads(&state, Some(batch_id), uploads).await
}

/// Collect the non-empty `files` parts of the form, rejecting unusable filenames.
pub(crate) async fn read_uploads(mut multipart: Multipart) -> Result<Vec<Upload>> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| Error::Validation {
        message: format!("Failed to parse multipart data: {}", e),
    })? {
        if field.name() != Some("files") {
            continue;
        }

        // Browsers send an empty part when nothing was chosen
        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        validate_filename(&filename)?;

        let content = field.bytes().await.map_err(|e| Error::Validation {
            message: format!("Failed to read file '{}': {}", filename, e),
        })?;
        uploads.push(Upload { filename, content });
    }

    if uploads.is_empty() {
        return Err(Error::Validation {
            message: "No files selected".to_string(),
        });
    }

    Ok(uploads)
}

/// Write the uploads' content, register them (in a new batch, or appended to `batch_id`), and
/// refresh the batch's share code.
///
/// Content goes to the store before the registry transaction opens, so the record store's write
/// lock is only held for the inserts. If anything fails after content was written, that content
/// is deleted again and no records remain.
pub(crate) async fn store_uploads(state: &AppState, batch_id: Option<BatchId>, uploads: Vec<Upload>) -> Result<Redirect> {
    let filenames: Vec<String> = uploads.iter().map(|u| u.filename.clone()).collect();
    let appending = batch_id.is_some();

    let batch_id = match batch_id {
        Some(batch_id) => {
            let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
            if !Batches::new(&mut conn).exists(batch_id).await? {
                return Err(batch_not_found(batch_id));
            }
            batch_id
        }
        None => new_batch_id(),
    };

    let mut written = Vec::with_capacity(uploads.len());
    let outcome = match write_content(state, batch_id, &uploads, &mut written).await {
        Ok(()) => register(state, batch_id, appending, &filenames).await,
        Err(e) => Err(e),
    };
    if let Err(e) = outcome {
        discard(state, &written).await;
        return Err(e);
    }

    state.share.publish(batch_id).await?;

    info!(%batch_id, files = uploads.len(), "Stored upload");
    Ok(Redirect::to(&format!("/sender/{batch_id}")))
}

async fn write_content(state: &AppState, batch_id: BatchId, uploads: &[Upload], written: &mut Vec<ContentKey>) -> Result<()> {
    for upload in uploads {
        let key = ContentKey::new(batch_id, &upload.filename)?;
        state.content.put(&key, &upload.content).await?;
        written.push(key);
    }
    Ok(())
}

async fn register(state: &AppState, batch_id: BatchId, appending: bool, filenames: &[String]) -> Result<()> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    {
        let mut repo = Batches::new(&mut tx);
        if appending {
            repo.append_to_batch(batch_id, filenames).await.map_err(|e| match e {
                DbError::NotFound => batch_not_found(batch_id),
                other => Error::Database(other),
            })?;
        } else {
            repo.create_batch(batch_id, filenames).await?;
        }
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(())
}

/// Remove content written for an upload that was not registered.
async fn discard(state: &AppState, keys: &[ContentKey]) {
    for key in keys {
        if let Err(e) = state.content.delete(key).await {
            warn!(%key, error = %e, "Failed to remove content of a rejected upload");
        }
    }
}

fn batch_not_found(batch_id: BatchId) -> Error {
    Error::NotFound {
        resource: "Batch".to_string(),
        id: batch_id.to_string(),
    }
}
