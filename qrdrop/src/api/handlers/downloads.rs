use crate::AppState;
use crate::api::models::downloads::{DownloadQuery, MultiDownloadQuery};
use crate::archive;
use crate::errors::{Error, Result};
use axum::{
    extract::{Path, Query, RawQuery, State},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::instrument;

#[utoipa::path(
    get,
    path = "/download/{filename}",
    tag = "downloads",
    summary = "Download one file",
    description = "Return the stored content of one file of a batch as an attachment.",
    params(
        ("filename" = String, Path, description = "Name of the file within the batch"),
        DownloadQuery
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 400, description = "Missing or invalid batch_id"),
        (status = 404, description = "File not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[instrument(skip(state), err)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response> {
    let batch_id = query.batch_id.ok_or_else(|| Error::Validation {
        message: "Missing required query parameter: batch_id".to_string(),
    })?;

    let file = archive::single(state.content.as_ref(), batch_id, &filename).await?;

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type),
            (header::CONTENT_DISPOSITION, content_disposition(&file.filename)),
        ],
        file.content,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/download_multiple",
    tag = "downloads",
    summary = "Download several files as a zip",
    description = "Zip the selected files of a batch, in the order given. Selected names with no stored content are left out.",
    params(MultiDownloadQuery),
    responses(
        (status = 200, description = "Zip archive"),
        (status = 400, description = "No files selected, or missing/invalid batch_id"),
        (status = 500, description = "Error creating zip file")
    )
)]
#[instrument(skip(state), err)]
pub async fn download_multiple(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Response> {
    let query = MultiDownloadQuery::parse(raw.as_deref())?;

    let zip = archive::package(state.content.as_ref(), query.batch_id, &query.file).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&archive::archive_name(query.batch_id)),
            ),
        ],
        zip.bytes,
    )
        .into_response())
}

/// `attachment` disposition carrying an ASCII fallback name and the exact UTF-8 name (RFC 6266).
pub(crate) fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();
    let encoded = url::form_urlencoded::byte_serialize(filename.as_bytes())
        .collect::<String>()
        .replace('+', "%20");

    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
