//! HTML views. An unknown batch id renders an empty file list rather than an error.

use crate::AppState;
use crate::db::handlers::Batches;
use crate::errors::{Error, Result};
use crate::types::BatchId;
use axum::{
    extract::{Path, State},
    response::Html,
};
use minijinja::context;
use tracing::instrument;

#[instrument(skip_all, err)]
pub async fn index(State(state): State<AppState>) -> Result<Html<String>> {
    Ok(Html(state.templates.render("index.html", context! {})?))
}

#[utoipa::path(
    get,
    path = "/sender/{batch_id}",
    tag = "pages",
    summary = "Sender page",
    description = "List the batch's files with its share link and QR code.",
    params(("batch_id" = uuid::Uuid, Path, description = "Batch to show")),
    responses((status = 200, description = "HTML page"))
)]
#[instrument(skip(state), err)]
pub async fn sender_view(State(state): State<AppState>, Path(batch_id): Path<BatchId>) -> Result<Html<String>> {
    let files = list_files(&state, batch_id).await?;

    let html = state.templates.render(
        "sender.html",
        context! {
            batch_id => batch_id.to_string(),
            files => files,
            share_url => state.share.receiver_url(batch_id),
            qr_src => state.share.image_href(batch_id),
        },
    )?;
    Ok(Html(html))
}

#[utoipa::path(
    get,
    path = "/receiver/{batch_id}",
    tag = "pages",
    summary = "Receiver page",
    description = "List the batch's files with checkboxes for downloading one or several.",
    params(("batch_id" = uuid::Uuid, Path, description = "Batch to show")),
    responses((status = 200, description = "HTML page"))
)]
#[instrument(skip(state), err)]
pub async fn receiver_view(State(state): State<AppState>, Path(batch_id): Path<BatchId>) -> Result<Html<String>> {
    let files = list_files(&state, batch_id).await?;

    let html = state.templates.render(
        "receiver.html",
        context! {
            batch_id => batch_id.to_string(),
            files => files,
        },
    )?;
    Ok(Html(html))
}

async fn list_files(state: &AppState, batch_id: BatchId) -> Result<Vec<String>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Ok(Batches::new(&mut conn).list_files(batch_id).await?)
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{create_test_app, upload_form};
    use axum::http::StatusCode;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    #[sqlx::test]
    async fn test_index_has_upload_form(pool: SqlitePool) {
        let (server, _state, _dir) = create_test_app(pool).await;

        let response = server.get("/").await;

        response.assert_status_ok();
        let html = response.text();
        assert!(html.contains("multipart/form-data"));
        assert!(html.contains("name=\"files\""));
    }

    #[sqlx::test]
    async fn test_sender_and_receiver_pages_list_files(pool: SqlitePool) {
        let (server, _state, _dir) = create_test_app(pool).await;
        let response = server
            .post("/upload")
            .multipart(upload_form(&[("a.txt", b"alpha".as_slice()), ("b.txt", b"bravo".as_slice())]))
            .await;
        let location = response.header("location").to_str().unwrap().to_string();
        let batch_id = location.trim_start_matches("/sender/").to_string();

        let sender = server.get(&location).await;
        sender.assert_status_ok();
        let html = sender.text();
        assert!(html.contains("a.txt") && html.contains("b.txt"));
        assert!(html.contains(&format!("{batch_id}.png")));

        let receiver = server.get(&format!("/receiver/{batch_id}")).await;
        receiver.assert_status_ok();
        let html = receiver.text();
        assert_eq!(html.matches("type=\"checkbox\" name=\"file\"").count(), 2);

        // The share code is served from the static directory
        let qr = server.get(&format!("/static/{batch_id}.png")).await;
        qr.assert_status_ok();
        assert!(image::load_from_memory(qr.as_bytes()).is_ok());
    }

    #[sqlx::test]
    async fn test_unknown_batch_renders_empty_list(pool: SqlitePool) {
        let (server, _state, _dir) = create_test_app(pool).await;

        let response = server.get(&format!("/receiver/{}", Uuid::new_v4())).await;

        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("There are no files in this batch."));
    }

    #[sqlx::test]
    async fn test_malformed_batch_id_is_rejected(pool: SqlitePool) {
        let (server, _state, _dir) = create_test_app(pool).await;

        let response = server.get("/sender/not-a-uuid").await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
