//! OpenAPI document for the upload, download, and page endpoints.

use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "qrdrop",
        description = "Upload a batch of files, share it by link or QR code, and download any selection of it."
    ),
    paths(
        api::handlers::uploads::upload_files,
        api::handlers::uploads::upload_additional,
        api::handlers::downloads::download_file,
        api::handlers::downloads::download_multiple,
        api::handlers::pages::sender_view,
        api::handlers::pages::receiver_view,
    ),
    tags(
        (name = "uploads", description = "Create batches and add files to them"),
        (name = "downloads", description = "Fetch one file, or a zip of several"),
        (name = "pages", description = "HTML views for senders and recipients"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_endpoint() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/upload",
            "/upload_additional/{batch_id}",
            "/download/{filename}",
            "/download_multiple",
            "/sender/{batch_id}",
            "/receiver/{batch_id}",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }
}
