//! HTTP handler for embedded page assets.

use axum::{
    extract::Path,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::static_assets::Assets;

/// Serve an embedded asset under `/assets/{*path}`
#[instrument]
pub async fn serve_embedded_asset(Path(path): Path<String>) -> Response {
    let Some(content) = Assets::get(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    (
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        content.data.into_owned(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, routing::get};
    use axum_test::TestServer;

    fn create_test_router() -> Router {
        Router::new().route("/assets/{*path}", get(serve_embedded_asset))
    }

    #[tokio::test]
    async fn test_serve_stylesheet() {
        let server = TestServer::new(create_test_router()).unwrap();

        let response = server.get("/assets/style.css").await;

        response.assert_status(StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").map(|v| v.to_str().unwrap()),
            Some("text/css")
        );
        assert_eq!(
            response.headers().get("cache-control").map(|v| v.to_str().unwrap()),
            Some("public, max-age=3600")
        );
        assert!(response.text().contains(".file-list"));
    }

    #[tokio::test]
    async fn test_missing_asset_is_not_found() {
        let server = TestServer::new(create_test_router()).unwrap();

        let response = server.get("/assets/missing.js").await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}
