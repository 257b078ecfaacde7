//! HTTP layer: route handlers and the request models they extract.
//!
//! - **Pages** (`/`, `/sender/{batch_id}`, `/receiver/{batch_id}`): HTML views
//! - **Uploads** (`/upload`, `/upload_additional/{batch_id}`): multipart intake, redirecting to the
//!   sender page
//! - **Downloads** (`/download/{filename}`, `/download_multiple`): one file as-is, or a zip
//!
//! OpenAPI documentation is served at `/docs` (raw document at `/openapi.json`).

pub mod handlers;
pub mod models;
