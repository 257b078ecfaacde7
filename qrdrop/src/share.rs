//! Batch identifiers, share links, and the QR codes that encode them.

use crate::config::ShareConfig;
use crate::types::BatchId;
use image::{ImageFormat, Luma};
use qrcode::QrCode;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ShareError {
    #[error("Failed to encode QR code: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("Failed to render QR image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to write QR image: {0}")]
    Io(#[from] std::io::Error),

    #[error("QR task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Generate a fresh batch id.
pub fn new_batch_id() -> BatchId {
    Uuid::new_v4()
}

/// Public link to a batch's download page.
pub fn receiver_url(public_url: &Url, batch_id: BatchId) -> String {
    format!("{}/receiver/{}", public_url.as_str().trim_end_matches('/'), batch_id)
}

/// Turns a link into image bytes.
pub trait CodeEncoder: Send + Sync {
    fn encode(&self, data: &str) -> Result<Vec<u8>, ShareError>;
}

/// Renders QR codes as grayscale PNG.
#[derive(Debug, Clone)]
pub struct QrPngEncoder {
    module_size: u32,
    quiet_zone: bool,
}

impl QrPngEncoder {
    pub fn new(module_size: u32, quiet_zone: bool) -> Self {
        Self { module_size, quiet_zone }
    }
}

impl From<&ShareConfig> for QrPngEncoder {
    fn from(config: &ShareConfig) -> Self {
        Self::new(config.module_size, config.quiet_zone)
    }
}

impl CodeEncoder for QrPngEncoder {
    fn encode(&self, data: &str) -> Result<Vec<u8>, ShareError> {
        let code = QrCode::new(data.as_bytes())?;
        let image = code
            .render::<Luma<u8>>()
            .module_dimensions(self.module_size, self.module_size)
            .quiet_zone(self.quiet_zone)
            .build();

        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png)?;
        Ok(png.into_inner())
    }
}

/// Builds share links and keeps each batch's QR image in the static directory.
#[derive(Clone)]
pub struct ShareCodes {
    public_url: Url,
    static_dir: PathBuf,
    encoder: Arc<dyn CodeEncoder>,
}

impl ShareCodes {
    pub fn new(public_url: Url, static_dir: PathBuf, encoder: Arc<dyn CodeEncoder>) -> Self {
        Self {
            public_url,
            static_dir,
            encoder,
        }
    }

    pub fn receiver_url(&self, batch_id: BatchId) -> String {
        receiver_url(&self.public_url, batch_id)
    }

    /// Where the batch's QR image is written.
    pub fn image_path(&self, batch_id: BatchId) -> PathBuf {
        self.static_dir.join(format!("{batch_id}.png"))
    }

    /// Path the QR image is served from.
    pub fn image_href(&self, batch_id: BatchId) -> String {
        format!("/static/{batch_id}.png")
    }

    /// Encode the batch's receiver link and (over)write its image.
    #[instrument(skip(self), err)]
    pub async fn publish(&self, batch_id: BatchId) -> Result<PathBuf, ShareError> {
        let link = self.receiver_url(batch_id);
        let encoder = Arc::clone(&self.encoder);
        let image = tokio::task::spawn_blocking(move || encoder.encode(&link)).await??;

        fs::create_dir_all(&self.static_dir).await?;
        let path = self.image_path(batch_id);
        fs::write(&path, image).await?;

        debug!(path = %path.display(), "Published share code");
        Ok(path)
    }
}
