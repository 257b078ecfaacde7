use crate::errors::Error;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

/// Query parameters for single-file download.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// Batch the file belongs to
    pub batch_id: Option<Uuid>,
}

/// Query parameters for multi-file download: `batch_id` plus one `file` per selected name.
///
/// Parsed by hand because the `file` key repeats.
#[derive(Debug, PartialEq, Eq, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MultiDownloadQuery {
    /// Batch the files belong to
    pub batch_id: Uuid,
    /// Selected filenames, in request order
    pub file: Vec<String>,
}

impl MultiDownloadQuery {
    pub fn parse(raw: Option<&str>) -> Result<Self, Error> {
        let mut batch_id = None;
        let mut files = Vec::new();

        for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "batch_id" => batch_id = Some(value.into_owned()),
                "file" => files.push(value.into_owned()),
                _ => {}
            }
        }

        if files.is_empty() {
            return Err(Error::Validation {
                message: "No files selected".to_string(),
            });
        }

        let batch_id = batch_id.ok_or_else(|| Error::Validation {
            message: "Missing required query parameter: batch_id".to_string(),
        })?;
        let batch_id = Uuid::parse_str(&batch_id).map_err(|_| Error::Validation {
            message: format!("Invalid batch_id: {batch_id}"),
        })?;

        Ok(Self { batch_id, file: files })
    }
}
