//! Archive assembler: packs a selection of a batch's files into one zip, or hands a single file
//! back untouched.
//!
//! Selected names that are missing from the content store are skipped rather than failing the
//! whole download. The archive is built in memory; zip compression runs on the blocking pool.

use crate::storage::{ContentKey, ContentStore, StorageError};
use crate::types::BatchId;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use thiserror::Error;
use tracing::{debug, info, instrument};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

#[derive(Error, Debug)]
pub enum PackagingError {
    #[error("failed to read {filename}: {source}")]
    Read {
        filename: String,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("archive task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// An assembled zip archive.
#[derive(Debug)]
pub struct Archive {
    pub bytes: Vec<u8>,
    /// Entry names, in the order they were written
    pub entries: Vec<String>,
    /// Requested names that had no stored content
    pub skipped: Vec<String>,
}

/// One file returned as-is, for direct download.
#[derive(Debug)]
pub struct SingleFile {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

struct Entry {
    name: String,
    content: Vec<u8>,
}

/// Attachment name for a batch's archive.
pub fn archive_name(batch_id: BatchId) -> String {
    format!("files_{batch_id}.zip")
}

/// Zip the requested files of `batch_id`, in the order given.
///
/// Names repeated in `filenames` produce a single entry. Names with no stored content (including
/// names that could never be stored) are skipped.
#[instrument(skip(store, filenames), fields(requested = filenames.len()), err)]
pub async fn package(store: &dyn ContentStore, batch_id: BatchId, filenames: &[String]) -> Result<Archive, PackagingError> {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(filenames.len());
    let mut skipped = Vec::new();

    for filename in filenames {
        if !seen.insert(filename.as_str()) {
            continue;
        }

        let key = match ContentKey::new(batch_id, filename) {
            Ok(key) => key,
            Err(e) => {
                debug!(filename = %filename, error = %e, "Skipping unusable filename");
                skipped.push(filename.clone());
                continue;
            }
        };

        match store.get(&key).await {
            Ok(content) => entries.push(Entry {
                name: filename.clone(),
                content,
            }),
            Err(StorageError::NotFound { .. }) => {
                debug!(%key, "Skipping file missing from content store");
                skipped.push(filename.clone());
            }
            Err(source) => {
                return Err(PackagingError::Read {
                    filename: filename.clone(),
                    source,
                });
            }
        }
    }

    let names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
    let bytes = tokio::task::spawn_blocking(move || write_zip(&entries)).await??;

    info!(
        entries = names.len(),
        skipped = skipped.len(),
        bytes = bytes.len(),
        "Assembled archive"
    );

    Ok(Archive {
        bytes,
        entries: names,
        skipped,
    })
}

/// Fetch one file for direct download. The bytes are exactly what [`package`] would put in the
/// entry of the same name.
///
/// A name that could never have been stored is reported as [`StorageError::NotFound`], the same
/// way [`package`] skips it.
#[instrument(skip(store), err)]
pub async fn single(store: &dyn ContentStore, batch_id: BatchId, filename: &str) -> Result<SingleFile, StorageError> {
    let key = ContentKey::new(batch_id, filename).map_err(|e| match e {
        StorageError::InvalidName { name, .. } => StorageError::NotFound {
            key: format!("{batch_id}/{name}"),
        },
        other => other,
    })?;
    let content = store.get(&key).await?;

    Ok(SingleFile {
        filename: filename.to_string(),
        content_type: mime_guess::from_path(filename).first_or_octet_stream().to_string(),
        content,
    })
}

fn write_zip(entries: &[Entry]) -> Result<Vec<u8>, PackagingError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for entry in entries {
        writer.start_file(entry.name.as_str(), options)?;
        writer.write_all(&entry.content)?;
    }

    Ok(writer.finish()?.into_inner())
}
