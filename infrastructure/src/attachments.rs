//! Local file attachments
//!
//! Reads files named on the command line into base64 [`FileAttachment`]s
//! with a MIME type guessed from the extension.

use consensus_domain::FileAttachment;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Inline payload limit of the backend
pub const MAX_ATTACHMENT_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is {size} bytes; inline attachments are limited to {MAX_ATTACHMENT_BYTES}")]
    TooLarge { path: String, size: u64 },
}

pub async fn load_attachment(path: &Path) -> Result<FileAttachment, AttachmentError> {
    let display = path.display().to_string();
    let read_error = |source| AttachmentError::Read {
        path: display.clone(),
        source,
    };

    let size = tokio::fs::metadata(path).await.map_err(read_error)?.len();
    if size > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentError::TooLarge {
            path: display.clone(),
            size,
        });
    }
    let bytes = tokio::fs::read(path).await.map_err(read_error)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| display.clone());
    let mime_type = FileAttachment::mime_for_path(&name);
    debug!("Attached {} ({}, {} bytes)", name, mime_type, bytes.len());
    Ok(FileAttachment::from_bytes(name, mime_type, &bytes))
}

pub async fn load_attachments(paths: &[impl AsRef<Path>]) -> Result<Vec<FileAttachment>, AttachmentError> {
    let mut attachments = Vec::with_capacity(paths.len());
    for path in paths {
        attachments.push(load_attachment(path.as_ref()).await?);
    }
    Ok(attachments)
}
