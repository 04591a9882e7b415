//! Upload/decode adapter.
//!
//! Accepts an image either as a multipart `image` field or as a base64
//! string, validates it, and materializes it to a transient file for the
//! encoder. Every transient file gets a unique uuid-based name so concurrent
//! requests can never race on the same path, and removal is guaranteed on
//! every exit path by the [`TempImage`] guard.

use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::UploadError;

/// Allowed image filename extensions, matched case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Multipart field name carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Settings for accepting uploads.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory for transient image files.
    pub dir: PathBuf,

    /// Maximum accepted payload size in bytes.
    pub max_bytes: u64,
}

/// Check whether a filename carries an allowed image extension.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

/// A transient image file, removed when the guard drops.
///
/// Scoped-resource contract: the file never outlives the request, no matter
/// which branch returns.
#[derive(Debug)]
pub struct TempImage {
    path: PathBuf,
}

impl TempImage {
    /// Write `data` to a fresh uniquely-named file under the upload dir.
    pub async fn write(config: &UploadConfig, extension: &str, data: Bytes) -> Result<Self, UploadError> {
        tokio::fs::create_dir_all(&config.dir).await?;

        let path = config
            .dir
            .join(format!("{}.{}", Uuid::new_v4(), extension.to_ascii_lowercase()));
        tokio::fs::write(&path, &data).await?;

        debug!(path = %path.display(), bytes = data.len(), "materialized transient image");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), "failed to remove transient image: {}", err);
        }
    }
}

/// Receive an image from a multipart request.
///
/// Looks for the `image` field, validates filename and size, and writes the
/// bytes to a transient file.
pub async fn receive_multipart(
    mut multipart: Multipart,
    config: &UploadConfig,
) -> Result<TempImage, UploadError> {
    // Each field borrows the multipart stream, so it has to be drained to
    // owned data before the next `next_field` call.
    let mut image_part: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| UploadError::Multipart(e.to_string()))?;
        image_part = Some((filename, data));
        break;
    }
    let (filename, data) = image_part.ok_or(UploadError::MissingImage)?;

    if filename.is_empty() {
        return Err(UploadError::EmptyFilename);
    }
    if !allowed_file(&filename) {
        return Err(UploadError::InvalidExtension);
    }
    check_size(data.len(), config)?;

    // allowed_file() guarantees the extension exists.
    let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("jpg");
    TempImage::write(config, extension, data).await
}

/// Receive an image from a base64 string (the `/verify` path).
///
/// The decoded bytes are assumed to be JPEG; the image decoder sniffs the
/// real format from the content, so the extension is advisory only.
pub async fn receive_base64(data: &str, config: &UploadConfig) -> Result<TempImage, UploadError> {
    let bytes = BASE64_STANDARD
        .decode(data.trim())
        .map_err(|_| UploadError::InvalidBase64)?;
    check_size(bytes.len(), config)?;

    TempImage::write(config, "jpg", Bytes::from(bytes)).await
}

fn check_size(len: usize, config: &UploadConfig) -> Result<(), UploadError> {
    if len as u64 > config.max_bytes {
        return Err(UploadError::TooLarge {
            limit: config.max_bytes,
        });
    }
    Ok(())
}
