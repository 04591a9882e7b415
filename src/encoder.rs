//! Face encoder.
//!
//! Wraps the engine's detect+embed calls, enforces the exactly-one-face
//! policy, and owns the embedding wire codec: an embedding travels as the
//! base64 of its raw little-endian f32 bytes, so decode reconstructs the
//! vector bit-for-bit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use image::{ImageReader, RgbImage};
use tracing::debug;

use crate::engine::{Embedding, FaceEngine, FaceLocation};
use crate::error::{CompareError, EncodeError};

// =============================================================================
// Embedding Codec
// =============================================================================

/// Serialize an embedding into its transportable representation.
pub fn encode_embedding(embedding: &Embedding) -> String {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in &embedding.values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    BASE64_STANDARD.encode(bytes)
}

/// Deserialize a transportable representation back into an embedding.
///
/// Any vector length is accepted here; dimensional agreement between two
/// embeddings is checked at compare time.
pub fn decode_embedding(encoded: &str) -> Result<Embedding, CompareError> {
    let bytes = BASE64_STANDARD
        .decode(encoded.trim())
        .map_err(|e| CompareError::Decode(e.to_string()))?;

    if bytes.is_empty() {
        return Err(CompareError::Decode("empty embedding payload".to_string()));
    }
    if bytes.len() % 4 != 0 {
        return Err(CompareError::Decode(format!(
            "payload length {} is not a whole number of f32 values",
            bytes.len()
        )));
    }

    let values = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(Embedding::new(values))
}

// =============================================================================
// Encoding Pipeline
// =============================================================================

/// Encode the single face in the image at `path`.
///
/// Runs on the blocking pool; detection and embedding are CPU-bound.
pub async fn encode_file<E: FaceEngine>(
    engine: Arc<E>,
    path: PathBuf,
) -> Result<String, EncodeError> {
    tokio::task::spawn_blocking(move || encode_blocking(engine.as_ref(), &path))
        .await
        .map_err(|e| EncodeError::Processing(format!("blocking task failed: {e}")))?
}

/// Detect all faces in the image at `path`. No single-face policy applies.
pub async fn detect_file<E: FaceEngine>(
    engine: Arc<E>,
    path: PathBuf,
) -> Result<Vec<FaceLocation>, EncodeError> {
    tokio::task::spawn_blocking(move || {
        let image = load_image(&path)?;
        Ok(engine.detect(&image)?)
    })
    .await
    .map_err(|e| EncodeError::Processing(format!("blocking task failed: {e}")))?
}

fn encode_blocking<E: FaceEngine + ?Sized>(engine: &E, path: &Path) -> Result<String, EncodeError> {
    let image = load_image(path)?;
    let faces = engine.detect(&image)?;
    debug!(faces = faces.len(), path = %path.display(), "detection complete");

    match faces.len() {
        0 => Err(EncodeError::NoFaceDetected),
        1 => {
            let embeddings = engine.embed(&image, &faces)?;
            let embedding = embeddings
                .into_iter()
                .next()
                .ok_or(EncodeError::EncodingFailed)?;
            if embedding.is_empty() {
                return Err(EncodeError::EncodingFailed);
            }
            Ok(encode_embedding(&embedding))
        }
        _ => Err(EncodeError::MultipleFacesDetected),
    }
}

/// Decode the image by sniffing its content, not trusting the extension.
///
/// Base64 uploads land on disk with an advisory `.jpg` name even when the
/// payload is a PNG, so the decoder must be chosen from the magic bytes.
fn load_image(path: &Path) -> Result<RgbImage, EncodeError> {
    ImageReader::open(path)
        .map_err(|e| EncodeError::InvalidImage(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| EncodeError::InvalidImage(e.to_string()))?
        .decode()
        .map(|img| img.to_rgb8())
        .map_err(|e| EncodeError::InvalidImage(e.to_string()))
}

// =============================================================================
// Tests
// =============================================================================
