use thiserror::Error;

/// Errors raised while accepting an uploaded image.
///
/// Every variant except `Io` is a client error (HTTP 400). The messages are
/// part of the API contract and are returned to the caller verbatim.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request carried no `image` field.
    #[error("No image file provided")]
    MissingImage,

    /// The multipart field had an empty filename.
    #[error("No file selected")]
    EmptyFilename,

    /// Filename extension is not one of png/jpg/jpeg.
    #[error("Invalid file type. Only PNG, JPG, JPEG are allowed")]
    InvalidExtension,

    /// Payload exceeds the configured size limit.
    #[error("Image exceeds the maximum allowed size of {limit} bytes")]
    TooLarge { limit: u64 },

    /// Base64 image field did not decode.
    #[error("Invalid base64 image data")]
    InvalidBase64,

    /// Malformed multipart stream (bad boundary, truncated body, body over
    /// the transport limit).
    #[error("Malformed upload: {0}")]
    Multipart(String),

    /// Failed to materialize the transient image file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the face engine (model loading and inference).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Model file missing at the configured path.
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    /// Inference failed inside the vision backend.
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Errors from the face encoder.
///
/// The first three variants are domain policy violations returned to the
/// caller with their message (HTTP 400). `InvalidImage` covers undecodable
/// uploads (also 400). `Processing` is an unexpected backend failure and is
/// collapsed to a generic 500 at the handler boundary.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// No face found in the image.
    #[error("No face detected in the image")]
    NoFaceDetected,

    /// More than one face found. Single-subject enrollment policy: the
    /// caller must provide an image with exactly one face even though the
    /// backend could return every embedding.
    #[error("Multiple faces detected. Please provide an image with only one face")]
    MultipleFacesDetected,

    /// Exactly one face was detected but embedding extraction produced
    /// nothing.
    #[error("Could not encode face")]
    EncodingFailed,

    /// The uploaded bytes did not decode as an image.
    #[error("Could not read image: {0}")]
    InvalidImage(String),

    /// Unexpected failure in the detection or embedding step.
    #[error("Error processing image: {0}")]
    Processing(String),
}

impl From<EngineError> for EncodeError {
    fn from(err: EngineError) -> Self {
        EncodeError::Processing(err.to_string())
    }
}

/// Errors from the face comparator.
///
/// All variants surface to the client as a generic comparison failure
/// (HTTP 500); decode internals are never leaked.
#[derive(Debug, Error)]
pub enum CompareError {
    /// An encoded representation was not valid base64 or did not
    /// deserialize to an embedding vector.
    #[error("Invalid encoding: {0}")]
    Decode(String),

    /// The two embeddings have different dimensionality.
    #[error("Embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}
