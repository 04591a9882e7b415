//! HTTP request handlers for the face match API.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /encode` - Encode the single face in an uploaded image
//! - `POST /compare` - Compare two encoded representations
//! - `POST /verify` - Verify a base64 image against a stored encoding
//! - `POST /detect` - Detect faces in an uploaded image

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::comparator::{self, ComparisonResult};
use crate::encoder;
use crate::engine::FaceEngine;
use crate::error::{CompareError, EncodeError, UploadError};
use crate::upload::{self, UploadConfig};

/// Human-readable service identity reported by `/health`.
pub const SERVICE_NAME: &str = "Face Match Service";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state, passed to all handlers via Axum's State
/// extractor.
///
/// Immutable after startup: the service holds no cross-request mutable
/// state.
pub struct AppState<E: FaceEngine> {
    /// The vision backend.
    pub engine: Arc<E>,

    /// Upload validation settings and transient file location.
    pub uploads: UploadConfig,

    /// Default match tolerance, used when the client does not supply one.
    pub tolerance: f64,
}

impl<E: FaceEngine> AppState<E> {
    pub fn new(engine: E, uploads: UploadConfig, tolerance: f64) -> Self {
        Self {
            engine: Arc::new(engine),
            uploads,
            tolerance,
        }
    }
}

impl<E: FaceEngine> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            uploads: self.uploads.clone(),
            tolerance: self.tolerance,
        }
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// JSON body for `POST /compare`.
///
/// Fields are optional so that missing keys produce the documented 400
/// message instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    #[serde(default)]
    pub encoding1: Option<String>,

    #[serde(default)]
    pub encoding2: Option<String>,

    /// Match tolerance override. Passed through unvalidated.
    #[serde(default)]
    pub tolerance: Option<f64>,
}

/// JSON body for `POST /verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub stored_encoding: Option<String>,

    /// Base64-encoded image. Typed as a JSON value so a non-string gets the
    /// documented "Invalid image format" 400 rather than a rejection.
    #[serde(default)]
    pub image: Option<serde_json::Value>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error body returned for all failure conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Success body for `POST /encode`.
#[derive(Debug, Serialize)]
pub struct EncodeResponse {
    pub success: bool,
    pub message: String,
    /// The Encoded Representation of the single detected face.
    pub encoding: String,
}

/// Success body for `POST /compare`.
#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub success: bool,
    pub result: ComparisonResult,
}

/// Success body for `POST /verify`.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub verified: bool,
    pub confidence: f64,
    pub distance: f64,
}

/// Success body for `POST /detect`.
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub success: bool,
    pub face_count: usize,
    pub faces_detected: bool,
    /// Bounding boxes as `[top, right, bottom, left]` pixel coordinates.
    pub face_locations: Vec<[u32; 4]>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Handler-boundary error: a status code plus the client-facing message.
///
/// Internal errors are translated here; anything unexpected collapses to a
/// generic 500 with the detail logged server-side only.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), "Server error: {}", self.message);
        } else {
            warn!(status = self.status.as_u16(), "Client error: {}", self.message);
        }

        let body = ErrorResponse {
            success: false,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Io(ref io_err) => {
                error!("Upload I/O failure: {}", io_err);
                ApiError::internal("Internal server error")
            }
            _ => ApiError::bad_request(err.to_string()),
        }
    }
}

impl From<EncodeError> for ApiError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::NoFaceDetected
            | EncodeError::MultipleFacesDetected
            | EncodeError::EncodingFailed
            | EncodeError::InvalidImage(_) => ApiError::bad_request(err.to_string()),
            EncodeError::Processing(ref detail) => {
                error!("Processing failure: {}", detail);
                ApiError::internal("Internal server error")
            }
        }
    }
}

impl From<CompareError> for ApiError {
    fn from(err: CompareError) -> Self {
        // Decode internals stay server-side; the client sees only a generic
        // comparison failure.
        error!("Comparison failure: {}", err);
        ApiError::internal("Error comparing faces")
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health` -> `200 OK` with `{status, service, version}`.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Encode the single face in an uploaded image.
///
/// # Endpoint
///
/// `POST /encode` with a multipart `image` field.
///
/// # Response
///
/// - `200 OK`: `{success: true, message, encoding}`
/// - `400 Bad Request`: missing/invalid file, no face, multiple faces, or
///   an undecodable image
/// - `500 Internal Server Error`: backend processing failure
pub async fn encode_handler<E: FaceEngine>(
    State(state): State<AppState<E>>,
    multipart: Multipart,
) -> Result<Json<EncodeResponse>, ApiError> {
    // The guard keeps the transient file alive for the encoder and removes
    // it on every exit path.
    let temp = upload::receive_multipart(multipart, &state.uploads).await?;
    let encoding =
        encoder::encode_file(Arc::clone(&state.engine), temp.path().to_path_buf()).await?;

    Ok(Json(EncodeResponse {
        success: true,
        message: "Face encoded successfully".to_string(),
        encoding,
    }))
}

/// Compare two encoded representations.
///
/// # Endpoint
///
/// `POST /compare` with JSON `{encoding1, encoding2, tolerance?}`.
///
/// # Response
///
/// - `200 OK`: `{success: true, result: {is_match, distance, confidence}}`
/// - `400 Bad Request`: either encoding missing
/// - `500 Internal Server Error`: undecodable encodings or shape mismatch
pub async fn compare_handler<E: FaceEngine>(
    State(state): State<AppState<E>>,
    Json(request): Json<CompareRequest>,
) -> Result<Json<CompareResponse>, ApiError> {
    let (Some(encoding1), Some(encoding2)) = (request.encoding1, request.encoding2) else {
        return Err(ApiError::bad_request("Both encodings are required"));
    };

    let tolerance = request.tolerance.unwrap_or(state.tolerance);
    let result = comparator::compare(&encoding1, &encoding2, tolerance)?;

    Ok(Json(CompareResponse {
        success: true,
        result,
    }))
}

/// Verify a live image against a stored encoding.
///
/// # Endpoint
///
/// `POST /verify` with JSON `{stored_encoding, image}` where `image` is a
/// base64 string.
///
/// # Response
///
/// - `200 OK`: `{success: true, verified, confidence, distance}`
/// - `400 Bad Request`: missing fields, non-string image, invalid base64,
///   or an encode policy violation on the new image
/// - `500 Internal Server Error`: backend or comparison failure
pub async fn verify_handler<E: FaceEngine>(
    State(state): State<AppState<E>>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let (Some(stored_encoding), Some(image)) = (request.stored_encoding, request.image) else {
        return Err(ApiError::bad_request("Stored encoding and image are required"));
    };
    let Some(image) = image.as_str() else {
        return Err(ApiError::bad_request("Invalid image format"));
    };

    let temp = upload::receive_base64(image, &state.uploads).await?;
    let fresh_encoding =
        encoder::encode_file(Arc::clone(&state.engine), temp.path().to_path_buf()).await?;

    // Verification always uses the configured default tolerance.
    let result = comparator::compare(&stored_encoding, &fresh_encoding, state.tolerance)?;

    Ok(Json(VerifyResponse {
        success: true,
        verified: result.is_match,
        confidence: result.confidence,
        distance: result.distance,
    }))
}

/// Detect faces in an uploaded image.
///
/// Zero faces is a success (`face_count: 0`), unlike `/encode`'s strict
/// single-face requirement.
///
/// # Endpoint
///
/// `POST /detect` with a multipart `image` field.
///
/// # Response
///
/// - `200 OK`: `{success: true, face_count, faces_detected, face_locations}`
/// - `400 Bad Request`: missing/invalid file or undecodable image
/// - `500 Internal Server Error`: backend processing failure
pub async fn detect_handler<E: FaceEngine>(
    State(state): State<AppState<E>>,
    multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    let temp = upload::receive_multipart(multipart, &state.uploads).await?;
    let locations =
        encoder::detect_file(Arc::clone(&state.engine), temp.path().to_path_buf()).await?;

    Ok(Json(DetectResponse {
        success: true,
        face_count: locations.len(),
        faces_detected: !locations.is_empty(),
        face_locations: locations.iter().map(|l| l.as_array()).collect(),
    }))
}

// =============================================================================
// Tests
// =============================================================================
