//! # Facematch
//!
//! A stateless HTTP service for face encoding, comparison, and verification.
//!
//! This library turns face images into compact encoded representations and
//! compares those representations by Euclidean distance. All state lives in
//! the encodings the clients hold; the service itself stores nothing between
//! requests.
//!
//! ## Features
//!
//! - **Encoding**: Detect the single face in an image and return a
//!   transportable base64 encoding of its embedding
//! - **Comparison**: Compare two encodings with a tunable match tolerance
//! - **Verification**: Check a live base64 image against a stored encoding
//! - **Detection**: Locate all faces in an image with bounding boxes
//! - **ONNX backend**: SCRFD detection and ArcFace embeddings via `ort`
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`engine`] - The face detection/embedding seam and its ONNX backend
//! - [`upload`] - Multipart/base64 intake and transient file handling
//! - [`encoder`] - Single-face policy and the embedding wire codec
//! - [`comparator`] - Distance, match decision, and confidence
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use facematch::engine::OnnxFaceEngine;
//! use facematch::server::{create_router, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = OnnxFaceEngine::load("models/det_10g.onnx", "models/w600k_r50.onnx")?;
//!     let router = create_router(engine, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod comparator;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod server;
pub mod upload;

// Re-export commonly used types
pub use comparator::{compare, ComparisonResult, DEFAULT_TOLERANCE};
pub use config::Config;
pub use encoder::{decode_embedding, detect_file, encode_embedding, encode_file};
pub use engine::{Embedding, FaceEngine, FaceLocation};
#[cfg(feature = "onnx")]
pub use engine::OnnxFaceEngine;
pub use error::{CompareError, EncodeError, EngineError, UploadError};
pub use server::{
    create_router, ApiError, AppState, CompareRequest, CompareResponse, DetectResponse,
    EncodeResponse, ErrorResponse, HealthResponse, RouterConfig, VerifyRequest, VerifyResponse,
};
pub use upload::{allowed_file, TempImage, UploadConfig, ALLOWED_EXTENSIONS};
