//! Test utilities for integration tests.
//!
//! This module provides a mock face engine and helpers for building
//! multipart/JSON requests against the router.

use std::io::Cursor;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use image::{ImageFormat, Rgb, RgbImage};

use facematch::engine::{Embedding, FaceEngine, FaceLocation};
use facematch::error::EngineError;
use facematch::server::{create_router, RouterConfig};

/// Fixed multipart boundary used by all test requests.
pub const BOUNDARY: &str = "facematch-test-boundary";

// =============================================================================
// Mock Face Engine
// =============================================================================

/// A mock engine returning pre-configured detections and embeddings.
pub struct MockFaceEngine {
    faces: Vec<FaceLocation>,
    embeddings: Vec<Embedding>,
    fail: bool,
}

impl MockFaceEngine {
    /// An engine that finds no faces.
    pub fn empty() -> Self {
        Self {
            faces: Vec::new(),
            embeddings: Vec::new(),
            fail: false,
        }
    }

    /// An engine that finds exactly one face with the given embedding.
    pub fn single_face(embedding: Vec<f32>) -> Self {
        Self {
            faces: vec![FaceLocation::new(10, 90, 80, 20)],
            embeddings: vec![Embedding::new(embedding)],
            fail: false,
        }
    }

    /// An engine that finds the given faces (no embeddings).
    pub fn with_faces(faces: Vec<FaceLocation>) -> Self {
        Self {
            faces,
            embeddings: Vec::new(),
            fail: false,
        }
    }

    /// An engine whose detection always fails.
    pub fn failing() -> Self {
        Self {
            faces: Vec::new(),
            embeddings: Vec::new(),
            fail: true,
        }
    }
}

impl FaceEngine for MockFaceEngine {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<FaceLocation>, EngineError> {
        if self.fail {
            return Err(EngineError::Inference("mock detection failure".to_string()));
        }
        Ok(self.faces.clone())
    }

    fn embed(
        &self,
        _image: &RgbImage,
        _faces: &[FaceLocation],
    ) -> Result<Vec<Embedding>, EngineError> {
        if self.fail {
            return Err(EngineError::Inference("mock embedding failure".to_string()));
        }
        Ok(self.embeddings.clone())
    }
}

// =============================================================================
// Router Construction
// =============================================================================

/// Build a router over the mock engine with test-friendly settings.
pub fn test_router(engine: MockFaceEngine) -> Router {
    create_router(
        engine,
        RouterConfig::new()
            .with_upload_dir(std::env::temp_dir().join("facematch-integration-tests"))
            .with_tracing(false),
    )
}

/// Build a router with a small upload limit for size-rejection tests.
pub fn test_router_with_limit(engine: MockFaceEngine, max_upload_bytes: u64) -> Router {
    create_router(
        engine,
        RouterConfig::new()
            .with_upload_dir(std::env::temp_dir().join("facematch-integration-tests"))
            .with_max_upload_bytes(max_upload_bytes)
            .with_tracing(false),
    )
}

// =============================================================================
// Request Builders
// =============================================================================

/// A small but fully valid PNG image.
pub fn tiny_png() -> Vec<u8> {
    let image = RgbImage::from_pixel(16, 16, Rgb([180, 150, 120]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encoding a test PNG cannot fail");
    bytes.into_inner()
}

/// Build a multipart body with a single file field.
pub fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Build a multipart POST request where a plain text field precedes the
/// file field.
pub fn multipart_request_with_leading_field(
    uri: &str,
    field: &str,
    filename: &str,
    data: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"note\"\r\n\r\n");
    body.extend_from_slice(b"profile photo\r\n");
    body.extend_from_slice(&multipart_body(field, filename, data));

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Build a multipart POST request with a single file field.
pub fn multipart_request(uri: &str, field: &str, filename: &str, data: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, filename, data)))
        .unwrap()
}

/// Build a JSON POST request.
pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Collect a response into its status code and parsed JSON body.
pub async fn body_json(response: Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("response body is not JSON ({e}): {bytes:?}"));
    (status, json)
}
