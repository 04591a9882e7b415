//! API integration tests for the five endpoints.
//!
//! Tests verify:
//! - Success bodies and status codes for encode/compare/verify/detect
//! - The single-face policy on /encode
//! - Upload validation (missing field, bad extension, size limit)
//! - Error message contracts and error hiding on comparison failures

use axum::http::StatusCode;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde_json::json;
use tower::ServiceExt;

use facematch::encoder::{decode_embedding, encode_embedding};
use facematch::engine::{Embedding, FaceLocation};

use super::test_utils::{
    body_json, json_request, multipart_request, multipart_request_with_leading_field, test_router,
    test_router_with_limit, tiny_png, MockFaceEngine,
};

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_reports_service_identity() {
    let router = test_router(MockFaceEngine::empty());

    let request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "Face Match Service");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// Encode
// =============================================================================

#[tokio::test]
async fn test_encode_success_round_trips_embedding() {
    let embedding = vec![0.25_f32, -0.5, 0.75, 0.125];
    let router = test_router(MockFaceEngine::single_face(embedding.clone()));

    let request = multipart_request("/encode", "image", "face.png", &tiny_png());
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Face encoded successfully");

    let encoding = body["encoding"].as_str().unwrap();
    assert!(!encoding.is_empty());
    assert_eq!(
        decode_embedding(encoding).unwrap(),
        Embedding::new(embedding)
    );
}

#[tokio::test]
async fn test_encode_finds_image_field_after_other_fields() {
    let embedding = vec![0.5_f32, -0.25];
    let router = test_router(MockFaceEngine::single_face(embedding.clone()));

    // The image field is not first; earlier fields must be skipped over.
    let request = multipart_request_with_leading_field("/encode", "image", "face.png", &tiny_png());
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        decode_embedding(body["encoding"].as_str().unwrap()).unwrap(),
        Embedding::new(embedding)
    );
}

#[tokio::test]
async fn test_encode_no_face_rejected() {
    let router = test_router(MockFaceEngine::empty());

    let request = multipart_request("/encode", "image", "face.jpg", &tiny_png());
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "No face detected in the image");
}

#[tokio::test]
async fn test_encode_multiple_faces_rejected() {
    let router = test_router(MockFaceEngine::with_faces(vec![
        FaceLocation::new(0, 8, 8, 0),
        FaceLocation::new(8, 16, 16, 8),
    ]));

    let request = multipart_request("/encode", "image", "group.png", &tiny_png());
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Multiple faces detected. Please provide an image with only one face"
    );
}

#[tokio::test]
async fn test_encode_missing_image_field_rejected() {
    let router = test_router(MockFaceEngine::single_face(vec![1.0]));

    // Wrong field name: no "image" field present.
    let request = multipart_request("/encode", "photo", "face.png", &tiny_png());
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No image file provided");
}

#[tokio::test]
async fn test_encode_empty_filename_rejected() {
    let router = test_router(MockFaceEngine::single_face(vec![1.0]));

    let request = multipart_request("/encode", "image", "", &tiny_png());
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No file selected");
}

#[tokio::test]
async fn test_encode_disallowed_extension_rejected() {
    let router = test_router(MockFaceEngine::single_face(vec![1.0]));

    let request = multipart_request("/encode", "image", "face.gif", &tiny_png());
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Invalid file type. Only PNG, JPG, JPEG are allowed"
    );
}

#[tokio::test]
async fn test_encode_corrupt_image_rejected() {
    let router = test_router(MockFaceEngine::single_face(vec![1.0]));

    // Valid extension, invalid content.
    let request = multipart_request("/encode", "image", "face.jpg", b"not an image at all");
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Could not read image"));
}

#[tokio::test]
async fn test_encode_oversize_upload_rejected() {
    let router = test_router_with_limit(MockFaceEngine::single_face(vec![1.0]), 64);

    let request = multipart_request("/encode", "image", "face.png", &tiny_png());
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Image exceeds the maximum allowed size of 64 bytes"
    );
}

#[tokio::test]
async fn test_encode_backend_failure_is_generic_500() {
    let router = test_router(MockFaceEngine::failing());

    let request = multipart_request("/encode", "image", "face.png", &tiny_png());
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    // Backend detail never leaks to the client.
    assert_eq!(body["message"], "Internal server error");
}

// =============================================================================
// Compare
// =============================================================================

fn encoded(values: Vec<f32>) -> String {
    encode_embedding(&Embedding::new(values))
}

#[tokio::test]
async fn test_compare_identical_encodings_match() {
    let router = test_router(MockFaceEngine::empty());
    let encoding = encoded(vec![0.1, 0.2, 0.3, 0.4]);

    let request = json_request(
        "/compare",
        json!({"encoding1": encoding, "encoding2": encoding}),
    );
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["is_match"], true);
    assert_eq!(body["result"]["distance"], 0.0);
    assert_eq!(body["result"]["confidence"], 100.0);
}

#[tokio::test]
async fn test_compare_missing_encoding_rejected() {
    let router = test_router(MockFaceEngine::empty());

    let request = json_request("/compare", json!({"encoding1": encoded(vec![1.0])}));
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Both encodings are required");
}

#[tokio::test]
async fn test_compare_invalid_encoding_is_hidden_500() {
    let router = test_router(MockFaceEngine::empty());

    let request = json_request(
        "/compare",
        json!({"encoding1": "@@garbage@@", "encoding2": encoded(vec![1.0])}),
    );
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error comparing faces");
}

#[tokio::test]
async fn test_compare_dimension_mismatch_is_hidden_500() {
    let router = test_router(MockFaceEngine::empty());

    let request = json_request(
        "/compare",
        json!({"encoding1": encoded(vec![1.0, 2.0]), "encoding2": encoded(vec![1.0, 2.0, 3.0])}),
    );
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error comparing faces");
}

#[tokio::test]
async fn test_compare_tolerance_override() {
    let router = test_router(MockFaceEngine::empty());
    let a = encoded(vec![0.0, 0.0, 0.0, 0.0]);
    let b = encoded(vec![0.5, 0.0, 0.0, 0.0]);

    // Distance 0.5 fails a 0.3 tolerance but passes a 0.8 tolerance.
    let request = json_request(
        "/compare",
        json!({"encoding1": &a, "encoding2": &b, "tolerance": 0.3}),
    );
    let response = router.clone().oneshot(request).await.unwrap();
    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["is_match"], false);

    let request = json_request(
        "/compare",
        json!({"encoding1": &a, "encoding2": &b, "tolerance": 0.8}),
    );
    let response = router.oneshot(request).await.unwrap();
    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["is_match"], true);
}

// =============================================================================
// Verify
// =============================================================================

#[tokio::test]
async fn test_verify_matching_face() {
    let embedding = vec![0.3_f32, -0.1, 0.2];
    let router = test_router(MockFaceEngine::single_face(embedding.clone()));

    let request = json_request(
        "/verify",
        json!({
            "stored_encoding": encoded(embedding),
            "image": BASE64_STANDARD.encode(tiny_png()),
        }),
    );
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["verified"], true);
    assert_eq!(body["distance"], 0.0);
    assert_eq!(body["confidence"], 100.0);
}

#[tokio::test]
async fn test_verify_different_face_not_verified() {
    // The live image encodes far away from the stored encoding.
    let router = test_router(MockFaceEngine::single_face(vec![1.0, 0.0, 0.0]));

    let request = json_request(
        "/verify",
        json!({
            "stored_encoding": encoded(vec![0.0, 1.0, 0.0]),
            "image": BASE64_STANDARD.encode(tiny_png()),
        }),
    );
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["verified"], false);
    assert!(body["distance"].as_f64().unwrap() > 0.6);
}

#[tokio::test]
async fn test_verify_missing_fields_rejected() {
    let router = test_router(MockFaceEngine::empty());

    let request = json_request("/verify", json!({"stored_encoding": "abc"}));
    let response = router.clone().oneshot(request).await.unwrap();
    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Stored encoding and image are required");

    let request = json_request("/verify", json!({"image": "abc"}));
    let response = router.oneshot(request).await.unwrap();
    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Stored encoding and image are required");
}

#[tokio::test]
async fn test_verify_non_string_image_rejected() {
    let router = test_router(MockFaceEngine::empty());

    let request = json_request(
        "/verify",
        json!({"stored_encoding": "abc", "image": 12345}),
    );
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid image format");
}

#[tokio::test]
async fn test_verify_invalid_base64_image_rejected() {
    let router = test_router(MockFaceEngine::empty());

    let request = json_request(
        "/verify",
        json!({"stored_encoding": encoded(vec![1.0]), "image": "!!not base64!!"}),
    );
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid base64 image data");
}

// =============================================================================
// Detect
// =============================================================================

#[tokio::test]
async fn test_detect_no_faces_is_success() {
    let router = test_router(MockFaceEngine::empty());

    let request = multipart_request("/detect", "image", "empty.png", &tiny_png());
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["face_count"], 0);
    assert_eq!(body["faces_detected"], false);
    assert_eq!(body["face_locations"], json!([]));
}

#[tokio::test]
async fn test_detect_multiple_faces_with_locations() {
    let router = test_router(MockFaceEngine::with_faces(vec![
        FaceLocation::new(10, 90, 80, 20),
        FaceLocation::new(100, 180, 170, 110),
        FaceLocation::new(5, 15, 15, 5),
    ]));

    let request = multipart_request("/detect", "image", "crowd.jpg", &tiny_png());
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["face_count"], 3);
    assert_eq!(body["faces_detected"], true);
    // Locations keep [top, right, bottom, left] order.
    assert_eq!(body["face_locations"][0], json!([10, 90, 80, 20]));
    assert_eq!(body["face_locations"][1], json!([100, 180, 170, 110]));
    assert_eq!(body["face_locations"][2], json!([5, 15, 15, 5]));
}

#[tokio::test]
async fn test_detect_missing_image_field_rejected() {
    let router = test_router(MockFaceEngine::empty());

    let request = multipart_request("/detect", "picture", "a.png", &tiny_png());
    let response = router.oneshot(request).await.unwrap();

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No image file provided");
}
