//! HTTP server layer for the face match service.
//!
//! This module provides the HTTP API for face encoding, comparison, and
//! verification.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   POST /encode  /compare  /verify  /detect    GET /health       │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (requests, error bodies) │  │  (router config, CORS)      │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    compare_handler, detect_handler, encode_handler, health_handler, verify_handler, ApiError,
    AppState, CompareRequest, CompareResponse, DetectResponse, EncodeResponse, ErrorResponse,
    HealthResponse, VerifyRequest, VerifyResponse,
};
pub use routes::{create_router, RouterConfig};
