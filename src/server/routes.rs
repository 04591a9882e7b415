//! Router configuration for the face match service.
//!
//! This module defines the HTTP routes and applies middleware for CORS,
//! body size limits, and request tracing.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health    - Health check
//! POST /encode    - Encode the single face in an uploaded image
//! POST /compare   - Compare two encoded representations
//! POST /verify    - Verify a base64 image against a stored encoding
//! POST /detect    - Detect faces in an uploaded image
//! ```
//!
//! # Example
//!
//! ```ignore
//! use facematch::engine::OnnxFaceEngine;
//! use facematch::server::{create_router, RouterConfig};
//!
//! let engine = OnnxFaceEngine::load("det.onnx", "rec.onnx")?;
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(engine, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    compare_handler, detect_handler, encode_handler, health_handler, verify_handler, AppState,
};
use crate::comparator::DEFAULT_TOLERANCE;
use crate::config::{Config, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_UPLOAD_DIR};
use crate::engine::FaceEngine;
use crate::upload::UploadConfig;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Directory for transient image files
    pub upload_dir: PathBuf,

    /// Maximum accepted image payload size in bytes
    pub max_upload_bytes: u64,

    /// Default match tolerance
    pub tolerance: f64,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration with defaults.
    ///
    /// By default:
    /// - Uploads go to `uploads/` with a 5 MiB limit
    /// - Match tolerance is 0.6
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            tolerance: DEFAULT_TOLERANCE,
            cors_origins: None, // Allow any origin by default
            enable_tracing: true,
        }
    }

    /// Build a router configuration from the service configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
            tolerance: config.tolerance,
            cors_origins: config.cors_origins.clone(),
            enable_tracing: !config.no_tracing,
        }
    }

    /// Set the transient upload directory.
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    /// Set the maximum accepted image payload size.
    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Set the default match tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    /// Pass None (or don't call this method) to allow any origin.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - The five API routes
/// - A request body size limit matching the upload limit
/// - CORS configuration
/// - Request tracing (optional)
///
/// # Arguments
///
/// * `engine` - The vision backend used for detection and embedding
/// * `config` - Router configuration
///
/// # Returns
///
/// A configured Axum router ready to be served.
pub fn create_router<E: FaceEngine>(engine: E, config: RouterConfig) -> Router {
    let uploads = UploadConfig {
        dir: config.upload_dir.clone(),
        max_bytes: config.max_upload_bytes,
    };
    let app_state = AppState::new(engine, uploads, config.tolerance);

    // Build CORS layer
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/encode", post(encode_handler::<E>))
        .route("/compare", post(compare_handler::<E>))
        .route("/verify", post(verify_handler::<E>))
        .route("/detect", post(detect_handler::<E>))
        .with_state(app_state)
        // Axum's default body limit is 2 MB; align it with the upload limit
        // and let the upload layer produce the domain error message.
        .layer(DefaultBodyLimit::max(config.max_upload_bytes as usize + 64 * 1024))
        .layer(cors);

    // Add tracing if enabled
    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => {
            // No origins allowed - this effectively disables CORS
            cors
        }
        Some(origins) => {
            // Parse origins into HeaderValues
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
