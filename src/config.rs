//! Configuration for the face match service.
//!
//! Every option can come from the command line or from an environment
//! variable with the `FACEMATCH_` prefix:
//!
//! - `FACEMATCH_HOST` - Server bind address (default: 0.0.0.0)
//! - `FACEMATCH_PORT` - Server port (default: 5000)
//! - `FACEMATCH_DETECTOR_MODEL` - Path to the face detection ONNX model (required)
//! - `FACEMATCH_RECOGNIZER_MODEL` - Path to the face embedding ONNX model (required)
//! - `FACEMATCH_UPLOAD_DIR` - Directory for transient image files (default: uploads)
//! - `FACEMATCH_MAX_UPLOAD_BYTES` - Maximum image payload size (default: 5 MiB)
//! - `FACEMATCH_TOLERANCE` - Default match tolerance (default: 0.6)
//! - `FACEMATCH_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;

use clap::Parser;

use crate::comparator::DEFAULT_TOLERANCE;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default directory for transient image files.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Default maximum image payload size (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Face match service - stateless HTTP face encoding, comparison, and
/// verification.
#[derive(Parser, Debug, Clone)]
#[command(name = "facematch")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "FACEMATCH_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "FACEMATCH_PORT")]
    pub port: u16,

    /// Path to the face detection ONNX model (SCRFD export).
    #[arg(long, env = "FACEMATCH_DETECTOR_MODEL")]
    pub detector_model: PathBuf,

    /// Path to the face embedding ONNX model (ArcFace export).
    #[arg(long, env = "FACEMATCH_RECOGNIZER_MODEL")]
    pub recognizer_model: PathBuf,

    /// Directory for transient image files.
    ///
    /// Files are uniquely named per request and removed when the request
    /// completes.
    #[arg(long, default_value = DEFAULT_UPLOAD_DIR, env = "FACEMATCH_UPLOAD_DIR")]
    pub upload_dir: PathBuf,

    /// Maximum accepted image payload size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "FACEMATCH_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: u64,

    /// Default match tolerance: maximum embedding distance at which two
    /// faces count as the same person.
    #[arg(long, default_value_t = DEFAULT_TOLERANCE, env = "FACEMATCH_TOLERANCE")]
    pub tolerance: f64,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "FACEMATCH_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }

        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err("tolerance must be a non-negative number".to_string());
        }

        if self.upload_dir.as_os_str().is_empty() {
            return Err("upload_dir must not be empty".to_string());
        }

        if self.detector_model.as_os_str().is_empty() {
            return Err(
                "Detector model path is required. Set --detector-model or FACEMATCH_DETECTOR_MODEL"
                    .to_string(),
            );
        }
        if self.recognizer_model.as_os_str().is_empty() {
            return Err(
                "Recognizer model path is required. Set --recognizer-model or FACEMATCH_RECOGNIZER_MODEL"
                    .to_string(),
            );
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Tests
// =============================================================================
