//! Facematch - a stateless HTTP face matching service.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use facematch::{
    config::Config,
    engine::OnnxFaceEngine,
    server::{create_router, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Facematch v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Detector model: {}", config.detector_model.display());
    info!("  Recognizer model: {}", config.recognizer_model.display());
    info!("  Upload dir: {}", config.upload_dir.display());
    info!("  Max upload size: {} bytes", config.max_upload_bytes);
    info!("  Match tolerance: {}", config.tolerance);

    // Make sure the transient upload directory exists before serving
    if let Err(e) = tokio::fs::create_dir_all(&config.upload_dir).await {
        error!(
            "Failed to create upload directory {}: {}",
            config.upload_dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    // Load the ONNX models. Slow but one-time; failures here are fatal.
    info!("Loading face models...");
    let engine = match OnnxFaceEngine::load(&config.detector_model, &config.recognizer_model) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to load face models: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("  Models loaded");

    // Create router
    let router = create_router(engine, RouterConfig::from_config(&config));

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl -F \"image=@face.jpg\" http://{}/encode", addr);
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "facematch=debug,tower_http=debug"
    } else {
        "facematch=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
