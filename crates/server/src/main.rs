use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tuneshift_core::{
    load_config, validate_config, BlobStore, ConversionManager, ConversionOrchestrator,
    EncoderCapabilities, FfmpegBackend, FsBlobStore, RecordStore, SqliteRecordStore,
};

use tuneshift_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());

    let json = std::env::var("TUNESHIFT_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn run() -> Result<()> {
    init_tracing();

    // Determine config path
    let config_path = std::env::var("TUNESHIFT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Storage root: {:?}", config.storage.root);

    // Create SQLite record store
    let records: Arc<dyn RecordStore> = Arc::new(
        SqliteRecordStore::new(&config.database.path).context("Failed to create record store")?,
    );
    info!("Record store initialized");

    // Create blob store
    std::fs::create_dir_all(&config.storage.root)
        .with_context(|| format!("Failed to create storage root {:?}", config.storage.root))?;
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.storage.root));
    info!("Blob store initialized");

    // Probe the external encoder once; conversions still work without it
    // for formats the in-process backend covers.
    let ffmpeg = FfmpegBackend::new(config.converter.clone());
    if config.converter.fallback_enabled {
        match ffmpeg.validate().await {
            Ok(()) => info!("ffmpeg available at {:?}", config.converter.ffmpeg_path),
            Err(e) => warn!("ffmpeg fallback unavailable: {}", e),
        }
    } else {
        info!("ffmpeg fallback disabled in config");
    }
    let capabilities = EncoderCapabilities::detect(&config.converter).await;
    info!(
        "Encoders: in-process {:?}, ffmpeg {:?}",
        capabilities.in_process, capabilities.ffmpeg
    );

    // Create conversion pipeline
    let orchestrator = Arc::new(
        ConversionOrchestrator::from_config(&config.converter)
            .with_span(tracing::info_span!("conversion")),
    );
    info!("Conversion backends: {:?}", orchestrator.backend_names());
    let conversions = Arc::new(ConversionManager::new(
        orchestrator,
        Arc::clone(&records),
        Arc::clone(&blobs),
    ));

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        records,
        blobs,
        conversions,
        capabilities,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
