//! scribe-api - HTTP API server for scribe

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scribe_api::{build_router, AppState, ServerConfig};
use scribe_jobs::{
    FilesystemBackend, JobCoordinator, JobQueue, JobStore, ProcessingEngine, ResultAccess,
    StorageBackend, StorageConfig, TranscriptionEngine, WorkerBuilder, WorkerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "scribe_api=debug,scribe_jobs=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scribe_api=debug,scribe_jobs=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("scribe-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let server_config = ServerConfig::from_env();
    let storage_config = StorageConfig::from_env();
    let worker_config = WorkerConfig::from_env();

    // Fail fast on unusable storage
    let uploads = FilesystemBackend::new(&storage_config.upload_dir);
    let outputs = FilesystemBackend::new(&storage_config.output_dir);
    uploads.validate().await?;
    outputs.validate().await?;
    info!(
        upload_dir = %storage_config.upload_dir.display(),
        output_dir = %storage_config.output_dir.display(),
        "Storage validated"
    );
    let uploads: Arc<dyn StorageBackend> = Arc::new(uploads);
    let outputs: Arc<dyn StorageBackend> = Arc::new(outputs);

    let engine = TranscriptionEngine::from_env();
    info!(model = engine.model_name(), "Transcription engine configured");
    match engine.health_check().await {
        Ok(true) => info!("Transcription backend is reachable"),
        Ok(false) | Err(_) => {
            warn!("Transcription backend is not reachable yet; jobs will fail until it is")
        }
    }

    let store = Arc::new(JobStore::new());
    let queue = Arc::new(JobQueue::new());

    let workers = Arc::new(
        WorkerBuilder::new(store.clone(), queue.clone())
            .with_config(worker_config)
            .with_engine(engine)
            .with_input_storage(uploads.clone())
            .with_output_storage(outputs.clone())
            .build()?
            .start(),
    );

    let coordinator = JobCoordinator::new(store.clone(), queue, uploads)
        .with_max_upload_bytes(server_config.max_upload_bytes);

    let addr: SocketAddr = server_config.bind_addr().parse()?;
    let state = AppState {
        coordinator: Arc::new(coordinator),
        results: Arc::new(ResultAccess::new(store, outputs)),
        workers: workers.clone(),
        config: Arc::new(server_config),
    };
    let app = build_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped accepting connections, shutting down workers");
    workers.shutdown().await?;
    info!("Graceful shutdown complete");

    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT (Ctrl-C), starting graceful shutdown"),
        () = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
