//! Receipt Scanner Server
//!
//! Captures receipt totals from photos and records confirmed submissions in
//! the shared expense ledger.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use receipt_scanner_server::config::{Config, LedgerBackend};
use receipt_scanner_server::detection::HttpDetectionBackend;
use receipt_scanner_server::ledger::{create_pool, LedgerStore, SheetsLedger, SqliteLedger};
use receipt_scanner_server::ocr::VisionProvider;
use receipt_scanner_server::routes;
use receipt_scanner_server::state::AppState;
use receipt_scanner_server::uploads::HttpUploadClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "receipt_scanner_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!("Starting Receipt Scanner Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Upload directory: {}", config.upload.dir.display());
    tracing::info!("Detector: {}", config.detector.url);

    tokio::fs::create_dir_all(&config.upload.dir)
        .await
        .with_context(|| format!("Failed to create {}", config.upload.dir.display()))?;

    let timeout = config.services.timeout();

    // Capabilities are built once and shared read-only
    let detector = HttpDetectionBackend::connect(&config.detector, timeout)
        .await
        .context("Failed to reach the detection server")?;
    let ocr = VisionProvider::new(&config.ocr, timeout).context("Failed to initialize OCR")?;
    let uploads =
        HttpUploadClient::new(&config.services).context("Failed to initialize upload client")?;

    let ledger: Arc<dyn LedgerStore> = match config.ledger.backend {
        LedgerBackend::Sheets => {
            tracing::info!("Ledger: Google Sheets {}", config.ledger.sheet_id);
            Arc::new(
                SheetsLedger::new(&config.ledger, timeout)
                    .context("Failed to initialize Sheets ledger")?,
            )
        }
        LedgerBackend::Sqlite => {
            let pool = create_pool(&config.ledger.database_url)
                .await
                .context("Failed to initialize database")?;
            tracing::info!("Ledger: database at {}", config.ledger.database_url);
            Arc::new(SqliteLedger::new(pool))
        }
    };

    let app_state = AppState::new(
        config.clone(),
        Arc::new(detector),
        Arc::new(ocr),
        Arc::new(uploads),
        ledger,
    );

    let _cleanup = app_state.staging().clone().start_cleanup_task();

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app: Router = routes::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid SERVER_HOST/SERVER_PORT")?;
    tracing::info!("Receipt Scanner Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
