//! Wallet Risk API Server
//!
//! Usage:
//!   cargo run --bin wallet_risk_api
//!
//! Environment:
//!   PORT / HOST              - Bind address (default: 0.0.0.0:8000)
//!   ETHERSCAN_API_KEY        - Explorer key (placeholder key when unset)
//!   API_RATE_LIMIT_PER_MIN   - Per-client request budget (default: 100)
//!   TELEMETRY_DIR            - Where final stats are written (default: ./telemetry)
//!   RUST_LOG                 - Log filter (default: info)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wallet_risk::api::middleware::RateLimitConfig;
use wallet_risk::api::{create_router, start_cleanup_task, AppState};
use wallet_risk::utils::constants::{APP_NAME, APP_VERSION};
use wallet_risk::{AnalyzerConfig, ServerConfig, TelemetryCollector, WalletAnalyzer};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv::dotenv().ok();

    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    info!("🚀 {} v{} starting...", APP_NAME, APP_VERSION);

    let server_config = ServerConfig::from_env()?;
    let analyzer_config = AnalyzerConfig::from_env()?;
    let analyzer = Arc::new(WalletAnalyzer::from_config(&analyzer_config)?);

    let telemetry = Arc::new(TelemetryCollector::new());
    let telemetry_for_shutdown = telemetry.clone();

    let state = Arc::new(AppState::with_rate_limit(
        analyzer,
        telemetry,
        RateLimitConfig::per_minute(server_config.rate_limit_per_minute),
    ));

    start_cleanup_task(state.rate_limiter.clone());
    info!("🧹 Rate limiter cleanup task started");

    let app = create_router(state);
    let addr: SocketAddr = server_config.bind_address().parse()?;

    info!("✅ API ready at http://{}", addr);
    info!("Endpoints:");
    info!("  POST /api/v1/analyze        - Wallet risk analysis");
    info!("  POST /api/v1/analyze/batch  - Batch analysis (up to 20 wallets)");
    info!("  GET  /api/v1/stats          - Service statistics");
    info!("  GET  /api/v1/health         - Health check");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("🛑 Shutdown signal received, exporting telemetry...");
    let stats = telemetry_for_shutdown.get_stats();
    info!("{}", stats.summary());

    let telemetry_dir = std::env::var("TELEMETRY_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./telemetry"));
    match telemetry_for_shutdown.export_stats_json(&telemetry_dir) {
        Ok(path) => info!("   ✅ Stats exported to: {}", path.display()),
        Err(e) => warn!("   ⚠️ Failed to export stats: {}", e),
    }

    info!("👋 {} shutdown complete", APP_NAME);
    Ok(())
}
