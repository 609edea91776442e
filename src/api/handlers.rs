//! API Request Handlers

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::middleware::{RateLimitConfig, RateLimiter};
use super::types::*;
use crate::core::analyzer::WalletAnalyzer;
use crate::models::types::normalize_address;
use crate::utils::constants::{APP_NAME, APP_VERSION, MAX_BATCH_CONCURRENCY, MAX_BATCH_SIZE};
use crate::utils::telemetry::TelemetryCollector;

type ApiFailure = (StatusCode, Json<ApiResponse<()>>);

/// Shared application state
pub struct AppState {
    pub analyzer: Arc<WalletAnalyzer>,
    pub telemetry: Arc<TelemetryCollector>,
    pub rate_limiter: Arc<RateLimiter>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(analyzer: Arc<WalletAnalyzer>, telemetry: Arc<TelemetryCollector>) -> Self {
        Self::with_rate_limit(analyzer, telemetry, RateLimitConfig::default())
    }

    pub fn with_rate_limit(
        analyzer: Arc<WalletAnalyzer>,
        telemetry: Arc<TelemetryCollector>,
        rate_limit: RateLimitConfig,
    ) -> Self {
        Self {
            analyzer,
            telemetry,
            rate_limiter: Arc::new(RateLimiter::new(rate_limit)),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn failure(status: StatusCode, error: ApiError, start: Instant) -> ApiFailure {
    (status, Json(ApiResponse::error(error, elapsed_ms(start))))
}

// ============================================
// Root / Health
// ============================================

pub async fn service_info() -> Json<ServiceInfo> {
    let endpoints = BTreeMap::from([
        ("analyze".to_string(), "/api/v1/analyze".to_string()),
        ("batch".to_string(), "/api/v1/analyze/batch".to_string()),
        ("health".to_string(), "/api/v1/health".to_string()),
        ("stats".to_string(), "/api/v1/stats".to_string()),
    ]);

    Json(ServiceInfo {
        service: APP_NAME.to_string(),
        version: APP_VERSION.to_string(),
        status: "operational".to_string(),
        endpoints,
    })
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: APP_VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Wallet Analysis
// ============================================

pub async fn analyze_wallet(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ApiResponse<RiskAnalysisResponse>>, ApiFailure> {
    let start = Instant::now();

    let address = normalize_address(&req.wallet_address).map_err(|e| {
        warn!("Rejected address {:?}", req.wallet_address);
        failure(StatusCode::BAD_REQUEST, ApiError::bad_request(e.message), start)
    })?;

    info!("🔍 Analyzing wallet: {}", address);

    match state.analyzer.analyze(&address).await {
        Ok(analysis) => {
            state
                .telemetry
                .record_analysis(&analysis.verdict, start.elapsed().as_millis() as u64);
            Ok(Json(ApiResponse::success(analysis.into(), elapsed_ms(start))))
        }
        Err(e) => {
            error!(code = e.code_str(), "Analysis error for {}: {}", address, e.message);
            state.telemetry.record_failure(start.elapsed().as_millis() as u64);

            let mut api_error = ApiError::analysis_failed(&e.message);
            api_error.details = Some(e.code_str().to_string());
            Err(failure(StatusCode::INTERNAL_SERVER_ERROR, api_error, start))
        }
    }
}

// ============================================
// Batch Analysis
// ============================================

async fn analyze_one(state: &AppState, raw_address: String) -> BatchWalletResult {
    let item_start = Instant::now();

    let outcome = match normalize_address(&raw_address) {
        Ok(address) => state.analyzer.analyze(&address).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(analysis) => {
            state
                .telemetry
                .record_analysis(&analysis.verdict, item_start.elapsed().as_millis() as u64);
            BatchWalletResult {
                wallet_address: analysis.address.clone(),
                status: "success".to_string(),
                analysis: Some(analysis.into()),
                error: None,
                latency_ms: elapsed_ms(item_start),
            }
        }
        Err(e) => {
            if e.is_ingestion_failure() {
                state.telemetry.record_failure(item_start.elapsed().as_millis() as u64);
            }
            BatchWalletResult {
                wallet_address: raw_address,
                status: "error".to_string(),
                analysis: None,
                error: Some(e.message),
                latency_ms: elapsed_ms(item_start),
            }
        }
    }
}

pub async fn batch_analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchAnalyzeRequest>,
) -> Result<Json<ApiResponse<BatchAnalyzeData>>, ApiFailure> {
    let start = Instant::now();

    if req.wallet_addresses.is_empty() {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            ApiError::bad_request("wallet_addresses cannot be empty"),
            start,
        ));
    }

    if req.wallet_addresses.len() > MAX_BATCH_SIZE {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            ApiError::bad_request(format!(
                "Maximum {} wallets per batch request",
                MAX_BATCH_SIZE
            )),
            start,
        ));
    }

    let concurrency = req.concurrency.clamp(1, MAX_BATCH_CONCURRENCY);
    let total_requested = req.wallet_addresses.len();
    info!("📦 Batch of {} wallets (concurrency {})", total_requested, concurrency);

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let handles: Vec<_> = req
        .wallet_addresses
        .into_iter()
        .map(|address| {
            let sem = semaphore.clone();
            let state = state.clone();
            let fallback = address.clone();
            let handle = tokio::spawn(async move {
                match sem.acquire_owned().await {
                    Ok(_permit) => analyze_one(&state, address).await,
                    Err(_) => BatchWalletResult {
                        wallet_address: address,
                        status: "error".to_string(),
                        analysis: None,
                        error: Some("Batch cancelled".to_string()),
                        latency_ms: 0.0,
                    },
                }
            });
            (fallback, handle)
        })
        .collect();

    // results keep request order
    let mut results = Vec::with_capacity(handles.len());
    for (address, handle) in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(e) => {
                error!("Batch task for {} panicked: {}", address, e);
                results.push(BatchWalletResult {
                    wallet_address: address,
                    status: "error".to_string(),
                    analysis: None,
                    error: Some("Internal error".to_string()),
                    latency_ms: 0.0,
                });
            }
        }
    }

    let total_succeeded = results.iter().filter(|r| r.status == "success").count();

    let data = BatchAnalyzeData {
        total_requested,
        total_succeeded,
        total_failed: total_requested - total_succeeded,
        results,
        processing_time_ms: elapsed_ms(start),
    };

    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

// ============================================
// Stats
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();
    let stats = state.telemetry.get_stats();

    let data = StatsData {
        total_analyzed: stats.total_analyzed,
        total_failed: stats.total_failed,
        low_risk: stats.low_risk,
        medium_risk: stats.medium_risk,
        high_risk: stats.high_risk,
        factor_counts: stats.factor_counts,
        avg_latency_ms: stats.avg_latency_ms,
        uptime_seconds: state.uptime_seconds(),
        source: state.analyzer.source_name().to_string(),
        scorer: state.analyzer.scorer_name().to_string(),
        rate_limited_clients: state.rate_limiter.tracked_clients(),
        api_version: APP_VERSION.to_string(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}
