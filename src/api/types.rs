//! API Request/Response Types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::errors::ErrorCode;
use crate::models::types::{TransactionStats, WalletAnalysis};
use crate::utils::constants::MAX_BATCH_CONCURRENCY;

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest.as_str(), message)
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: ErrorCode::ApiRateLimited.as_str().to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }

    pub fn analysis_failed(cause: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::ApiInternalError.as_str(),
            format!("Analysis failed: {}", cause),
        )
    }
}

// ============================================
// Wallet Analysis
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub wallet_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAnalysisResponse {
    pub wallet_address: String,
    pub risk_score: u8,
    /// "low" | "medium" | "high"
    pub risk_level: String,
    pub risk_factors: Vec<String>,
    pub transaction_stats: TransactionStats,
    /// RFC 3339
    pub analysis_timestamp: String,
    /// Always false: verdicts are computed per request
    pub cached: bool,
}

impl From<WalletAnalysis> for RiskAnalysisResponse {
    fn from(analysis: WalletAnalysis) -> Self {
        Self {
            transaction_stats: TransactionStats::from(&analysis.features),
            wallet_address: analysis.address,
            risk_score: analysis.verdict.risk_score,
            risk_level: analysis.verdict.risk_level.as_str().to_string(),
            risk_factors: analysis.verdict.risk_factors,
            analysis_timestamp: analysis.analyzed_at.to_rfc3339(),
            cached: false,
        }
    }
}

// ============================================
// Batch Analysis
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchAnalyzeRequest {
    pub wallet_addresses: Vec<String>,
    /// Concurrent analyses, clamped to 1..=10
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    MAX_BATCH_CONCURRENCY
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchAnalyzeData {
    pub total_requested: usize,
    pub total_succeeded: usize,
    pub total_failed: usize,
    pub results: Vec<BatchWalletResult>,
    pub processing_time_ms: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchWalletResult {
    pub wallet_address: String,
    /// "success" | "error"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<RiskAnalysisResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: f64,
}

// ============================================
// Stats / Health / Root
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsData {
    pub total_analyzed: u64,
    pub total_failed: u64,
    pub low_risk: u64,
    pub medium_risk: u64,
    pub high_risk: u64,
    pub factor_counts: BTreeMap<String, u64>,
    pub avg_latency_ms: f64,
    pub uptime_seconds: u64,
    /// Where wallet records come from ("etherscan", "static")
    pub source: String,
    pub scorer: String,
    /// Clients currently tracked by the rate limiter
    pub rate_limited_clients: usize,
    pub api_version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
    pub endpoints: BTreeMap<String, String>,
}
