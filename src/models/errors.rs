//! Centralized Error Handling Module
//!
//! Setiap kegagalan memiliki kode error yang unik supaya mudah
//! di-grep di log production.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - FETCH_xxx: transport-level ingestion errors
//! - EXPLORER_xxx: block explorer API errors
//! - API_xxx: HTTP API errors
//! - CFG_xxx: Configuration errors
//! - ANALYSIS_xxx / MODEL_xxx: pipeline and scorer errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// True when the failure happened before a WalletRecord existed
    pub fn is_ingestion_failure(&self) -> bool {
        self.code.is_ingestion()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Ingestion transport errors
    // ============================================
    /// Could not reach the explorer
    FetchConnectionFailed,
    /// Explorer request timed out
    FetchTimeout,
    /// Explorer throttled us (HTTP 429)
    FetchRateLimited,
    /// Non-success HTTP status from the explorer
    FetchHttpError,

    // ============================================
    // Explorer API errors
    // ============================================
    /// Explorer answered `status=0, message=NOTOK`
    ExplorerApiError,
    /// Explorer payload did not have the expected shape
    ExplorerInvalidResponse,

    // ============================================
    // API Errors
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Internal server error
    ApiInternalError,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,
    /// Unsupported chain ID
    ConfigUnsupportedChain,

    // ============================================
    // Analysis Errors
    // ============================================
    /// Wallet address failed validation
    InvalidAddress,
    /// No recorded wallet for the requested address
    WalletNotFound,
    /// Scoring model file could not be loaded
    ModelLoadFailed,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchConnectionFailed => "FETCH_CONNECTION_FAILED",
            Self::FetchTimeout => "FETCH_TIMEOUT",
            Self::FetchRateLimited => "FETCH_RATE_LIMITED",
            Self::FetchHttpError => "FETCH_HTTP_ERROR",

            Self::ExplorerApiError => "EXPLORER_API_ERROR",
            Self::ExplorerInvalidResponse => "EXPLORER_INVALID_RESPONSE",

            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",

            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::ConfigUnsupportedChain => "CFG_UNSUPPORTED_CHAIN",

            Self::InvalidAddress => "ANALYSIS_INVALID_ADDRESS",
            Self::WalletNotFound => "ANALYSIS_WALLET_NOT_FOUND",
            Self::ModelLoadFailed => "MODEL_LOAD_FAILED",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::FetchTimeout | Self::FetchRateLimited | Self::FetchConnectionFailed
        )
    }

    /// Errors raised while producing a WalletRecord
    pub fn is_ingestion(&self) -> bool {
        matches!(
            self,
            Self::FetchConnectionFailed
                | Self::FetchTimeout
                | Self::FetchRateLimited
                | Self::FetchHttpError
                | Self::ExplorerApiError
                | Self::ExplorerInvalidResponse
                | Self::WalletNotFound
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Explorer rate limited us
    pub fn fetch_rate_limited() -> Self {
        Self::new(ErrorCode::FetchRateLimited, "Rate limited (HTTP 429)")
    }

    /// Explorer returned NOTOK
    pub fn explorer_error(msg: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExplorerApiError,
            format!("Etherscan API Error: {}", msg.into()),
        )
    }

    /// Explorer payload could not be interpreted
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExplorerInvalidResponse, msg)
    }

    /// Invalid wallet address
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    /// No record for address
    pub fn wallet_not_found(address: &str) -> Self {
        Self::new(
            ErrorCode::WalletNotFound,
            format!("No wallet record for {}", address),
        )
    }

    /// Unsupported chain
    pub fn unsupported_chain(chain_id: u64) -> Self {
        Self::new(
            ErrorCode::ConfigUnsupportedChain,
            format!("Unsupported chain_id: {}", chain_id),
        )
    }

    /// Invalid config value
    pub fn invalid_config(key: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: {:?}", key, value),
        )
    }

    /// Model weights could not be loaded
    pub fn model_load_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ModelLoadFailed, msg)
    }

    /// API internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::FetchTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::FetchConnectionFailed, "Connection failed")
        } else if err.is_decode() {
            Self::new(ErrorCode::ExplorerInvalidResponse, err.to_string())
        } else {
            Self::new(ErrorCode::Unknown, format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::ExplorerInvalidResponse, "JSON parse error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::explorer_error("Invalid API Key");
        assert_eq!(err.code, ErrorCode::ExplorerApiError);
        assert_eq!(err.code_str(), "EXPLORER_API_ERROR");
        assert_eq!(
            err.to_string(),
            "[EXPLORER_API_ERROR] Etherscan API Error: Invalid API Key"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::FetchTimeout.is_retryable());
        assert!(ErrorCode::FetchRateLimited.is_retryable());
        assert!(!ErrorCode::ExplorerApiError.is_retryable());
        assert!(!ErrorCode::InvalidAddress.is_retryable());
    }

    #[test]
    fn test_ingestion_classification() {
        assert!(AppError::fetch_rate_limited().is_ingestion_failure());
        assert!(AppError::wallet_not_found("0xabc").is_ingestion_failure());
        assert!(!AppError::invalid_address("bad").is_ingestion_failure());
        assert!(!AppError::model_load_failed("nope").is_ingestion_failure());
    }
}
