//! Configuration module for the wallet risk analyzer
//!
//! Semua nilai default diambil dari utils/constants.rs; environment
//! variables only override them.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use super::errors::{AppError, AppResult};
use crate::core::features::IncomingRatioPolicy;
use crate::core::risk_score::ScorerKind;
use crate::utils::constants::{
    get_chain_name, is_chain_supported, CHAIN_ID_ETHEREUM, DEFAULT_API_RATE_LIMIT_PER_MIN,
    DEFAULT_EXPLORER_TIMEOUT_SECS, DEFAULT_HOST, DEFAULT_MAX_RETRIES, DEFAULT_PORT,
    DEFAULT_RATE_LIMIT_DELAY_MS, ETHERSCAN_V2_URL, MAX_PAGE_SIZE, PLACEHOLDER_API_KEY,
};

/// Block explorer client settings
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// Etherscan API key (never logged)
    pub api_key: String,
    pub base_url: String,
    /// Etherscan V2 `chainid`
    pub chain_id: u64,
    /// Minimum spacing between two calls of one client
    pub rate_limit_delay: Duration,
    pub request_timeout: Duration,
    /// txlist/tokentx `offset`, capped at 10,000
    pub page_size: usize,
    pub max_retries: u32,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            api_key: PLACEHOLDER_API_KEY.to_string(),
            base_url: ETHERSCAN_V2_URL.to_string(),
            chain_id: CHAIN_ID_ETHEREUM,
            rate_limit_delay: Duration::from_millis(DEFAULT_RATE_LIMIT_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_EXPLORER_TIMEOUT_SECS),
            page_size: MAX_PAGE_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ExplorerConfig {
    /// Load from environment, falling back to defaults
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();

        let api_key = match std::env::var("ETHERSCAN_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                info!("🔑 ETHERSCAN_API_KEY configured (key hidden for security)");
                key
            }
            _ => {
                warn!("⚠️ ETHERSCAN_API_KEY not set, using shared placeholder key (heavily rate limited)");
                defaults.api_key
            }
        };

        let chain_id: u64 = env_or("CHAIN_ID", defaults.chain_id)?;
        if !is_chain_supported(chain_id) {
            return Err(AppError::unsupported_chain(chain_id));
        }

        let page_size: usize = env_or("EXPLORER_PAGE_SIZE", defaults.page_size)?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(AppError::invalid_config(
                "EXPLORER_PAGE_SIZE",
                &page_size.to_string(),
            ));
        }

        let config = Self {
            api_key,
            base_url: std::env::var("ETHERSCAN_BASE_URL").unwrap_or(defaults.base_url),
            chain_id,
            rate_limit_delay: Duration::from_millis(env_or(
                "EXPLORER_RATE_LIMIT_MS",
                DEFAULT_RATE_LIMIT_DELAY_MS,
            )?),
            request_timeout: Duration::from_secs(env_or(
                "EXPLORER_TIMEOUT_SECS",
                DEFAULT_EXPLORER_TIMEOUT_SECS,
            )?),
            page_size,
            max_retries: env_or("EXPLORER_MAX_RETRIES", defaults.max_retries)?,
        };

        info!(
            "🌐 Explorer: {} (chain {} - {})",
            config.base_url,
            config.chain_id,
            get_chain_name(config.chain_id)
        );

        Ok(config)
    }
}

/// Feature extraction and scoring settings
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfig {
    pub explorer: ExplorerConfig,
    pub incoming_ratio_policy: IncomingRatioPolicy,
    pub scorer: ScorerKind,
    /// Weights file for the learned scorer
    pub model_path: Option<PathBuf>,
}

impl AnalyzerConfig {
    pub fn from_env() -> AppResult<Self> {
        let model_path = std::env::var("RISK_MODEL_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            explorer: ExplorerConfig::from_env()?,
            incoming_ratio_policy: env_or("INCOMING_RATIO_POLICY", IncomingRatioPolicy::default())?,
            scorer: env_or("RISK_SCORER", ScorerKind::default())?,
            model_path,
        })
    }
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rate_limit_per_minute: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            rate_limit_per_minute: DEFAULT_API_RATE_LIMIT_PER_MIN,
        }
    }
}

impl ServerConfig {
    /// PORT wins over WALLET_RISK_PORT (hosting platforms set PORT)
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        let port = match std::env::var("PORT").or_else(|_| std::env::var("WALLET_RISK_PORT")) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::invalid_config("PORT", &raw))?,
            Err(_) => defaults.port,
        };

        Ok(Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port,
            rate_limit_per_minute: env_or("API_RATE_LIMIT_PER_MIN", defaults.rate_limit_per_minute)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read and parse an env var, keeping `default` when unset
fn env_or<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| AppError::invalid_config(key, &raw)),
        _ => Ok(default),
    }
}
