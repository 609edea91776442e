//! Constants Module - Single Source of Truth
//!
//! Semua konstanta, fungsi konversi, dan konfigurasi default
//! yang digunakan di seluruh aplikasi didefinisikan di sini.

use alloy_primitives::U256;

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "Wallet Risk Analyzer";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for explorer requests
pub const USER_AGENT: &str = "WalletRisk/0.1.0";

// ============================================
// EXPLORER (ETHERSCAN V2) CONSTANTS
// ============================================

/// Etherscan V2 multi-chain endpoint
pub const ETHERSCAN_V2_URL: &str = "https://api.etherscan.io/v2/api";

/// Placeholder key accepted by Etherscan for low-rate anonymous use
pub const PLACEHOLDER_API_KEY: &str = "YourApiKeyToken";

/// Minimum delay between two explorer calls (milliseconds)
pub const DEFAULT_RATE_LIMIT_DELAY_MS: u64 = 200;

/// Default timeout for explorer requests (seconds)
pub const DEFAULT_EXPLORER_TIMEOUT_SECS: u64 = 10;

/// Single page size for txlist/tokentx (explorer hard cap)
pub const MAX_PAGE_SIZE: usize = 10_000;

/// Upper block bound used for full-history queries
pub const END_BLOCK: u64 = 99_999_999;

/// Default retry attempts for timeouts and HTTP 429
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base retry delay in milliseconds (doubles per attempt)
pub const BASE_RETRY_DELAY_MS: u64 = 500;

/// Cap on a single retry delay in milliseconds
pub const MAX_RETRY_DELAY_MS: u64 = 8_000;

/// Jitter percentage applied to each retry delay
pub const RETRY_JITTER_PERCENT: u64 = 20;

// ============================================
// SERVER CONSTANTS
// ============================================

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;

/// Requests per minute per client
pub const DEFAULT_API_RATE_LIMIT_PER_MIN: u32 = 100;

/// Maximum wallets per batch request
pub const MAX_BATCH_SIZE: usize = 20;

/// Maximum concurrent analyses inside a batch
pub const MAX_BATCH_CONCURRENCY: usize = 10;

// ============================================
// FEATURE THRESHOLDS
// ============================================

/// Accounts younger than this are flagged `is_new_account`
pub const NEW_ACCOUNT_MAX_AGE_DAYS: u64 = 30;

/// Transactions per day above which `high_frequency` is set
pub const HIGH_FREQUENCY_TXNS_PER_DAY: f64 = 10.0;

/// Sample variance (native units squared) above which `high_variance` is set
pub const HIGH_VARIANCE_THRESHOLD: f64 = 1.0;

pub const SECONDS_PER_DAY: i64 = 86_400;

// ============================================
// CHAIN IDS (Etherscan V2 `chainid`)
// ============================================

/// Ethereum Mainnet
pub const CHAIN_ID_ETHEREUM: u64 = 1;
/// BNB Smart Chain
pub const CHAIN_ID_BSC: u64 = 56;
/// Polygon
pub const CHAIN_ID_POLYGON: u64 = 137;
/// Arbitrum One
pub const CHAIN_ID_ARBITRUM: u64 = 42161;
/// Optimism
pub const CHAIN_ID_OPTIMISM: u64 = 10;
/// Avalanche C-Chain
pub const CHAIN_ID_AVALANCHE: u64 = 43114;
/// Base
pub const CHAIN_ID_BASE: u64 = 8453;

/// All chains the explorer client may be pointed at
pub const SUPPORTED_CHAIN_IDS: [u64; 7] = [
    CHAIN_ID_ETHEREUM,
    CHAIN_ID_BSC,
    CHAIN_ID_POLYGON,
    CHAIN_ID_ARBITRUM,
    CHAIN_ID_OPTIMISM,
    CHAIN_ID_AVALANCHE,
    CHAIN_ID_BASE,
];

// ============================================
// CHAIN METADATA
// ============================================

/// Get chain name
pub fn get_chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_ETHEREUM => "Ethereum",
        CHAIN_ID_BSC => "BNB Smart Chain",
        CHAIN_ID_POLYGON => "Polygon",
        CHAIN_ID_ARBITRUM => "Arbitrum One",
        CHAIN_ID_OPTIMISM => "Optimism",
        CHAIN_ID_AVALANCHE => "Avalanche C-Chain",
        CHAIN_ID_BASE => "Base",
        _ => "Unknown",
    }
}

/// Get native token symbol
pub fn get_native_symbol(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_BSC => "BNB",
        CHAIN_ID_POLYGON => "MATIC",
        CHAIN_ID_AVALANCHE => "AVAX",
        _ => "ETH",
    }
}

/// Check if chain ID is supported
#[inline]
pub fn is_chain_supported(chain_id: u64) -> bool {
    SUPPORTED_CHAIN_IDS.contains(&chain_id)
}

// ============================================
// CONVERSION UTILITIES
// ============================================

/// Parse an explorer integer string (wei, gwei, block numbers).
/// Returns `None` for empty, signed, or non-decimal input.
#[inline]
pub fn parse_raw_amount(raw: &str) -> Option<U256> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    U256::from_str_radix(trimmed, 10).ok()
}

/// Convert wei to ETH (or native token)
#[inline]
pub fn wei_to_eth(wei: U256) -> f64 {
    let wei_u128: u128 = wei.try_into().unwrap_or(u128::MAX);
    wei_u128 as f64 / 1e18
}

/// Convert a raw gas price (wei) to gwei
#[inline]
pub fn wei_to_gwei(wei: U256) -> f64 {
    let wei_u128: u128 = wei.try_into().unwrap_or(u128::MAX);
    wei_u128 as f64 / 1e9
}

/// Round to a fixed number of decimal places for stable output
#[inline]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wei_to_eth() {
        let one_eth = U256::from(1_000_000_000_000_000_000u128);
        assert!((wei_to_eth(one_eth) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_wei_to_gwei() {
        let twenty_gwei = U256::from(20_000_000_000u64);
        assert_eq!(wei_to_gwei(twenty_gwei), 20.0);
    }

    #[test]
    fn test_parse_raw_amount() {
        assert_eq!(parse_raw_amount("1500"), Some(U256::from(1500u64)));
        assert_eq!(parse_raw_amount(" 42 "), Some(U256::from(42u64)));
        assert_eq!(parse_raw_amount(""), None);
        assert_eq!(parse_raw_amount("0x10"), None);
        assert_eq!(parse_raw_amount("-5"), None);
        assert_eq!(parse_raw_amount("1.5"), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123456789, 4), 0.1235);
        assert_eq!(round_to(2.0 / 3.0, 6), 0.666667);
        assert_eq!(round_to(12.345, 0), 12.0);
    }

    #[test]
    fn test_chain_support() {
        assert!(is_chain_supported(1));
        assert!(is_chain_supported(8453));
        assert!(!is_chain_supported(999));
        assert_eq!(get_native_symbol(56), "BNB");
        assert_eq!(get_chain_name(137), "Polygon");
    }
}
