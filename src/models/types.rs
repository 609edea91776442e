//! Type definitions for the wallet risk pipeline
//! All core data structures: wallet records, features, verdicts

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use super::errors::{AppError, AppResult};
use crate::utils::constants::round_to;

/// Factor text used when no scoring rule fired
pub const NO_RISK_FACTORS: &str = "No significant risk factors detected";

// ============================================
// Wallet Record (ingestion output)
// ============================================

/// A native-token transfer as listed by the explorer (`action=txlist`).
///
/// Numeric fields stay raw strings; they are parsed fail-soft during
/// feature extraction so one bad row never aborts a whole wallet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalTransaction {
    /// Seconds since epoch
    #[serde(rename = "timeStamp", default, deserialize_with = "lenient_string")]
    pub timestamp: String,
    /// Value in wei
    #[serde(rename = "value", default, deserialize_with = "lenient_string")]
    pub value_raw: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub from: String,
    /// Empty for contract creation
    #[serde(default, deserialize_with = "lenient_string")]
    pub to: String,
    /// Gas price in wei
    #[serde(rename = "gasPrice", default, deserialize_with = "lenient_string")]
    pub gas_price_raw: String,
    /// "1" when the transaction reverted
    #[serde(
        rename = "isError",
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_error: Option<String>,
}

impl NormalTransaction {
    pub fn new(
        timestamp: i64,
        from: impl Into<String>,
        to: impl Into<String>,
        value_raw: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.to_string(),
            value_raw: value_raw.into(),
            from: from.into(),
            to: to.into(),
            gas_price_raw: "0".to_string(),
            is_error: Some("0".to_string()),
        }
    }

    pub fn with_gas_price(mut self, gas_price_raw: impl Into<String>) -> Self {
        self.gas_price_raw = gas_price_raw.into();
        self
    }

    pub fn failed(mut self) -> Self {
        self.is_error = Some("1".to_string());
        self
    }

    /// Parsed timestamp, `None` when malformed or before the epoch
    pub fn timestamp_secs(&self) -> Option<i64> {
        self.timestamp.trim().parse().ok().filter(|secs: &i64| *secs >= 0)
    }

    /// Failure flag; an absent flag counts as success
    pub fn is_failed(&self) -> bool {
        self.is_error.as_deref().map(str::trim) == Some("1")
    }
}

/// An ERC-20 transfer as listed by the explorer (`action=tokentx`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenTransfer {
    #[serde(rename = "timeStamp", default, deserialize_with = "lenient_string")]
    pub timestamp: String,
    #[serde(rename = "tokenSymbol", default, deserialize_with = "lenient_string")]
    pub token_symbol: String,
    #[serde(rename = "value", default, deserialize_with = "lenient_string")]
    pub value_raw: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub from: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub to: String,
}

impl TokenTransfer {
    pub fn new(timestamp: i64, token_symbol: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.to_string(),
            token_symbol: token_symbol.into(),
            value_raw: "0".to_string(),
            from: String::new(),
            to: String::new(),
        }
    }
}

/// Immutable snapshot of one wallet's balance and history.
///
/// Transactions keep the order the explorer delivered them in
/// (ascending by block).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRecord {
    address: String,
    /// Native-token balance (already converted from wei)
    balance: f64,
    #[serde(rename = "normal_txns", default)]
    normal_transactions: Vec<NormalTransaction>,
    #[serde(rename = "erc20_transfers", default)]
    token_transfers: Vec<TokenTransfer>,
    #[serde(default = "Utc::now")]
    fetched_at: DateTime<Utc>,
}

impl WalletRecord {
    pub fn new(
        address: impl Into<String>,
        balance: f64,
        normal_transactions: Vec<NormalTransaction>,
        token_transfers: Vec<TokenTransfer>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            address: address.into().to_lowercase(),
            balance,
            normal_transactions,
            token_transfers,
            fetched_at,
        }
    }

    /// Wallet with no history at all
    pub fn empty(address: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self::new(address, 0.0, Vec::new(), Vec::new(), fetched_at)
    }

    /// Lowercase the address of a record that came in through serde
    pub fn into_normalized(mut self) -> Self {
        self.address = self.address.to_lowercase();
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn normal_transactions(&self) -> &[NormalTransaction] {
        &self.normal_transactions
    }

    pub fn token_transfers(&self) -> &[TokenTransfer] {
        &self.token_transfers
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

// ============================================
// Feature Vector
// ============================================

/// The ten features derived from normal transactions.
/// `Default` is the documented all-zero vector for an empty history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFeatures {
    pub total_txns: u64,
    /// Transactions per day
    pub txn_frequency: f64,
    pub avg_txn_value: f64,
    pub txn_value_variance: f64,
    pub max_txn_value: f64,
    pub incoming_txn_ratio: f64,
    pub unique_addresses: u64,
    pub account_age_days: u64,
    /// Gwei
    pub avg_gas_price: f64,
    pub failed_txn_ratio: f64,
}

/// Features derived from ERC-20 transfers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenFeatures {
    pub token_transfer_count: u64,
    pub unique_tokens: u64,
    /// Shannon entropy (bits) of the token symbol distribution
    pub token_diversity_score: f64,
}

/// Fixed-shape scoring input. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub address: String,
    pub balance: f64,

    pub total_txns: u64,
    pub txn_frequency: f64,
    pub avg_txn_value: f64,
    pub txn_value_variance: f64,
    pub max_txn_value: f64,
    pub incoming_txn_ratio: f64,
    pub unique_addresses: u64,
    pub account_age_days: u64,
    pub avg_gas_price: f64,
    pub failed_txn_ratio: f64,

    pub token_transfer_count: u64,
    pub unique_tokens: u64,
    pub token_diversity_score: f64,

    /// Reserved, always 0
    pub contract_interaction_count: u64,
    /// Reserved, always 0
    pub unique_contracts: u64,

    pub is_new_account: u8,
    pub high_frequency: u8,
    pub high_variance: u8,
}

impl FeatureVector {
    /// Names of every numeric feature, in declaration order
    pub const NUMERIC_FEATURES: [&'static str; 19] = [
        "balance",
        "total_txns",
        "txn_frequency",
        "avg_txn_value",
        "txn_value_variance",
        "max_txn_value",
        "incoming_txn_ratio",
        "unique_addresses",
        "account_age_days",
        "avg_gas_price",
        "failed_txn_ratio",
        "token_transfer_count",
        "unique_tokens",
        "token_diversity_score",
        "contract_interaction_count",
        "unique_contracts",
        "is_new_account",
        "high_frequency",
        "high_variance",
    ];

    /// Every numeric feature as `(name, value)`
    pub fn numeric_features(&self) -> [(&'static str, f64); 19] {
        let values = [
            self.balance,
            self.total_txns as f64,
            self.txn_frequency,
            self.avg_txn_value,
            self.txn_value_variance,
            self.max_txn_value,
            self.incoming_txn_ratio,
            self.unique_addresses as f64,
            self.account_age_days as f64,
            self.avg_gas_price,
            self.failed_txn_ratio,
            self.token_transfer_count as f64,
            self.unique_tokens as f64,
            self.token_diversity_score,
            self.contract_interaction_count as f64,
            self.unique_contracts as f64,
            f64::from(self.is_new_account),
            f64::from(self.high_frequency),
            f64::from(self.high_variance),
        ];

        let mut out = [("", 0.0); 19];
        for (slot, (name, value)) in out
            .iter_mut()
            .zip(Self::NUMERIC_FEATURES.iter().zip(values))
        {
            *slot = (*name, value);
        }
        out
    }
}

// ============================================
// Risk Verdict
// ============================================

/// Risk level classification for a wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Score bands: 0-33 low, 34-66 medium, 67-100 high
    pub fn from_score(score: u8) -> Self {
        match score {
            67..=u8::MAX => RiskLevel::High,
            34..=66 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Low => "🟢",
            RiskLevel::Medium => "🟡",
            RiskLevel::High => "🔴",
        }
    }
}

/// Final score / level / explanation triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskVerdict {
    /// 0-100
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    /// Never empty
    pub risk_factors: Vec<String>,
}

impl RiskVerdict {
    /// Build a verdict from accumulated points. Clamps the score to 100,
    /// derives the level from the clamped score and substitutes the
    /// sentinel factor when nothing fired.
    pub fn from_points(points: u32, risk_factors: Vec<String>) -> Self {
        let risk_score = points.min(100) as u8;
        let risk_factors = if risk_factors.is_empty() {
            vec![NO_RISK_FACTORS.to_string()]
        } else {
            risk_factors
        };

        Self {
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            risk_factors,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} Risk: {} ({}/100) | {}",
            self.risk_level.emoji(),
            self.risk_level.as_str().to_uppercase(),
            self.risk_score,
            self.risk_factors.join("; ")
        )
    }
}

// ============================================
// Pipeline output
// ============================================

/// Everything one analysis produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletAnalysis {
    pub address: String,
    pub features: FeatureVector,
    pub verdict: RiskVerdict,
    pub analyzed_at: DateTime<Utc>,
}

/// Display subset of the feature vector returned next to the verdict.
/// Values are copied verbatim (only balance is re-rounded for display).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub balance: f64,
    pub total_transactions: u64,
    pub transaction_frequency: f64,
    pub account_age_days: u64,
    pub unique_addresses: u64,
    pub token_transfers: u64,
    pub contract_interactions: u64,
}

impl From<&FeatureVector> for TransactionStats {
    fn from(features: &FeatureVector) -> Self {
        Self {
            balance: round_to(features.balance, 6),
            total_transactions: features.total_txns,
            transaction_frequency: features.txn_frequency,
            account_age_days: features.account_age_days,
            unique_addresses: features.unique_addresses,
            token_transfers: features.token_transfer_count,
            contract_interactions: features.contract_interaction_count,
        }
    }
}

// ============================================
// Address validation
// ============================================

/// Validate a `0x`-prefixed 20-byte hex address and return it lowercased
pub fn normalize_address(input: &str) -> AppResult<String> {
    let candidate = input.trim();
    if !candidate.starts_with("0x") || candidate.len() != 42 {
        return Err(AppError::invalid_address("Invalid Ethereum address format"));
    }
    Address::from_str(candidate)
        .map_err(|_| AppError::invalid_address("Invalid Ethereum address format"))?;
    Ok(candidate.to_lowercase())
}

/// Accepts strings, numbers and null; anything else becomes empty
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_bands() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(33), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(34), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(66), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(67), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::High);
    }

    #[test]
    fn test_verdict_clamps_and_falls_back() {
        let verdict = RiskVerdict::from_points(115, vec!["a".into()]);
        assert_eq!(verdict.risk_score, 100);
        assert_eq!(verdict.risk_level, RiskLevel::High);

        let quiet = RiskVerdict::from_points(0, Vec::new());
        assert_eq!(quiet.risk_factors, vec![NO_RISK_FACTORS.to_string()]);
        assert_eq!(quiet.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_risk_level_serializes_lowercase() {
        let json = serde_json::to_string(&RiskLevel::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }

    #[test]
    fn test_normalize_address() {
        let addr = normalize_address("0xDAC17F958D2ee523a2206206994597C13D831ec7").unwrap();
        assert_eq!(addr, "0xdac17f958d2ee523a2206206994597c13d831ec7");

        assert!(normalize_address("dac17f958d2ee523a2206206994597c13d831ec7").is_err());
        assert!(normalize_address("0x1234").is_err());
        assert!(normalize_address("0xZZC17F958D2ee523a2206206994597C13D831ec7").is_err());
    }

    #[test]
    fn test_transaction_deserializes_explorer_row() {
        let row = serde_json::json!({
            "blockNumber": "14000000",
            "timeStamp": "1650000000",
            "hash": "0xabc",
            "from": "0xaaa",
            "to": "",
            "value": "1000000000000000000",
            "gasPrice": "30000000000",
            "isError": "0"
        });
        let tx: NormalTransaction = serde_json::from_value(row).unwrap();
        assert_eq!(tx.timestamp_secs(), Some(1_650_000_000));
        assert_eq!(tx.value_raw, "1000000000000000000");
        assert_eq!(tx.to, "");
        assert!(!tx.is_failed());
    }

    #[test]
    fn test_pre_epoch_timestamp_is_malformed() {
        let tx = NormalTransaction {
            timestamp: "-86400".to_string(),
            ..NormalTransaction::default()
        };
        assert_eq!(tx.timestamp_secs(), None);
        assert_eq!(NormalTransaction::new(0, "a", "b", "0").timestamp_secs(), Some(0));
    }

    #[test]
    fn test_transaction_tolerates_missing_and_null_fields() {
        let row = serde_json::json!({ "timeStamp": 1650000000, "value": null });
        let tx: NormalTransaction = serde_json::from_value(row).unwrap();
        assert_eq!(tx.timestamp, "1650000000");
        assert_eq!(tx.value_raw, "");
        assert_eq!(tx.is_error, None);
        assert!(!tx.is_failed());
    }

    #[test]
    fn test_wallet_record_lowercases_address() {
        let record = WalletRecord::empty("0xABCDEF", Utc::now());
        assert_eq!(record.address(), "0xabcdef");
        assert!(record.normal_transactions().is_empty());
    }
}
