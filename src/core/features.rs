//! Feature Extraction Module
//!
//! Turns an immutable `WalletRecord` into a fixed-shape `FeatureVector`.
//! Everything here is a pure function of (record, evaluation clock):
//! no I/O, no shared state, safe to run for any number of wallets in parallel.
//!
//! Malformed numeric fields never abort a wallet. The offending field is
//! read as zero for that one row (timestamps fall back to the evaluation
//! clock, so a broken row cannot make an account look ancient).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::models::types::{
    FeatureVector, NormalTransaction, TokenFeatures, TokenTransfer, TransactionFeatures,
    WalletRecord,
};
use crate::utils::constants::{
    parse_raw_amount, round_to, wei_to_eth, wei_to_gwei, HIGH_FREQUENCY_TXNS_PER_DAY,
    HIGH_VARIANCE_THRESHOLD, NEW_ACCOUNT_MAX_AGE_DAYS, SECONDS_PER_DAY,
};

/// Which recipient counts as "incoming" for `incoming_txn_ratio`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomingRatioPolicy {
    /// Compare against the recipient of the first transaction in the list.
    /// Assumes the oldest transaction funded the wallet.
    #[default]
    FirstRecipient,
    /// Compare against the analyzed wallet's own address
    QueriedAddress,
}

impl IncomingRatioPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstRecipient => "first_recipient",
            Self::QueriedAddress => "queried_address",
        }
    }
}

impl fmt::Display for IncomingRatioPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncomingRatioPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "first_recipient" => Ok(Self::FirstRecipient),
            "queried_address" | "wallet" => Ok(Self::QueriedAddress),
            other => Err(format!("unknown incoming ratio policy: {}", other)),
        }
    }
}

/// Stateless feature extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor {
    incoming_policy: IncomingRatioPolicy,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_incoming_policy(incoming_policy: IncomingRatioPolicy) -> Self {
        Self { incoming_policy }
    }

    pub fn incoming_policy(&self) -> IncomingRatioPolicy {
        self.incoming_policy
    }

    /// Extract every feature, evaluating account age against the current time
    pub fn extract_all(&self, record: &WalletRecord) -> FeatureVector {
        self.extract_all_at(record, Utc::now())
    }

    /// Extract every feature against an explicit evaluation clock
    pub fn extract_all_at(&self, record: &WalletRecord, now: DateTime<Utc>) -> FeatureVector {
        let txn = self.extract_transaction_features(
            record.normal_transactions(),
            record.address(),
            now,
        );
        let tokens = self.extract_token_features(record.token_transfers());

        let is_new_account = flag(txn.account_age_days < NEW_ACCOUNT_MAX_AGE_DAYS);
        let high_frequency = flag(txn.txn_frequency > HIGH_FREQUENCY_TXNS_PER_DAY);
        let high_variance = flag(txn.txn_value_variance > HIGH_VARIANCE_THRESHOLD);

        FeatureVector {
            address: record.address().to_string(),
            balance: record.balance(),

            total_txns: txn.total_txns,
            txn_frequency: txn.txn_frequency,
            avg_txn_value: txn.avg_txn_value,
            txn_value_variance: txn.txn_value_variance,
            max_txn_value: txn.max_txn_value,
            incoming_txn_ratio: txn.incoming_txn_ratio,
            unique_addresses: txn.unique_addresses,
            account_age_days: txn.account_age_days,
            avg_gas_price: txn.avg_gas_price,
            failed_txn_ratio: txn.failed_txn_ratio,

            token_transfer_count: tokens.token_transfer_count,
            unique_tokens: tokens.unique_tokens,
            token_diversity_score: tokens.token_diversity_score,

            contract_interaction_count: 0,
            unique_contracts: 0,

            is_new_account,
            high_frequency,
            high_variance,
        }
    }

    /// Aggregate statistics over normal transactions.
    ///
    /// `wallet_address` is only consulted under
    /// [`IncomingRatioPolicy::QueriedAddress`].
    pub fn extract_transaction_features(
        &self,
        transactions: &[NormalTransaction],
        wallet_address: &str,
        now: DateTime<Utc>,
    ) -> TransactionFeatures {
        let Some(first) = transactions.first() else {
            return TransactionFeatures::default();
        };

        let now_secs = now.timestamp();
        let reference_recipient = match self.incoming_policy {
            IncomingRatioPolicy::FirstRecipient => first.to.to_lowercase(),
            IncomingRatioPolicy::QueriedAddress => wallet_address.to_lowercase(),
        };

        let mut stats = ValueStats::default();
        let mut earliest = i64::MAX;
        let mut gas_sum = 0.0;
        let mut incoming = 0u64;
        let mut failed = 0u64;
        let mut malformed = 0usize;
        let mut counterparties: HashSet<String> = HashSet::new();

        for (index, tx) in transactions.iter().enumerate() {
            let timestamp = tx.timestamp_secs().unwrap_or_else(|| {
                malformed += 1;
                debug!(index, raw = %tx.timestamp, "Malformed timeStamp, using evaluation clock");
                now_secs
            });
            earliest = earliest.min(timestamp);

            let value = match parse_raw_amount(&tx.value_raw) {
                Some(wei) => wei_to_eth(wei),
                None => {
                    malformed += 1;
                    debug!(index, raw = %tx.value_raw, "Malformed value, using 0");
                    0.0
                }
            };
            stats.push(value);

            gas_sum += match parse_raw_amount(&tx.gas_price_raw) {
                Some(wei) => wei_to_gwei(wei),
                None => {
                    malformed += 1;
                    debug!(index, raw = %tx.gas_price_raw, "Malformed gasPrice, using 0");
                    0.0
                }
            };

            if tx.to.to_lowercase() == reference_recipient {
                incoming += 1;
            }
            if tx.is_failed() {
                failed += 1;
            }

            // contract creation has an empty `to`, which counts as its own party
            counterparties.insert(tx.from.to_lowercase());
            counterparties.insert(tx.to.to_lowercase());
        }

        if malformed > 0 {
            warn!(
                malformed,
                total = transactions.len(),
                "⚠️ Substituted zero for malformed transaction fields"
            );
        }

        let total = transactions.len() as u64;
        let count = total as f64;
        let account_age_days = (now_secs.saturating_sub(earliest) / SECONDS_PER_DAY).max(0) as u64;
        let txn_frequency = if account_age_days > 0 {
            count / account_age_days as f64
        } else {
            count
        };

        TransactionFeatures {
            total_txns: total,
            txn_frequency: round_to(txn_frequency, 4),
            avg_txn_value: round_to(stats.mean, 6),
            txn_value_variance: round_to(stats.sample_variance(), 6),
            max_txn_value: round_to(stats.max, 6),
            incoming_txn_ratio: round_to(incoming as f64 / count, 4),
            unique_addresses: counterparties.len() as u64,
            account_age_days,
            avg_gas_price: round_to(gas_sum / count, 2),
            failed_txn_ratio: round_to(failed as f64 / count, 4),
        }
    }

    /// Count and diversity of ERC-20 activity. Symbols are compared
    /// verbatim; an empty symbol is a distinct value.
    pub fn extract_token_features(&self, transfers: &[TokenTransfer]) -> TokenFeatures {
        if transfers.is_empty() {
            return TokenFeatures::default();
        }

        // BTreeMap keeps the entropy summation order stable across runs
        let mut symbol_counts: BTreeMap<&str, u64> = BTreeMap::new();
        for transfer in transfers {
            *symbol_counts.entry(transfer.token_symbol.as_str()).or_insert(0) += 1;
        }

        TokenFeatures {
            token_transfer_count: transfers.len() as u64,
            unique_tokens: symbol_counts.len() as u64,
            token_diversity_score: round_to(shannon_entropy(symbol_counts.values().copied()), 4),
        }
    }
}

/// Base-2 Shannon entropy of a frequency distribution
pub fn shannon_entropy(counts: impl IntoIterator<Item = u64> + Clone) -> f64 {
    let total: u64 = counts.clone().into_iter().sum();
    if total == 0 {
        return 0.0;
    }

    counts
        .into_iter()
        .filter(|&c| c > 0)
        .map(|c| {
            let p = c as f64 / total as f64;
            p * (1.0 / p).log2()
        })
        .sum()
}

#[inline]
fn flag(condition: bool) -> u8 {
    u8::from(condition)
}

/// Running mean/max/variance (Welford)
#[derive(Debug, Default)]
struct ValueStats {
    count: u64,
    mean: f64,
    m2: f64,
    max: f64,
}

impl ValueStats {
    fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        if self.count == 1 || value > self.max {
            self.max = value;
        }
    }

    /// n-1 denominator; a single observation has no spread
    fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }
}
