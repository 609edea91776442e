//! Wallet Risk Library
//!
//! Fraud-risk assessment for blockchain wallets:
//! - Ingestion of balance and transaction history (Etherscan V2, recorded dumps)
//! - Deterministic feature extraction into a fixed-shape `FeatureVector`
//! - Pluggable scoring (rule table or learned weights) into a `RiskVerdict`
//! - REST API and CLI front ends

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::analyzer::WalletAnalyzer;
pub use crate::core::features::{shannon_entropy, FeatureExtractor, IncomingRatioPolicy};
pub use crate::core::risk_score::{
    build_scorer, LearnedScorer, LinearModel, RiskScorer, RuleBasedScorer, ScorerKind, RULES,
};
pub use models::config::{AnalyzerConfig, ExplorerConfig, ServerConfig};
pub use models::errors::{AppError, AppResult, ErrorCode};
pub use models::types::{
    normalize_address, FeatureVector, NormalTransaction, RiskLevel, RiskVerdict, TokenFeatures,
    TokenTransfer, TransactionFeatures, TransactionStats, WalletAnalysis, WalletRecord,
    NO_RISK_FACTORS,
};
pub use providers::{EtherscanClient, RequestPacer, StaticWalletSource, WalletSource};
pub use utils::telemetry::{TelemetryCollector, TelemetryStats};
