//! Wallet analyzer
//! Orchestrates the pipeline: fetch → extract → score

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::features::FeatureExtractor;
use super::risk_score::{build_scorer, RiskScorer};
use crate::models::config::AnalyzerConfig;
use crate::models::errors::AppResult;
use crate::models::types::{normalize_address, WalletAnalysis, WalletRecord};
use crate::providers::{EtherscanClient, WalletSource};

/// Fetches a wallet from its source and runs it through extraction and
/// scoring. Holds no per-wallet state, so one instance serves any number
/// of concurrent analyses.
pub struct WalletAnalyzer {
    source: Arc<dyn WalletSource>,
    extractor: FeatureExtractor,
    scorer: Arc<dyn RiskScorer>,
}

impl WalletAnalyzer {
    pub fn new(
        source: Arc<dyn WalletSource>,
        extractor: FeatureExtractor,
        scorer: Arc<dyn RiskScorer>,
    ) -> Self {
        Self {
            source,
            extractor,
            scorer,
        }
    }

    /// Live analyzer backed by Etherscan
    pub fn from_config(config: &AnalyzerConfig) -> AppResult<Self> {
        let client = EtherscanClient::new(config.explorer.clone())?;
        Self::with_source(Arc::new(client), config)
    }

    /// Analyzer over any source, with extraction and scoring from config
    pub fn with_source(source: Arc<dyn WalletSource>, config: &AnalyzerConfig) -> AppResult<Self> {
        let scorer = build_scorer(config.scorer, config.model_path.as_deref())?;
        let extractor = FeatureExtractor::with_incoming_policy(config.incoming_ratio_policy);

        info!(
            "🧠 Analyzer ready: source={}, scorer={} (trained: {}), incoming policy={}",
            source.name(),
            scorer.name(),
            scorer.is_trained(),
            extractor.incoming_policy()
        );

        Ok(Self::new(source, extractor, scorer))
    }

    /// Validate the address, fetch the wallet and score it
    pub async fn analyze(&self, address: &str) -> AppResult<WalletAnalysis> {
        let address = normalize_address(address)?;
        let start = Instant::now();

        let record = self.source.fetch_wallet(&address).await.map_err(|e| {
            warn!("❌ Ingestion failed for {}: {}", address, e);
            e
        })?;
        debug!(
            "Fetched {} in {}ms (snapshot {})",
            address,
            start.elapsed().as_millis(),
            record.fetched_at().to_rfc3339()
        );

        Ok(self.assess(&record, Utc::now()))
    }

    /// Score an already fetched record against an explicit clock
    pub fn assess(&self, record: &WalletRecord, now: DateTime<Utc>) -> WalletAnalysis {
        let features = self.extractor.extract_all_at(record, now);
        let verdict = self.scorer.predict_risk(&features);

        info!("{} {} → {}", verdict.risk_level.emoji(), record.address(), verdict.summary());

        WalletAnalysis {
            address: record.address().to_string(),
            features,
            verdict,
            analyzed_at: now,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    pub fn is_trained(&self) -> bool {
        self.scorer.is_trained()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::risk_score::RuleBasedScorer;
    use crate::models::errors::ErrorCode;
    use crate::models::types::{NormalTransaction, RiskLevel, NO_RISK_FACTORS};
    use crate::providers::StaticWalletSource;
    use chrono::TimeZone;

    const WALLET: &str = "0x1234567890abcdef1234567890abcdef12345678";

    fn analyzer(records: Vec<WalletRecord>) -> WalletAnalyzer {
        WalletAnalyzer::new(
            Arc::new(StaticWalletSource::from_records(records)),
            FeatureExtractor::new(),
            Arc::new(RuleBasedScorer::new()),
        )
    }

    #[tokio::test]
    async fn test_rejects_bad_address_before_fetch() {
        let err = analyzer(Vec::new()).analyze("0x123").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAddress);
        assert_eq!(err.message, "Invalid Ethereum address format");
    }

    #[tokio::test]
    async fn test_analyze_normalizes_address() {
        let fetched = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let analyzer = analyzer(vec![WalletRecord::empty(WALLET, fetched)]);

        let analysis = analyzer.analyze(&WALLET.to_uppercase().replacen("0X", "0x", 1)).await.unwrap();
        assert_eq!(analysis.address, WALLET);
        assert_eq!(analysis.verdict.risk_score, 0);
        assert_eq!(analysis.verdict.risk_factors, vec![NO_RISK_FACTORS.to_string()]);
    }

    #[tokio::test]
    async fn test_missing_wallet_is_error() {
        let err = analyzer(Vec::new()).analyze(WALLET).await.unwrap_err();
        assert!(err.is_ingestion_failure());
    }

    #[test]
    fn test_assess_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let start = now.timestamp() - 5 * 86_400;
        let txns = (0..60)
            .map(|i| {
                let tx = NormalTransaction::new(start + i * 600, "0xfeed", WALLET, "1000000000000000000");
                if i % 4 == 0 {
                    tx.failed()
                } else {
                    tx
                }
            })
            .collect();
        let record = WalletRecord::new(WALLET, 3.0, txns, Vec::new(), now);
        let analyzer = analyzer(Vec::new());

        let first = analyzer.assess(&record, now);
        let second = analyzer.assess(&record, now);
        assert_eq!(first, second);
        assert_eq!(first.verdict.risk_level, RiskLevel::High);
        assert!(first
            .verdict
            .risk_factors
            .contains(&"New account with high activity".to_string()));
    }
}
