//! Integration tests for the wallet risk pipeline

use axum::{extract::Query, routing::get, Json, Router};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use wallet_risk::{
    AnalyzerConfig, ErrorCode, EtherscanClient, ExplorerConfig, FeatureExtractor,
    IncomingRatioPolicy, NormalTransaction, RiskLevel, RiskScorer, RuleBasedScorer,
    StaticWalletSource, TokenTransfer, WalletAnalyzer, WalletRecord, WalletSource,
    NO_RISK_FACTORS,
};

const WALLET: &str = "0x1111111111111111111111111111111111111111";
const FUNDER: &str = "0x2222222222222222222222222222222222222222";
const OTHER: &str = "0x3333333333333333333333333333333333333333";
const TENTH_ETH: &str = "100000000000000000";

fn clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// 60 transactions over 10 days: 20% failed, 80% sent to the wallet
fn suspicious_record() -> WalletRecord {
    let start = clock().timestamp() - 10 * 86_400;
    let txns = (0..60)
        .map(|i| {
            let to = if i % 5 == 4 { OTHER } else { WALLET };
            let tx = NormalTransaction::new(start + i * 4 * 3600, FUNDER, to, TENTH_ETH)
                .with_gas_price("20000000000");
            if i % 5 == 2 {
                tx.failed()
            } else {
                tx
            }
        })
        .collect();
    WalletRecord::new(WALLET, 1.25, txns, Vec::new(), clock())
}

fn rule_analyzer(records: Vec<WalletRecord>) -> WalletAnalyzer {
    WalletAnalyzer::new(
        Arc::new(StaticWalletSource::from_records(records)),
        FeatureExtractor::new(),
        Arc::new(RuleBasedScorer::new()),
    )
}

#[test]
fn test_suspicious_wallet_scores_high() {
    let analysis = rule_analyzer(Vec::new()).assess(&suspicious_record(), clock());
    let f = &analysis.features;

    assert_eq!(f.total_txns, 60);
    assert_eq!(f.account_age_days, 10);
    assert_eq!(f.txn_frequency, 6.0);
    assert_eq!(f.failed_txn_ratio, 0.2);
    assert_eq!(f.incoming_txn_ratio, 0.8);
    assert_eq!(f.avg_txn_value, 0.1);
    assert_eq!(f.txn_value_variance, 0.0);
    assert_eq!(f.avg_gas_price, 20.0);
    assert_eq!(f.unique_addresses, 3);
    assert_eq!((f.is_new_account, f.high_frequency, f.high_variance), (1, 0, 0));

    assert_eq!(analysis.verdict.risk_score, 80);
    assert_eq!(analysis.verdict.risk_level, RiskLevel::High);
    assert_eq!(
        analysis.verdict.risk_factors,
        vec![
            "New account with high activity",
            "High failed transaction ratio",
            "Mixer-like behavior pattern",
        ]
    );
}

#[test]
fn test_empty_wallet_is_low_risk() {
    let record = WalletRecord::empty(WALLET, clock());
    let analysis = rule_analyzer(Vec::new()).assess(&record, clock());

    let f = &analysis.features;
    assert_eq!(f.total_txns, 0);
    assert_eq!(f.txn_frequency, 0.0);
    assert_eq!(f.token_diversity_score, 0.0);
    assert_eq!(f.account_age_days, 0);
    assert_eq!(f.is_new_account, 1);

    assert_eq!(analysis.verdict.risk_score, 0);
    assert_eq!(analysis.verdict.risk_level, RiskLevel::Low);
    assert_eq!(analysis.verdict.risk_factors, vec![NO_RISK_FACTORS.to_string()]);
}

#[test]
fn test_malformed_rows_do_not_abort() {
    let mut broken = NormalTransaction::new(0, FUNDER, WALLET, "not-a-number");
    broken.timestamp = "yesterday".to_string();
    broken.gas_price_raw = String::new();
    broken.is_error = None;

    let good = NormalTransaction::new(clock().timestamp() - 2 * 86_400, FUNDER, WALLET, TENTH_ETH);
    let record = WalletRecord::new(WALLET, 0.0, vec![broken, good], Vec::new(), clock());

    let features = FeatureExtractor::new().extract_all_at(&record, clock());
    assert_eq!(features.total_txns, 2);
    assert_eq!(features.account_age_days, 2);
    assert_eq!(features.max_txn_value, 0.1);
    assert_eq!(features.avg_txn_value, 0.05);
    assert_eq!(features.failed_txn_ratio, 0.0);
}

#[test]
fn test_token_diversity() {
    let transfers = ["USDC", "USDC", "DAI", "WETH"]
        .iter()
        .map(|symbol| TokenTransfer::new(clock().timestamp(), *symbol))
        .collect();
    let record = WalletRecord::new(WALLET, 0.0, Vec::new(), transfers, clock());

    let features = FeatureExtractor::new().extract_all_at(&record, clock());
    assert_eq!(features.token_transfer_count, 4);
    assert_eq!(features.unique_tokens, 3);
    assert_eq!(features.token_diversity_score, 1.5);
}

#[test]
fn test_incoming_ratio_policies() {
    let now = clock();
    let txns = vec![
        NormalTransaction::new(now.timestamp() - 86_400, WALLET, OTHER, TENTH_ETH),
        NormalTransaction::new(now.timestamp() - 3_600, FUNDER, WALLET, TENTH_ETH),
        NormalTransaction::new(now.timestamp() - 60, FUNDER, WALLET, TENTH_ETH),
        NormalTransaction::new(now.timestamp() - 30, WALLET, OTHER, TENTH_ETH),
    ];
    let record = WalletRecord::new(WALLET, 0.0, txns, Vec::new(), now);

    let first_recipient = FeatureExtractor::new().extract_all_at(&record, now);
    assert_eq!(first_recipient.incoming_txn_ratio, 0.5);

    let queried = FeatureExtractor::with_incoming_policy(IncomingRatioPolicy::QueriedAddress)
        .extract_all_at(&record, now);
    assert_eq!(queried.incoming_txn_ratio, 0.5);

    // first transaction went out, so the two policies disagree on who "received"
    let skewed = WalletRecord::new(
        WALLET,
        0.0,
        vec![
            NormalTransaction::new(now.timestamp() - 86_400, WALLET, OTHER, TENTH_ETH),
            NormalTransaction::new(now.timestamp() - 60, FUNDER, WALLET, TENTH_ETH),
            NormalTransaction::new(now.timestamp() - 30, FUNDER, WALLET, TENTH_ETH),
        ],
        Vec::new(),
        now,
    );
    assert_eq!(FeatureExtractor::new().extract_all_at(&skewed, now).incoming_txn_ratio, 0.3333);
    assert_eq!(
        FeatureExtractor::with_incoming_policy(IncomingRatioPolicy::QueriedAddress)
            .extract_all_at(&skewed, now)
            .incoming_txn_ratio,
        0.6667
    );
}

#[tokio::test]
async fn test_concurrent_assessments_agree() {
    let analyzer = Arc::new(rule_analyzer(vec![suspicious_record()]));
    let expected = analyzer.assess(&suspicious_record(), clock());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let analyzer = analyzer.clone();
            tokio::spawn(async move { analyzer.assess(&suspicious_record(), clock()) })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), expected);
    }
}

#[tokio::test]
async fn test_recorded_wallet_round_trip() {
    let record = suspicious_record();
    let path = std::env::temp_dir().join("wallet_risk_integration_dump.json");
    std::fs::write(&path, serde_json::to_string(&record).unwrap()).unwrap();

    let source = Arc::new(StaticWalletSource::from_json_file(&path).unwrap());
    let analyzer = WalletAnalyzer::with_source(source, &AnalyzerConfig::default()).unwrap();
    assert_eq!(analyzer.scorer_name(), "rules");
    assert!(!analyzer.is_trained());

    let analysis = analyzer.analyze(WALLET).await.unwrap();
    assert_eq!(analysis.features.total_txns, 60);
    assert_eq!(analysis.features.balance, 1.25);

    let _ = std::fs::remove_file(path);
}

// ============================================
// Explorer client against a local mock
// ============================================

async fn mock_explorer(params: Query<HashMap<String, String>>) -> Json<Value> {
    if params.get("apikey").map(String::as_str) == Some("bad-key") {
        return Json(json!({"status": "0", "message": "NOTOK", "result": "Invalid API Key"}));
    }
    if params.get("chainid").map(String::as_str) != Some("1") {
        return Json(json!({"status": "0", "message": "NOTOK", "result": "Missing chainid"}));
    }

    let body = match params.get("action").map(String::as_str) {
        Some("balance") => json!({"status": "1", "message": "OK", "result": "2000000000000000000"}),
        Some("txlist") => json!({
            "status": "1",
            "message": "OK",
            "result": [
                {
                    "timeStamp": "1700000000",
                    "from": FUNDER,
                    "to": WALLET,
                    "value": "1000000000000000000",
                    "gasPrice": "30000000000",
                    "isError": "0"
                },
                {
                    "timeStamp": "1700086400",
                    "from": WALLET,
                    "to": OTHER,
                    "value": "500000000000000000",
                    "gasPrice": "10000000000",
                    "isError": "1"
                }
            ]
        }),
        Some("tokentx") => json!({"status": "0", "message": "No transactions found", "result": []}),
        _ => json!({"status": "0", "message": "NOTOK", "result": "Unknown action"}),
    };
    Json(body)
}

async fn spawn_mock_explorer() -> String {
    let app = Router::new().route("/api", get(mock_explorer));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

fn explorer_config(base_url: String, api_key: &str) -> ExplorerConfig {
    ExplorerConfig {
        api_key: api_key.to_string(),
        base_url,
        rate_limit_delay: Duration::from_millis(10),
        max_retries: 1,
        ..ExplorerConfig::default()
    }
}

#[tokio::test]
async fn test_explorer_client_builds_record() {
    let base_url = spawn_mock_explorer().await;
    let client = EtherscanClient::new(explorer_config(base_url, "test-key")).unwrap();

    let record = client.fetch_wallet(WALLET).await.unwrap();
    assert_eq!(record.address(), WALLET);
    assert_eq!(record.balance(), 2.0);
    assert_eq!(record.normal_transactions().len(), 2);
    assert!(record.token_transfers().is_empty());

    let analyzer = WalletAnalyzer::with_source(Arc::new(client), &AnalyzerConfig::default()).unwrap();
    let now = Utc.timestamp_opt(1_700_000_000 + 5 * 86_400, 0).unwrap();
    let analysis = analyzer.assess(&record, now);
    assert_eq!(analysis.features.account_age_days, 5);
    assert_eq!(analysis.features.failed_txn_ratio, 0.5);
    assert_eq!(analysis.features.avg_gas_price, 20.0);
    assert_eq!(analysis.features.max_txn_value, 1.0);
    // rule 4 only: 0.5 failed ratio
    assert_eq!(analysis.verdict.risk_score, 25);
    assert_eq!(analysis.verdict.risk_level, RiskLevel::Low);
}

#[tokio::test]
async fn test_explorer_notok_fails_wallet() {
    let base_url = spawn_mock_explorer().await;
    let client = EtherscanClient::new(explorer_config(base_url, "bad-key")).unwrap();

    let err = client.fetch_wallet(WALLET).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ExplorerApiError);
    assert_eq!(err.message, "Etherscan API Error: Invalid API Key");
    assert!(err.is_ingestion_failure());
}

#[test]
fn test_scorer_is_pure() {
    let features = FeatureExtractor::new().extract_all_at(&suspicious_record(), clock());
    let scorer = RuleBasedScorer::new();
    assert_eq!(scorer.predict_risk(&features), scorer.predict_risk(&features));
}
