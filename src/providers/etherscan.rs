//! Etherscan V2 API Client
//!
//! Three calls per wallet, all against the multi-chain endpoint with
//! `chainid`:
//! - `account/balance`  → native balance in wei
//! - `account/txlist`   → normal transactions, ascending, one page
//! - `account/tokentx`  → ERC-20 transfers, ascending, one page
//!
//! `status=0, message=NOTOK` is an error. Any other non-list `result`
//! (e.g. "No transactions found") is read as an empty history.
//! Timeouts, connection failures and HTTP 429 are retried with
//! exponential backoff plus jitter.

use chrono::Utc;
use futures_util::future::BoxFuture;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::pacer::RequestPacer;
use super::WalletSource;
use crate::models::config::ExplorerConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{NormalTransaction, TokenTransfer, WalletRecord};
use crate::utils::constants::{
    get_chain_name, parse_raw_amount, wei_to_eth, BASE_RETRY_DELAY_MS, END_BLOCK,
    MAX_RETRY_DELAY_MS, RETRY_JITTER_PERCENT, USER_AGENT as USER_AGENT_CONST,
};

/// Raw explorer response envelope
#[derive(Debug, Deserialize)]
pub struct ExplorerEnvelope {
    #[serde(default)]
    pub status: Value,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: Value,
}

impl ExplorerEnvelope {
    /// Reject `status=0, message=NOTOK`, hand back `result` otherwise
    pub fn into_result(self) -> AppResult<Value> {
        let status_zero = match &self.status {
            Value::String(s) => s == "0",
            Value::Number(n) => n.as_u64() == Some(0),
            _ => false,
        };

        if status_zero && self.message == "NOTOK" {
            let detail = match self.result {
                Value::String(s) => s,
                Value::Null => "Unknown error".to_string(),
                other => other.to_string(),
            };
            return Err(AppError::explorer_error(detail));
        }

        Ok(self.result)
    }
}

/// Turn a `result` into rows. Non-lists become empty; rows that do not
/// even have an object shape are dropped.
pub fn rows_from_result<T: DeserializeOwned>(result: Value) -> Vec<T> {
    let Value::Array(items) = result else {
        if let Value::String(text) = &result {
            debug!("Explorer returned non-list result: {}", text);
        }
        return Vec::new();
    };

    let total = items.len();
    let rows: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(row) => Some(row),
            Err(e) => {
                debug!("Skipping unreadable explorer row: {}", e);
                None
            }
        })
        .collect();

    if rows.len() < total {
        warn!("⚠️ Dropped {} of {} explorer rows", total - rows.len(), total);
    }
    rows
}

/// Balance `result` (wei string) in native units
pub fn balance_from_result(result: &Value) -> AppResult<f64> {
    let raw = match result {
        Value::String(s) => s.as_str(),
        Value::Null => "0",
        other => {
            return Err(AppError::invalid_response(format!(
                "Unexpected balance result: {}",
                other
            )))
        }
    };

    parse_raw_amount(raw)
        .map(wei_to_eth)
        .ok_or_else(|| AppError::invalid_response(format!("Unparseable balance: {:?}", raw)))
}

/// Backoff delay before retry number `attempt` (1-based)
fn retry_delay(attempt: u32) -> Duration {
    let base = BASE_RETRY_DELAY_MS.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
    let capped = base.min(MAX_RETRY_DELAY_MS);
    let jitter_range = (capped * RETRY_JITTER_PERCENT) / 100;
    let jitter: i64 = rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64));
    Duration::from_millis((capped as i64 + jitter).max(100) as u64)
}

/// Etherscan V2 client. Owns its pacer, so two clients never throttle
/// each other.
pub struct EtherscanClient {
    client: reqwest::Client,
    config: ExplorerConfig,
    pacer: RequestPacer,
}

impl EtherscanClient {
    pub fn new(config: ExplorerConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .gzip(true)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        let pacer = RequestPacer::new(config.rate_limit_delay);
        info!(
            "🔗 Etherscan client ready for chain {} ({}), min interval {}ms",
            config.chain_id,
            get_chain_name(config.chain_id),
            pacer.min_interval().as_millis()
        );

        Ok(Self {
            client,
            pacer,
            config,
        })
    }

    /// Native balance in whole units (wei / 1e18)
    pub async fn get_account_balance(&self, address: &str) -> AppResult<f64> {
        let result = self
            .request(&[
                ("module", "account".to_string()),
                ("action", "balance".to_string()),
                ("address", address.to_string()),
                ("tag", "latest".to_string()),
            ])
            .await?;
        balance_from_result(&result)
    }

    /// Normal transactions from `start_block`, ascending
    pub async fn get_normal_transactions(
        &self,
        address: &str,
        start_block: u64,
    ) -> AppResult<Vec<NormalTransaction>> {
        let result = self.request(&self.history_params("txlist", address, start_block)).await?;
        Ok(rows_from_result(result))
    }

    /// ERC-20 transfers, ascending
    pub async fn get_erc20_transfers(&self, address: &str) -> AppResult<Vec<TokenTransfer>> {
        let result = self.request(&self.history_params("tokentx", address, 0)).await?;
        Ok(rows_from_result(result))
    }

    /// Balance, normal transactions and token transfers in one record
    pub async fn get_full_wallet_data(&self, address: &str) -> AppResult<WalletRecord> {
        info!("📥 Fetching data for wallet: {}", address);

        let balance = self.get_account_balance(address).await?;
        let normal_transactions = self.get_normal_transactions(address, 0).await?;
        let token_transfers = self.get_erc20_transfers(address).await?;

        info!(
            "📥 Fetched {} transactions, {} token transfers",
            normal_transactions.len(),
            token_transfers.len()
        );

        Ok(WalletRecord::new(
            address,
            balance,
            normal_transactions,
            token_transfers,
            Utc::now(),
        ))
    }

    fn history_params(&self, action: &str, address: &str, start_block: u64) -> Vec<(&'static str, String)> {
        vec![
            ("module", "account".to_string()),
            ("action", action.to_string()),
            ("address", address.to_string()),
            ("startblock", start_block.to_string()),
            ("endblock", END_BLOCK.to_string()),
            ("page", "1".to_string()),
            ("offset", self.config.page_size.to_string()),
            ("sort", "asc".to_string()),
        ]
    }

    /// Paced request with retry on transient failures
    async fn request(&self, params: &[(&'static str, String)]) -> AppResult<Value> {
        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = retry_delay(attempt);
                debug!("⏳ Retry {}/{} after {}ms", attempt + 1, attempts, delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            match self.execute(params).await {
                Ok(result) => return Ok(result),
                Err(e) if e.code.is_retryable() => {
                    if e.code == ErrorCode::FetchRateLimited {
                        warn!("⏳ Explorer rate limited (HTTP 429), attempt {}/{}", attempt + 1, attempts);
                    } else {
                        warn!("⚠️ Explorer call failed ({}), attempt {}/{}", e, attempt + 1, attempts);
                    }
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::internal("Explorer retries exhausted")))
    }

    async fn execute(&self, params: &[(&'static str, String)]) -> AppResult<Value> {
        self.pacer.wait().await;

        let chain_id = self.config.chain_id.to_string();
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("chainid", chain_id.as_str())])
            .query(params)
            .query(&[("apikey", self.config.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AppError::fetch_rate_limited());
        }
        if !status.is_success() {
            return Err(AppError::new(
                ErrorCode::FetchHttpError,
                format!("HTTP error: {}", status),
            ));
        }

        let envelope: ExplorerEnvelope = response.json().await?;
        envelope.into_result()
    }
}

impl WalletSource for EtherscanClient {
    fn fetch_wallet<'a>(&'a self, address: &'a str) -> BoxFuture<'a, AppResult<WalletRecord>> {
        Box::pin(self.get_full_wallet_data(address))
    }

    fn name(&self) -> &'static str {
        "etherscan"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> ExplorerEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_notok_is_error() {
        let err = envelope(json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Invalid API Key"
        }))
        .into_result()
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::ExplorerApiError);
        assert!(err.message.contains("Invalid API Key"));
    }

    #[test]
    fn test_no_transactions_is_empty() {
        let result = envelope(json!({
            "status": "0",
            "message": "No transactions found",
            "result": []
        }))
        .into_result()
        .unwrap();
        assert!(rows_from_result::<NormalTransaction>(result).is_empty());
    }

    #[test]
    fn test_non_list_result_is_empty() {
        let rows: Vec<TokenTransfer> = rows_from_result(json!("Max rate limit reached"));
        assert!(rows.is_empty());
    }

    #[test]
    fn test_rows_parse_explorer_fields() {
        let rows: Vec<NormalTransaction> = rows_from_result(json!([
            {
                "blockNumber": "1",
                "timeStamp": "1700000000",
                "from": "0xAAA",
                "to": "0xbbb",
                "value": "1000000000000000000",
                "gasPrice": "20000000000",
                "isError": "0"
            },
            "garbage"
        ]));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp_secs(), Some(1_700_000_000));
        assert_eq!(rows[0].gas_price_raw, "20000000000");
        assert!(!rows[0].is_failed());
    }

    #[test]
    fn test_balance_result() {
        assert_eq!(balance_from_result(&json!("2500000000000000000")).unwrap(), 2.5);
        assert_eq!(balance_from_result(&Value::Null).unwrap(), 0.0);
        assert!(balance_from_result(&json!("not a number")).is_err());
    }

    #[test]
    fn test_retry_delay_bounds() {
        for attempt in 1..10 {
            let delay = retry_delay(attempt).as_millis() as u64;
            assert!(delay >= 100);
            assert!(delay <= MAX_RETRY_DELAY_MS + MAX_RETRY_DELAY_MS * RETRY_JITTER_PERCENT / 100);
        }
    }
}
