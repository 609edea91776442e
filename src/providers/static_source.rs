//! Recorded wallet dumps
//!
//! Serves `WalletRecord`s captured earlier (same JSON shape the CLI
//! writes with `--dump`), for offline analysis and tests.

use futures_util::future::BoxFuture;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::WalletSource;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::WalletRecord;

#[derive(Deserialize)]
#[serde(untagged)]
enum DumpFile {
    Many(Vec<WalletRecord>),
    One(Box<WalletRecord>),
}

#[derive(Debug, Clone, Default)]
pub struct StaticWalletSource {
    records: HashMap<String, WalletRecord>,
}

impl StaticWalletSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = WalletRecord>) -> Self {
        let mut source = Self::new();
        for record in records {
            source.insert(record);
        }
        source
    }

    /// Load a dump holding one record or an array of records
    pub fn from_json_file(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let source = match serde_json::from_str::<DumpFile>(&raw)? {
            DumpFile::Many(records) => Self::from_records(records),
            DumpFile::One(record) => Self::from_records([*record]),
        };
        info!("📂 Loaded {} wallet record(s) from {}", source.len(), path.display());
        Ok(source)
    }

    pub fn insert(&mut self, record: WalletRecord) {
        let record = record.into_normalized();
        self.records.insert(record.address().to_string(), record);
    }

    pub fn get(&self, address: &str) -> Option<&WalletRecord> {
        self.records.get(&address.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Addresses held, sorted
    pub fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.records.keys().cloned().collect();
        addresses.sort();
        addresses
    }
}

impl WalletSource for StaticWalletSource {
    fn fetch_wallet<'a>(&'a self, address: &'a str) -> BoxFuture<'a, AppResult<WalletRecord>> {
        Box::pin(async move {
            self.get(address)
                .cloned()
                .ok_or_else(|| AppError::wallet_not_found(address))
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
