//! Telemetry Module
//!
//! In-process counters for analyses served: outcomes, risk level mix,
//! which risk factors fire, latency. No wallet addresses are stored.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::models::types::{RiskLevel, RiskVerdict, NO_RISK_FACTORS};

/// Aggregated statistics
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TelemetryStats {
    /// Wallets scored successfully
    pub total_analyzed: u64,
    /// Analyses that ended in an error
    pub total_failed: u64,
    pub low_risk: u64,
    pub medium_risk: u64,
    pub high_risk: u64,
    /// How often each risk factor appeared
    pub factor_counts: BTreeMap<String, u64>,
    pub avg_latency_ms: f64,
    /// Unix seconds
    pub period_start: i64,
    pub period_end: i64,
}

impl TelemetryStats {
    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "📊 analyzed={} failed={} ({} {} / {} {} / {} {}) avg_latency={:.1}ms",
            self.total_analyzed,
            self.total_failed,
            RiskLevel::Low.emoji(),
            self.low_risk,
            RiskLevel::Medium.emoji(),
            self.medium_risk,
            RiskLevel::High.emoji(),
            self.high_risk,
            self.avg_latency_ms
        )
    }
}

pub struct TelemetryCollector {
    total_analyzed: AtomicU64,
    total_failed: AtomicU64,
    low_risk: AtomicU64,
    medium_risk: AtomicU64,
    high_risk: AtomicU64,
    total_latency_ms: AtomicU64,
    factor_counts: RwLock<HashMap<String, u64>>,
    session_start: i64,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self {
            total_analyzed: AtomicU64::new(0),
            total_failed: AtomicU64::new(0),
            low_risk: AtomicU64::new(0),
            medium_risk: AtomicU64::new(0),
            high_risk: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            factor_counts: RwLock::new(HashMap::new()),
            session_start: chrono::Utc::now().timestamp(),
        }
    }

    /// Record a completed analysis
    pub fn record_analysis(&self, verdict: &RiskVerdict, latency_ms: u64) {
        self.total_analyzed.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);

        let level_counter = match verdict.risk_level {
            RiskLevel::Low => &self.low_risk,
            RiskLevel::Medium => &self.medium_risk,
            RiskLevel::High => &self.high_risk,
        };
        level_counter.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut counts) = self.factor_counts.write() {
            for factor in verdict.risk_factors.iter().filter(|f| *f != NO_RISK_FACTORS) {
                *counts.entry(factor.clone()).or_insert(0) += 1;
            }
        }
    }

    /// Record a failed analysis
    pub fn record_failure(&self, latency_ms: u64) {
        self.total_failed.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> TelemetryStats {
        let total_analyzed = self.total_analyzed.load(Ordering::Relaxed);
        let total_failed = self.total_failed.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);
        let attempts = total_analyzed + total_failed;

        let avg_latency_ms = if attempts > 0 {
            total_latency as f64 / attempts as f64
        } else {
            0.0
        };

        let factor_counts = self
            .factor_counts
            .read()
            .map(|counts| counts.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default();

        TelemetryStats {
            total_analyzed,
            total_failed,
            low_risk: self.low_risk.load(Ordering::Relaxed),
            medium_risk: self.medium_risk.load(Ordering::Relaxed),
            high_risk: self.high_risk.load(Ordering::Relaxed),
            factor_counts,
            avg_latency_ms,
            period_start: self.session_start,
            period_end: chrono::Utc::now().timestamp(),
        }
    }

    /// Write current stats to `<dir>/stats_<unix>.json`
    pub fn export_stats_json(&self, dir: &Path) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(dir)?;
        let stats = self.get_stats();
        let path = dir.join(format!("stats_{}.json", stats.period_end));
        fs::write(&path, serde_json::to_string_pretty(&stats)?)?;
        Ok(path)
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}
