//! Risk Scoring Module
//!
//! Maps a `FeatureVector` to a `RiskVerdict`. Scoring sits behind the
//! [`RiskScorer`] trait so a learned model can replace the rule table
//! without touching callers or the feature contract.
//!
//! Rule table (each rule independent and additive, evaluated in order):
//!
//! | # | Condition                                   | Points |
//! |---|---------------------------------------------|--------|
//! | 1 | new account AND more than 50 transactions   | +30    |
//! | 2 | more than 10 transactions per day           | +20    |
//! | 3 | high value variance flag                    | +15    |
//! | 4 | failed ratio above 0.1                      | +25    |
//! | 5 | incoming ratio above 0.7 AND > 20 txns      | +25    |
//!
//! Score bands: 0-33 low, 34-66 medium, 67-100 high.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::errors::{AppError, AppResult};
use crate::models::types::{FeatureVector, RiskVerdict};

/// Strategy seam for turning features into a verdict.
///
/// Implementations must be pure: the same vector always yields the same verdict.
pub trait RiskScorer: Send + Sync {
    fn predict_risk(&self, features: &FeatureVector) -> RiskVerdict;

    /// Whether the scorer runs on learned parameters.
    /// Informational only; verdict semantics never depend on it.
    fn is_trained(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str;
}

// ============================================
// RULE TABLE
// ============================================

/// One row of the deterministic rule table
#[derive(Clone, Copy)]
pub struct ScoringRule {
    pub id: u8,
    pub points: u32,
    pub factor: &'static str,
    pub condition: fn(&FeatureVector) -> bool,
}

impl fmt::Debug for ScoringRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringRule")
            .field("id", &self.id)
            .field("points", &self.points)
            .field("factor", &self.factor)
            .finish()
    }
}

pub static RULES: [ScoringRule; 5] = [
    ScoringRule {
        id: 1,
        points: 30,
        factor: "New account with high activity",
        condition: new_account_with_high_activity,
    },
    ScoringRule {
        id: 2,
        points: 20,
        factor: "High transaction frequency",
        condition: high_transaction_frequency,
    },
    ScoringRule {
        id: 3,
        points: 15,
        factor: "High transaction value volatility",
        condition: high_value_volatility,
    },
    ScoringRule {
        id: 4,
        points: 25,
        factor: "High failed transaction ratio",
        condition: high_failed_ratio,
    },
    ScoringRule {
        id: 5,
        points: 25,
        factor: "Mixer-like behavior pattern",
        condition: mixer_like_pattern,
    },
];

fn new_account_with_high_activity(f: &FeatureVector) -> bool {
    f.is_new_account == 1 && f.total_txns > 50
}

fn high_transaction_frequency(f: &FeatureVector) -> bool {
    f.txn_frequency > 10.0
}

fn high_value_volatility(f: &FeatureVector) -> bool {
    f.high_variance == 1
}

fn high_failed_ratio(f: &FeatureVector) -> bool {
    f.failed_txn_ratio > 0.1
}

fn mixer_like_pattern(f: &FeatureVector) -> bool {
    f.incoming_txn_ratio > 0.7 && f.total_txns > 20
}

/// Fixed deterministic rule table
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedScorer;

impl RuleBasedScorer {
    pub fn new() -> Self {
        Self
    }

    /// Rules whose condition holds, in table order
    pub fn triggered_rules<'a>(
        &self,
        features: &'a FeatureVector,
    ) -> impl Iterator<Item = &'static ScoringRule> + 'a {
        RULES.iter().filter(move |rule| (rule.condition)(features))
    }
}

impl RiskScorer for RuleBasedScorer {
    fn predict_risk(&self, features: &FeatureVector) -> RiskVerdict {
        let mut points = 0u32;
        let mut factors = Vec::new();

        for rule in self.triggered_rules(features) {
            debug!(rule = rule.id, points = rule.points, "Rule triggered: {}", rule.factor);
            points += rule.points;
            factors.push(rule.factor.to_string());
        }

        RiskVerdict::from_points(points, factors)
    }

    fn name(&self) -> &'static str {
        "rules"
    }
}

// ============================================
// LEARNED SCORER
// ============================================

fn default_factor_threshold() -> f64 {
    0.5
}

/// Logistic model over named features, loaded from JSON:
///
/// ```json
/// { "bias": -3.0, "weights": { "failed_txn_ratio": 8.0 }, "factor_threshold": 0.5 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub bias: f64,
    pub weights: BTreeMap<String, f64>,
    /// Minimum contribution (in logits) for a feature to be reported
    #[serde(default = "default_factor_threshold")]
    pub factor_threshold: f64,
}

impl LinearModel {
    /// Load and validate a weights file
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::model_load_failed(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let model: Self = serde_json::from_str(&raw).map_err(|e| {
            AppError::model_load_failed(format!("Invalid model {}: {}", path.display(), e))
        })?;
        model.validate()?;
        Ok(model)
    }

    /// Every weight must name a known feature and be finite
    pub fn validate(&self) -> AppResult<()> {
        if !self.bias.is_finite() {
            return Err(AppError::model_load_failed("Model bias is not finite"));
        }
        for (name, weight) in &self.weights {
            if !FeatureVector::NUMERIC_FEATURES.contains(&name.as_str()) {
                return Err(AppError::model_load_failed(format!(
                    "Unknown feature in model: {}",
                    name
                )));
            }
            if !weight.is_finite() {
                return Err(AppError::model_load_failed(format!(
                    "Weight for {} is not finite",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Per-feature contributions (weight × value) in feature order
    pub fn contributions(&self, features: &FeatureVector) -> Vec<(&'static str, f64)> {
        features
            .numeric_features()
            .into_iter()
            .filter_map(|(name, value)| self.weights.get(name).map(|w| (name, w * value)))
            .collect()
    }
}

/// Scorer backed by a `LinearModel`. Without a model it scores with the
/// rule table, so swapping it in changes nothing until weights exist.
#[derive(Debug, Clone, Default)]
pub struct LearnedScorer {
    model: Option<LinearModel>,
    fallback: RuleBasedScorer,
}

impl LearnedScorer {
    pub fn untrained() -> Self {
        Self::default()
    }

    pub fn from_model(model: LinearModel) -> AppResult<Self> {
        model.validate()?;
        Ok(Self {
            model: Some(model),
            fallback: RuleBasedScorer,
        })
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let model = LinearModel::from_file(path)?;
        info!(
            "🤖 Loaded risk model from {} ({} weights)",
            path.display(),
            model.weights.len()
        );
        Self::from_model(model)
    }

    pub fn model(&self) -> Option<&LinearModel> {
        self.model.as_ref()
    }
}

impl RiskScorer for LearnedScorer {
    fn predict_risk(&self, features: &FeatureVector) -> RiskVerdict {
        let Some(model) = &self.model else {
            return self.fallback.predict_risk(features);
        };

        let mut contributions = model.contributions(features);
        let logit = model.bias + contributions.iter().map(|(_, c)| c).sum::<f64>();
        let probability = 1.0 / (1.0 + (-logit).exp());
        let points = (probability * 100.0).round() as u32;

        contributions.retain(|(_, c)| *c > model.factor_threshold);
        contributions.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });

        let factors = contributions
            .into_iter()
            .map(|(name, contribution)| format!("Model signal: {} ({:+.2})", name, contribution))
            .collect();

        debug!(logit, points, "Learned model scored wallet");
        RiskVerdict::from_points(points, factors)
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    fn name(&self) -> &'static str {
        "learned"
    }
}

// ============================================
// STRATEGY SELECTION
// ============================================

/// Configured scoring strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorerKind {
    #[default]
    Rules,
    Learned,
}

impl FromStr for ScorerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rules" | "rule_based" => Ok(Self::Rules),
            "learned" | "model" => Ok(Self::Learned),
            other => Err(format!("unknown scorer: {}", other)),
        }
    }
}

/// Build the configured scorer
pub fn build_scorer(kind: ScorerKind, model_path: Option<&Path>) -> AppResult<Arc<dyn RiskScorer>> {
    match (kind, model_path) {
        (ScorerKind::Rules, _) => Ok(Arc::new(RuleBasedScorer::new())),
        (ScorerKind::Learned, Some(path)) => Ok(Arc::new(LearnedScorer::load(path)?)),
        (ScorerKind::Learned, None) => {
            warn!("⚠️ RISK_SCORER=learned without RISK_MODEL_PATH, falling back to rule table");
            Ok(Arc::new(LearnedScorer::untrained()))
        }
    }
}
