use common::config::DEFAULT_WEIGHTS;
use serde::{Deserialize, Serialize};

use crate::wallet_features::{FeatureVector, FEATURE_COUNT};

pub const SCORE_MAX: f64 = 1000.0;

/// Keeps the final rescale finite when every raw score is equal.
pub const RESCALE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletScore {
    pub wallet: String,
    pub score: i64,
}

/// Positional weights; negative entries penalize a feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights(pub [f64; FEATURE_COUNT]);

impl Default for ScoreWeights {
    fn default() -> Self {
        Self(DEFAULT_WEIGHTS)
    }
}

/// Non-finite values (NaN, ±inf) are treated as missing and filled with 0.
pub fn impute_missing(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Scale each column to [0, 1] over the population. A constant column maps to 0.
pub fn min_max_scale_columns(rows: &[[f64; FEATURE_COUNT]]) -> Vec<[f64; FEATURE_COUNT]> {
    let mut lo = [f64::INFINITY; FEATURE_COUNT];
    let mut hi = [f64::NEG_INFINITY; FEATURE_COUNT];
    for row in rows {
        for (i, v) in row.iter().enumerate() {
            lo[i] = lo[i].min(*v);
            hi[i] = hi[i].max(*v);
        }
    }

    rows.iter()
        .map(|row| {
            let mut scaled = [0.0; FEATURE_COUNT];
            for (i, v) in row.iter().enumerate() {
                let range = hi[i] - lo[i];
                let range = if range == 0.0 { 1.0 } else { range };
                scaled[i] = (v - lo[i]) / range;
            }
            scaled
        })
        .collect()
}

pub fn weighted_sum(row: &[f64; FEATURE_COUNT], weights: &ScoreWeights) -> f64 {
    row.iter().zip(weights.0.iter()).map(|(x, w)| x * w).sum()
}

/// Map raw scores onto [0, 1000] by population min/max, truncating toward zero.
pub fn rescale_scores(raw: &[f64]) -> Vec<i64> {
    let min = raw.iter().copied().fold(f64::INFINITY, f64::min);
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    raw.iter()
        .map(|r| (SCORE_MAX * (r - min) / (max - min + RESCALE_EPSILON)) as i64)
        .collect()
}

/// Score a population of wallets. Scores are relative to this population only.
pub fn score_wallets(features: &[FeatureVector], weights: &ScoreWeights) -> Vec<WalletScore> {
    if features.is_empty() {
        return Vec::new();
    }

    let imputed: Vec<[f64; FEATURE_COUNT]> = features
        .iter()
        .map(|f| f.values.map(impute_missing))
        .collect();
    let raw: Vec<f64> = min_max_scale_columns(&imputed)
        .iter()
        .map(|row| weighted_sum(row, weights))
        .collect();
    let scores = rescale_scores(&raw);

    features
        .iter()
        .zip(scores)
        .map(|(f, score)| WalletScore {
            wallet: f.wallet.clone(),
            score,
        })
        .collect()
}
