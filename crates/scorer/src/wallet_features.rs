use std::collections::BTreeMap;

use common::types::TransactionRecord;

pub const FEATURE_COUNT: usize = 7;

/// Feature columns, in the order the scorer consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureName {
    SupplySum,
    BorrowSum,
    RepayToBorrowRatio,
    LiquidationRate,
    RedemptionToSupplyRatio,
    NumActions,
    ActiveDays,
}

impl FeatureName {
    pub const ALL: [FeatureName; FEATURE_COUNT] = [
        Self::SupplySum,
        Self::BorrowSum,
        Self::RepayToBorrowRatio,
        Self::LiquidationRate,
        Self::RedemptionToSupplyRatio,
        Self::NumActions,
        Self::ActiveDays,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SupplySum => "supply_sum",
            Self::BorrowSum => "borrow_sum",
            Self::RepayToBorrowRatio => "repay_to_borrow_ratio",
            Self::LiquidationRate => "liquidation_rate",
            Self::RedemptionToSupplyRatio => "redemption_to_supply_ratio",
            Self::NumActions => "num_actions",
            Self::ActiveDays => "active_days",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub wallet: String,
    /// Indexed by [`FeatureName::index`]. May hold NaN; the scorer imputes it.
    pub values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn get(&self, name: FeatureName) -> f64 {
        self.values[name.index()]
    }

    /// Named view for printing. NaN and infinities serialize as `null`.
    pub fn to_json(&self) -> serde_json::Value {
        let mut features = serde_json::Map::new();
        for name in FeatureName::ALL {
            features.insert(name.as_str().to_string(), self.get(name).into());
        }
        serde_json::json!({ "wallet": self.wallet, "features": features })
    }
}

/// Computes one feature from a wallet's non-empty transaction table.
pub trait FeatureComputer: Send + Sync {
    fn feature(&self) -> FeatureName;
    fn compute(&self, txs: &[TransactionRecord]) -> f64;
}

/// Sum of positive (supply) values.
pub struct SupplySum;

impl FeatureComputer for SupplySum {
    fn feature(&self) -> FeatureName {
        FeatureName::SupplySum
    }

    fn compute(&self, txs: &[TransactionRecord]) -> f64 {
        txs.iter().filter_map(|t| t.value).filter(|v| *v > 0.0).sum()
    }
}

/// Sum of absolute negative (withdraw) values.
pub struct BorrowSum;

impl FeatureComputer for BorrowSum {
    fn feature(&self) -> FeatureName {
        FeatureName::BorrowSum
    }

    fn compute(&self, txs: &[TransactionRecord]) -> f64 {
        txs.iter()
            .filter_map(|t| t.value)
            .filter(|v| *v < 0.0)
            .map(f64::abs)
            .sum()
    }
}

/// Row count, including zero-value and unparsed rows.
pub struct NumActions;

impl FeatureComputer for NumActions {
    fn feature(&self) -> FeatureName {
        FeatureName::NumActions
    }

    fn compute(&self, txs: &[TransactionRecord]) -> f64 {
        txs.len() as f64
    }
}

/// Inclusive whole-day span between the first and last valid timestamp.
/// NaN when no timestamp parsed.
pub struct ActiveDays;

impl FeatureComputer for ActiveDays {
    fn feature(&self) -> FeatureName {
        FeatureName::ActiveDays
    }

    fn compute(&self, txs: &[TransactionRecord]) -> f64 {
        let mut stamps = txs.iter().filter_map(|t| t.timestamp);
        let Some(first) = stamps.next() else {
            return f64::NAN;
        };
        let (min, max) = stamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts)));
        ((max - min).num_days() + 1) as f64
    }
}

/// A constant standing in for a metric that is not derived from the data yet.
pub struct PlaceholderFeature {
    pub feature: FeatureName,
    pub value: f64,
}

impl FeatureComputer for PlaceholderFeature {
    fn feature(&self) -> FeatureName {
        self.feature
    }

    fn compute(&self, _txs: &[TransactionRecord]) -> f64 {
        self.value
    }
}

// Repayment, liquidation and redemption events are not decoded from the raw
// transfers, so these three features are fixed for every wallet.
pub const REPAY_TO_BORROW_PLACEHOLDER: f64 = 0.5;
pub const LIQUIDATION_RATE_PLACEHOLDER: f64 = 0.1;
pub const REDEMPTION_TO_SUPPLY_PLACEHOLDER: f64 = 0.2;

/// One computer per feature, stored at the feature's index.
pub struct FeatureExtractor {
    computers: Vec<Box<dyn FeatureComputer>>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self {
            computers: vec![
                Box::new(SupplySum),
                Box::new(BorrowSum),
                Box::new(PlaceholderFeature {
                    feature: FeatureName::RepayToBorrowRatio,
                    value: REPAY_TO_BORROW_PLACEHOLDER,
                }),
                Box::new(PlaceholderFeature {
                    feature: FeatureName::LiquidationRate,
                    value: LIQUIDATION_RATE_PLACEHOLDER,
                }),
                Box::new(PlaceholderFeature {
                    feature: FeatureName::RedemptionToSupplyRatio,
                    value: REDEMPTION_TO_SUPPLY_PLACEHOLDER,
                }),
                Box::new(NumActions),
                Box::new(ActiveDays),
            ],
        }
    }
}

impl FeatureExtractor {
    /// Replace the computer for `computer.feature()`.
    #[allow(dead_code)]
    pub fn with_computer(mut self, computer: Box<dyn FeatureComputer>) -> Self {
        let idx = computer.feature().index();
        self.computers[idx] = computer;
        self
    }

    /// `None` for an empty table: such wallets are left out of scoring.
    pub fn extract(&self, wallet: &str, txs: &[TransactionRecord]) -> Option<FeatureVector> {
        if txs.is_empty() {
            return None;
        }
        let mut values = [0.0; FEATURE_COUNT];
        for computer in &self.computers {
            values[computer.feature().index()] = computer.compute(txs);
        }
        Some(FeatureVector {
            wallet: wallet.to_string(),
            values,
        })
    }

    pub fn extract_all(&self, table: Vec<TransactionRecord>) -> Vec<FeatureVector> {
        group_by_wallet(table)
            .into_iter()
            .filter_map(|(wallet, txs)| self.extract(&wallet, &txs))
            .collect()
    }
}

/// Split the combined table per wallet, sorted by wallet address. Rows keep
/// their table order within a wallet.
pub fn group_by_wallet(table: Vec<TransactionRecord>) -> Vec<(String, Vec<TransactionRecord>)> {
    let mut groups: BTreeMap<String, Vec<TransactionRecord>> = BTreeMap::new();
    for record in table {
        groups.entry(record.wallet.clone()).or_default().push(record);
    }
    groups.into_iter().collect()
}
