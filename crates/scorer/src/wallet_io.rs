use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::wallet_scoring::WalletScore;

pub const WALLET_COLUMN: &str = "wallet_id";

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("input file {0} not found")]
    NotFound(String),
    #[error("input CSV must contain a 'wallet_id' column")]
    MissingColumn,
    #[error("failed to read input CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Read the `wallet_id` column: blanks dropped, duplicates removed, order kept.
pub fn read_wallets(path: &Path) -> std::result::Result<Vec<String>, InputError> {
    if !path.exists() {
        return Err(InputError::NotFound(path.display().to_string()));
    }

    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let column = rdr
        .headers()?
        .iter()
        .position(|h| h.trim() == WALLET_COLUMN)
        .ok_or(InputError::MissingColumn)?;

    let mut values = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(v) = record.get(column) {
            values.push(v.to_string());
        }
    }

    Ok(dedup_wallets(values))
}

pub fn dedup_wallets<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// Write `wallet,score` rows. The header is written even when there are no scores.
pub fn write_scores(path: &Path, scores: &[WalletScore]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    wtr.write_record(["wallet", "score"])?;
    for s in scores {
        wtr.write_record([s.wallet.as_str(), s.score.to_string().as_str()])?;
    }
    wtr.flush()
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}
