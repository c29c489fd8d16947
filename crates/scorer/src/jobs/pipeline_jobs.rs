use common::config::Config;
use tracing::Instrument;

use super::ingestion_jobs::fetch_all;
use crate::ingestion::{FetchPolicy, TransactionsPager};
use crate::wallet_features::{FeatureExtractor, FeatureVector};
use crate::wallet_scoring::{score_wallets, ScoreWeights, WalletScore};

/// Fetch every wallet and reduce each non-empty history to a feature vector.
pub async fn run_feature_extraction_once<P: TransactionsPager + Sync>(
    pager: &P,
    cfg: &Config,
    wallets: &[String],
) -> Vec<FeatureVector> {
    let policy = FetchPolicy::from_config(cfg);
    let table = fetch_all(pager, wallets, &policy)
        .instrument(tracing::info_span!("job_run", job = "fetch_transactions"))
        .await;

    let span = tracing::info_span!("job_run", job = "extract_features");
    let _g = span.enter();
    let features = FeatureExtractor::default().extract_all(table);
    let excluded = wallets.len().saturating_sub(features.len());
    tracing::info!(
        wallets = features.len(),
        excluded,
        "features extracted (wallets without transactions are excluded)"
    );
    features
}

pub async fn run_scoring_once<P: TransactionsPager + Sync>(
    pager: &P,
    cfg: &Config,
    wallets: &[String],
) -> Vec<WalletScore> {
    let features = run_feature_extraction_once(pager, cfg, wallets).await;

    let span = tracing::info_span!("job_run", job = "score_wallets");
    let _g = span.enter();
    let scores = score_wallets(&features, &ScoreWeights(cfg.scoring.weights));
    metrics::counter!("scorer_wallets_scored_total").increment(scores.len() as u64);
    tracing::info!(scored = scores.len(), "wallets scored");
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{page, test_config, tx, FakePager, Scripted};
    use crate::wallet_features::FeatureName;

    fn wallets(ws: &[&str]) -> Vec<String> {
        ws.iter().map(|w| (*w).to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_wallet_features() {
        let pager = FakePager::new().script(
            "0xAAA",
            vec![
                Scripted::RateLimited,
                Scripted::RateLimited,
                Scripted::RateLimited,
                page(vec![tx("5.0", "2024-03-01T10:00:00Z")]),
            ],
        );

        let features =
            run_feature_extraction_once(&pager, &test_config(), &wallets(&["0xAAA"])).await;

        assert_eq!(features.len(), 1);
        let f = &features[0];
        assert_eq!(f.wallet, "0xAAA");
        assert_eq!(f.get(FeatureName::SupplySum), 5.0);
        assert_eq!(f.get(FeatureName::BorrowSum), 0.0);
        assert_eq!(f.get(FeatureName::NumActions), 1.0);
        assert_eq!(f.get(FeatureName::ActiveDays), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_without_transactions_is_not_scored() {
        let pager = FakePager::new()
            .script("0xA", vec![page(vec![tx("5.0", "2024-01-01T00:00:00Z")])])
            .script("0xEMPTY", vec![page(vec![])])
            .script("0xB", vec![page(vec![tx("-1.0", "2024-01-01T00:00:00Z")])])
            .script("0xDOWN", vec![Scripted::ServerError; 3]);

        let scores = run_scoring_once(
            &pager,
            &test_config(),
            &wallets(&["0xA", "0xEMPTY", "0xB", "0xDOWN"]),
        )
        .await;

        let scored: Vec<_> = scores.iter().map(|s| s.wallet.as_str()).collect();
        assert_eq!(scored, vec!["0xA", "0xB"]);
        assert!(scores.iter().all(|s| (0..=1000).contains(&s.score)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_wallet_run_scores_zero() {
        let pager = FakePager::new().script(
            "0xONLY",
            vec![page(vec![
                tx("10.0", "2024-01-01T00:00:00Z"),
                tx("-4.0", "2024-01-05T00:00:00Z"),
            ])],
        );

        let scores = run_scoring_once(&pager, &test_config(), &wallets(&["0xONLY"])).await;

        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_histories_get_identical_scores() {
        let history = || {
            vec![page(vec![
                tx("3.0", "2024-01-01T00:00:00Z"),
                tx("-1.0", "2024-01-03T00:00:00Z"),
            ])]
        };
        let pager = FakePager::new()
            .script("0xA", history())
            .script("0xB", vec![page(vec![tx("100.0", "2024-01-01T00:00:00Z")])])
            .script("0xC", history());

        let scores =
            run_scoring_once(&pager, &test_config(), &wallets(&["0xA", "0xB", "0xC"])).await;

        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0].score, scores[2].score);
        assert_ne!(scores[0].score, scores[1].score);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_weights_are_applied() {
        let mut cfg = test_config();
        // Reward borrowing only.
        cfg.scoring.weights = [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let pager = FakePager::new()
            .script("0xSUPPLIER", vec![page(vec![tx("50.0", "2024-01-01T00:00:00Z")])])
            .script("0xBORROWER", vec![page(vec![tx("-50.0", "2024-01-01T00:00:00Z")])]);

        let scores =
            run_scoring_once(&pager, &cfg, &wallets(&["0xSUPPLIER", "0xBORROWER"])).await;

        let score_of = |w: &str| scores.iter().find(|s| s.wallet == w).map(|s| s.score);
        assert_eq!(score_of("0xSUPPLIER"), Some(0));
        assert_eq!(score_of("0xBORROWER"), Some(999));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scores_are_ordered_by_wallet_address() {
        let pager = FakePager::new()
            .script("0xB", vec![page(vec![tx("1.0", "2024-01-01T00:00:00Z")])])
            .script("0xA", vec![page(vec![tx("2.0", "2024-01-01T00:00:00Z")])]);

        let scores = run_scoring_once(&pager, &test_config(), &wallets(&["0xB", "0xA"])).await;

        let order: Vec<_> = scores.iter().map(|s| s.wallet.as_str()).collect();
        assert_eq!(order, vec!["0xA", "0xB"]);
    }
}
