use common::types::TransactionRecord;
use tokio::sync::Semaphore;

use crate::ingestion::{fetch_wallet_transactions, FetchPolicy, TransactionsPager};

/// Fetch every wallet concurrently and concatenate the per-wallet tables in
/// `wallets` order. The permit pool lives for this call only.
pub async fn fetch_all<P: TransactionsPager + Sync>(
    pager: &P,
    wallets: &[String],
    policy: &FetchPolicy,
) -> Vec<TransactionRecord> {
    let permits = Semaphore::new(policy.concurrency_limit);

    tracing::info!(
        wallets = wallets.len(),
        concurrency_limit = policy.concurrency_limit,
        "fetching transactions"
    );

    let tasks = wallets
        .iter()
        .map(|w| fetch_wallet_transactions(pager, &permits, policy, w));
    let tables = futures::future::join_all(tasks).await;

    let combined: Vec<TransactionRecord> = tables.into_iter().flatten().collect();
    metrics::counter!("scorer_transactions_fetched_total").increment(combined.len() as u64);
    combined
}
