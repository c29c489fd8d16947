use std::time::Duration;

use common::config::Config;
use common::covalent::FetchError;
use common::types::{TransactionRecord, TransactionsPage};
use tokio::sync::Semaphore;

pub trait TransactionsPager {
    fn fetch_transactions_page(
        &self,
        wallet: &str,
        page: u32,
    ) -> impl std::future::Future<Output = Result<TransactionsPage, FetchError>> + Send;
}

/// Retry and pagination limits for one run. 429 responses are budgeted by
/// `max_rate_limit_retries` and do not consume `attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub concurrency_limit: usize,
    pub attempts: u32,
    pub delay: Duration,
    pub max_rate_limit_retries: u32,
    pub max_pages: u32,
}

impl FetchPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            concurrency_limit: cfg.fetch.concurrency_limit,
            attempts: cfg.fetch.retry_attempts,
            delay: cfg.fetch.retry_delay(),
            max_rate_limit_retries: cfg.fetch.max_rate_limit_retries,
            max_pages: cfg.covalent.max_pages,
        }
    }
}

/// Fetch all pages for `wallet`. Never fails: when a page runs out of
/// attempts the wallet contributes no rows at all.
pub async fn fetch_wallet_transactions<P: TransactionsPager + Sync>(
    pager: &P,
    permits: &Semaphore,
    policy: &FetchPolicy,
    wallet: &str,
) -> Vec<TransactionRecord> {
    let mut records = Vec::new();

    for page in 0..policy.max_pages {
        let Some(fetched) = fetch_page_with_retry(pager, permits, policy, wallet, page).await else {
            tracing::warn!(
                wallet,
                page,
                attempts = policy.attempts,
                "all attempts failed; wallet contributes no transactions"
            );
            metrics::counter!("scorer_wallets_failed_total").increment(1);
            return Vec::new();
        };

        let has_more = fetched.has_more;
        records.extend(
            fetched
                .items
                .into_iter()
                .map(|tx| TransactionRecord::from_api(wallet, tx)),
        );
        if !has_more {
            break;
        }
    }

    tracing::info!(wallet, count = records.len(), "fetched transactions");
    metrics::counter!("scorer_wallets_fetched_total").increment(1);
    records
}

async fn fetch_page_with_retry<P: TransactionsPager + Sync>(
    pager: &P,
    permits: &Semaphore,
    policy: &FetchPolicy,
    wallet: &str,
    page: u32,
) -> Option<TransactionsPage> {
    let mut attempt = 0_u32;
    let mut rate_limited = 0_u32;

    while attempt < policy.attempts {
        // Held for the request and any backoff sleep, released before the next iteration.
        let Ok(_permit) = permits.acquire().await else {
            tracing::error!(wallet, "permit pool closed");
            return None;
        };

        match pager.fetch_transactions_page(wallet, page).await {
            Ok(fetched) => return Some(fetched),
            Err(e) if e.is_rate_limited() && rate_limited < policy.max_rate_limit_retries => {
                rate_limited += 1;
                tracing::warn!(
                    wallet,
                    page,
                    rate_limited,
                    retry_in_secs = policy.delay.as_secs(),
                    "rate limited; retrying"
                );
            }
            Err(e) => {
                attempt += 1;
                tracing::warn!(
                    wallet,
                    page,
                    attempt = %format!("{attempt}/{}", policy.attempts),
                    error = %e,
                    "fetch attempt failed"
                );
            }
        }

        tokio::time::sleep(policy.delay).await;
    }

    None
}
