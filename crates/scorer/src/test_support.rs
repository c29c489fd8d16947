//! Scripted stand-ins for the Covalent client.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use common::config::Config;
use common::covalent::FetchError;
use common::types::{ApiTransaction, TransactionsPage};
use reqwest::StatusCode;
use tokio::time::Instant;

use crate::ingestion::TransactionsPager;

pub const TEST_CONFIG: &str = r#"
[general]
log_level = "debug"

[covalent]
base_url = "http://localhost:1"
chain_id = "1"
page_size = 100
max_pages = 1

[fetch]
concurrency_limit = 5
retry_attempts = 3
retry_delay_secs = 5
max_rate_limit_retries = 10

[io]
input_path = "wallets.csv"
output_path = "wallet_scores.csv"
"#;

pub fn test_config() -> Config {
    Config::from_toml_str(TEST_CONFIG).unwrap()
}

#[derive(Debug, Clone)]
pub enum Scripted {
    Page(Vec<ApiTransaction>, bool),
    RateLimited,
    ServerError,
}

pub fn tx(value: &str, block_signed_at: &str) -> ApiTransaction {
    ApiTransaction {
        block_signed_at: Some(block_signed_at.to_string()),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

/// Last page of a wallet's history.
pub fn page(txs: Vec<ApiTransaction>) -> Scripted {
    Scripted::Page(txs, false)
}

/// A page followed by more pages.
pub fn page_more(txs: Vec<ApiTransaction>) -> Scripted {
    Scripted::Page(txs, true)
}

/// Serves scripted responses per wallet; an exhausted script yields empty pages.
#[derive(Default)]
pub struct FakePager {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    latency: HashMap<String, Duration>,
    calls: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    started: Mutex<Vec<(String, Instant)>>,
}

impl FakePager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, wallet: &str, responses: Vec<Scripted>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(wallet.to_string(), responses.into());
        self
    }

    pub fn latency(mut self, wallet: &str, latency: Duration) -> Self {
        self.latency.insert(wallet.to_string(), latency);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Start time of every call made for `wallet`, in call order.
    pub fn call_starts(&self, wallet: &str) -> Vec<Instant> {
        self.started
            .lock()
            .unwrap()
            .iter()
            .filter(|(w, _)| w == wallet)
            .map(|(_, at)| *at)
            .collect()
    }
}

impl TransactionsPager for FakePager {
    async fn fetch_transactions_page(
        &self,
        wallet: &str,
        _page: u32,
    ) -> Result<TransactionsPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started
            .lock()
            .unwrap()
            .push((wallet.to_string(), Instant::now()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = self
            .latency
            .get(wallet)
            .copied()
            .unwrap_or(Duration::from_millis(10));
        tokio::time::sleep(latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(wallet)
            .and_then(VecDeque::pop_front);

        match next {
            None => Ok(TransactionsPage::default()),
            Some(Scripted::Page(items, has_more)) => Ok(TransactionsPage { items, has_more }),
            Some(Scripted::RateLimited) => Err(FetchError::RateLimited),
            Some(Scripted::ServerError) => Err(FetchError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "boom".to_string(),
            }),
        }
    }
}
