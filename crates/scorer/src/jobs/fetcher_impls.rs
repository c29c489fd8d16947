use common::covalent::{CovalentClient, FetchError};
use common::types::TransactionsPage;
use std::time::Instant;

use crate::ingestion::TransactionsPager;

impl TransactionsPager for CovalentClient {
    async fn fetch_transactions_page(
        &self,
        wallet: &str,
        page: u32,
    ) -> Result<TransactionsPage, FetchError> {
        let start = Instant::now();
        let res = CovalentClient::fetch_transactions_page(self, wallet, page).await;
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::histogram!("scorer_api_latency_ms", "chain_id" => self.chain_id().to_string())
            .record(ms);
        match res {
            Ok(v) => {
                metrics::counter!("scorer_api_requests_total", "status" => "ok").increment(1);
                Ok(v)
            }
            Err(e) => {
                metrics::counter!("scorer_api_requests_total", "status" => "error").increment(1);
                metrics::counter!("scorer_api_errors_total", "kind" => e.kind()).increment(1);
                Err(e)
            }
        }
    }
}
