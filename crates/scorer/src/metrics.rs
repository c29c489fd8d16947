use anyhow::Result;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

pub fn describe() {
    describe_counter!(
        "scorer_api_requests_total",
        "Number of transactions_v2 page requests made."
    );
    describe_counter!(
        "scorer_api_errors_total",
        "Failed page requests by kind (rate_limited, http_4xx, http_5xx, timeout, transport, decode)."
    );
    describe_histogram!(
        "scorer_api_latency_ms",
        "transactions_v2 request latency in milliseconds."
    );
    describe_counter!(
        "scorer_wallets_fetched_total",
        "Wallets whose transaction history was fetched."
    );
    describe_counter!(
        "scorer_wallets_failed_total",
        "Wallets that exhausted their retry attempts."
    );
    describe_counter!(
        "scorer_transactions_fetched_total",
        "Transaction rows in the combined table."
    );
    describe_counter!("scorer_wallets_scored_total", "Wallets written with a score.");
}

pub fn install_prometheus(port: u16) -> Result<PrometheusHandle> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    Ok(PrometheusBuilder::new()
        .with_http_listener(addr)
        .install_recorder()?)
}
