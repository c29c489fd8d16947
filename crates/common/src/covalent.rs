use crate::config::Covalent;
use crate::types::{TransactionsPage, TransactionsResponse};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use tracing::debug;

/// Failure modes of a single page request. The fetcher retries on all of
/// them, but rate limiting is budgeted separately.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("rate limited (429)")]
    RateLimited,
    #[error("{status}, {body}")]
    Status { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode transactions response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    /// Short label used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Status { status, .. } if status.is_server_error() => "http_5xx",
            Self::Status { .. } => "http_4xx",
            Self::Transport(e) if e.is_timeout() => "timeout",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
        }
    }
}

/// Client for the Covalent `transactions_v2` endpoint on one chain.
pub struct CovalentClient {
    base_url: String,
    chain_id: String,
    api_key: String,
    page_size: u32,
    client: reqwest::Client,
}

impl CovalentClient {
    pub fn new(cfg: &Covalent) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = cfg.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            chain_id: cfg.chain_id.clone(),
            api_key: cfg.api_key.clone(),
            page_size: cfg.page_size,
            client,
        })
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn transactions_url(&self, wallet: &str, page: u32) -> String {
        format!(
            "{}/{}/address/{}/transactions_v2/?key={}&page-number={page}&page-size={}",
            self.base_url,
            urlencoding::encode(&self.chain_id),
            urlencoding::encode(wallet),
            urlencoding::encode(&self.api_key),
            self.page_size,
        )
    }

    /// Fetch one page of a wallet's transactions. A 429 maps to
    /// [`FetchError::RateLimited`], any other non-200 to [`FetchError::Status`].
    pub async fn fetch_transactions_page(
        &self,
        wallet: &str,
        page: u32,
    ) -> std::result::Result<TransactionsPage, FetchError> {
        debug!(wallet, page, chain_id = %self.chain_id, "fetching transactions page");

        let resp = self
            .client
            .get(self.transactions_url(wallet, page))
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let body = resp.bytes().await?;
        let parsed: TransactionsResponse = serde_json::from_slice(&body)?;
        Ok(parsed.into_page())
    }
}
