use anyhow::{Context, Result};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable that overrides `covalent.api_key` so the key does not
/// have to live in the config file.
pub const API_KEY_ENV: &str = "COVALENT_API_KEY";

pub const DEFAULT_WEIGHTS: [f64; 7] = [0.4, -0.3, 0.4, -0.5, 0.3, 0.2, 0.2];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub general: General,
    pub covalent: Covalent,
    pub fetch: Fetch,
    pub io: Io,
    #[serde(default)]
    pub scoring: Scoring,
    #[serde(default)]
    pub observability: Observability,
}

#[derive(Debug, Clone, Deserialize)]
pub struct General {
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Covalent {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub chain_id: String,
    pub page_size: u32,
    pub max_pages: u32,
    /// Unset means no per-request deadline; a hung request keeps its permit.
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fetch {
    pub concurrency_limit: usize,
    pub retry_attempts: u32,
    pub retry_delay_secs: u64,
    pub max_rate_limit_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Io {
    pub input_path: String,
    pub output_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scoring {
    /// Positional weights for the seven features, in feature order.
    pub weights: [f64; 7],
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Observability {
    pub prometheus_port: Option<u16>,
}

impl Fetch {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Covalent {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {path}"))?;
        let mut config = Self::from_toml_str(&content)?;
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                config.covalent.api_key = key;
            }
        }
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("failed to parse scorer config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.covalent.chain_id.trim().is_empty(),
            "covalent.chain_id must not be empty"
        );
        anyhow::ensure!(self.covalent.page_size > 0, "covalent.page_size must be > 0");
        anyhow::ensure!(self.covalent.max_pages > 0, "covalent.max_pages must be > 0");
        anyhow::ensure!(
            self.fetch.concurrency_limit > 0,
            "fetch.concurrency_limit must be > 0"
        );
        anyhow::ensure!(
            self.fetch.retry_attempts > 0,
            "fetch.retry_attempts must be > 0"
        );
        anyhow::ensure!(
            self.scoring.weights.iter().all(|w| w.is_finite()),
            "scoring.weights must all be finite"
        );
        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}
