use anyhow::Result;
use common::config::Config;
use std::path::Path;
use std::process::ExitCode;

mod cli;
mod ingestion;
mod jobs;
mod metrics;
mod wallet_features;
mod wallet_io;
mod wallet_scoring;

#[cfg(test)]
mod test_support;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = cli::parse_args(std::env::args()).map_err(anyhow::Error::msg)?;
    let config = Config::load(&cli.config_path)?;

    let (dispatch, _otel_guard) =
        common::observability::build_dispatch("wallet_scorer", &config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch).map_err(anyhow::Error::msg)?;

    tracing::info!(config = %cli.config_path, command = ?cli.command, "wallet_scorer starting");

    if let Some(port) = config.observability.prometheus_port {
        metrics::install_prometheus(port)?;
        tracing::info!(port, "prometheus exporter listening");
    }
    metrics::describe();

    // `_otel_guard` must drop before the process exits to flush spans.
    run(&cli.command, &config).await
}

async fn run(command: &cli::Command, config: &Config) -> Result<ExitCode> {
    if config.covalent.api_key.is_empty() {
        tracing::warn!(
            env = common::config::API_KEY_ENV,
            "covalent api_key is empty; requests will be rejected"
        );
    }

    let input = Path::new(&config.io.input_path);
    let wallets = match wallet_io::read_wallets(input) {
        Ok(w) => w,
        Err(e) => {
            tracing::error!(error = %e, "cannot read input wallets");
            eprintln!("Error: {e}");
            return Ok(ExitCode::from(1));
        }
    };
    tracing::info!(wallets = wallets.len(), path = %input.display(), "loaded wallets");

    let client = common::covalent::CovalentClient::new(&config.covalent)?;

    match command {
        cli::Command::Run => {
            let scores = jobs::run_scoring_once(&client, config, &wallets).await;
            wallet_io::write_scores(Path::new(&config.io.output_path), &scores)?;
            println!("\nDone! Saved scores to: {}", config.io.output_path);
        }
        cli::Command::Features => {
            let features = jobs::run_feature_extraction_once(&client, config, &wallets).await;
            for f in &features {
                println!("{}", f.to_json());
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_config;

    fn config_with_input(dir: &Path, input: &Path) -> Config {
        let mut cfg = test_config();
        cfg.io.input_path = input.display().to_string();
        cfg.io.output_path = dir.join("wallet_scores.csv").display().to_string();
        cfg
    }

    #[tokio::test]
    async fn test_missing_input_file_exits_with_status_one() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_with_input(dir.path(), &dir.path().join("absent.csv"));

        let code = run(&cli::Command::Run, &cfg).await.unwrap();

        assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::from(1)));
        assert!(!Path::new(&cfg.io.output_path).exists());
    }

    #[tokio::test]
    async fn test_missing_wallet_column_exits_with_status_one() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("wallets.csv");
        std::fs::write(&input, "address\n0x1\n").unwrap();
        let cfg = config_with_input(dir.path(), &input);

        let code = run(&cli::Command::Features, &cfg).await.unwrap();

        assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::from(1)));
    }
}
