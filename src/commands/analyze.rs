//! One-shot analysis command
//!
//! Fetches both timeframes once, runs the configured strategy against
//! them, and prints the full result (indicators, state, and both
//! checklists) as pretty JSON. Useful for eyeballing a setup without
//! starting the loop.

use anyhow::{Context, Result};
use tracing::info;

use bos_trader::config::Config;
use bos_trader::exchange::ExchangeClient;
use bos_trader::strategies::{StrategyKind, StructureTracker, TrendStrategy};

pub fn run(config_path: String) -> Result<()> {
    dotenv::dotenv().ok();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_async(config_path))
}

async fn run_async(config_path: String) -> Result<()> {
    let config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    let client_config = config.exchange.client_config();
    let client = match config.exchange.credentials() {
        Some(creds) => ExchangeClient::new(client_config, creds),
        None => ExchangeClient::public(client_config),
    };

    let symbol = &config.trading.symbol;
    let limit = config.trading.kline_limit;

    let higher = client
        .get_klines(symbol, &config.trading.higher_interval, limit)
        .await
        .context("failed to fetch higher-timeframe klines")?;
    let lower = client
        .get_klines(symbol, &config.trading.lower_interval, limit)
        .await
        .context("failed to fetch lower-timeframe klines")?;

    info!(
        %symbol,
        higher_candles = higher.len(),
        lower_candles = lower.len(),
        "running one-shot analysis"
    );

    let report = match config.strategy {
        StrategyKind::Bos => {
            let mut tracker = StructureTracker::new(config.bos.clone());
            let analysis = tracker.analyze(&higher, &lower);
            serde_json::to_string_pretty(&analysis)?
        }
        StrategyKind::Trend => {
            let strategy = TrendStrategy::new(config.trend.clone());
            let assessment = strategy.assess(&higher);
            serde_json::to_string_pretty(&assessment)?
        }
    };

    println!("{}", report);
    Ok(())
}
