//! Account balance command

use anyhow::{Context, Result};
use tracing::info;

use bos_trader::config::Config;
use bos_trader::exchange::ExchangeClient;

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

    let credentials = config
        .exchange
        .credentials()
        .context("balance requires API credentials (BINGX_API_KEY / BINGX_API_SECRET)")?;
    let client = ExchangeClient::new(config.exchange.client_config(), credentials);

    let balance = client.get_balance().await?;
    info!(
        asset = %balance.asset,
        balance = balance.balance_value(),
        available_margin = balance.available_margin_value(),
        "account balance"
    );

    let positions = client.get_positions(&config.trading.symbol).await?;
    if positions.is_empty() {
        info!("no open positions for {}", config.trading.symbol);
    } else {
        for position in positions {
            info!(
                symbol = %position.symbol,
                side = %position.position_side,
                quantity = position.quantity(),
                entry_price = position.entry_price(),
                "open position"
            );
        }
    }

    Ok(())
}
