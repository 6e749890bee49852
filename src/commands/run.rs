//! Trading loop command
//!
//! Polls the exchange on a fixed interval and runs one strictly
//! sequential cycle per tick: fetch both timeframes, analyze, interpret
//! signals, size and place orders, journal the outcome. A cycle that
//! errors is logged and the loop proceeds to the next poll. The tracker
//! state is reset only after a position closes, never on a failed
//! signal check.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use bos_trader::config::Config;
use bos_trader::exchange::ExchangeClient;
use bos_trader::journal::{JournalEvent, TradeJournal, TradeRecord};
use bos_trader::risk::RiskManager;
use bos_trader::strategies::{StrategyKind, StructureTracker, TrendStrategy};
use bos_trader::types::{Symbol, TradeDirection, TradePlan};

/// A position this bot opened and is watching
#[derive(Debug, Clone)]
struct ActiveTrade {
    plan: TradePlan,
    quantity: f64,
    opened_at: DateTime<Utc>,
}

struct Bot {
    config: Config,
    client: ExchangeClient,
    tracker: StructureTracker,
    trend: TrendStrategy,
    risk: RiskManager,
    journal: TradeJournal,
    paper_mode: bool,
    paper_balance: f64,
    active: Option<ActiveTrade>,
    cycle_count: u64,
}

impl Bot {
    fn new(config: Config, paper_mode: bool) -> Result<Self> {
        let credentials = config.exchange.credentials();
        if !paper_mode && credentials.is_none() {
            anyhow::bail!(
                "live mode requires API credentials (BINGX_API_KEY / BINGX_API_SECRET)"
            );
        }

        let client_config = config.exchange.client_config();
        let client = match credentials {
            Some(creds) => ExchangeClient::new(client_config, creds),
            None => ExchangeClient::public(client_config),
        };

        let tracker = StructureTracker::new(config.bos.clone());
        let trend = TrendStrategy::new(config.trend.clone());
        let risk = RiskManager::new(config.risk.clone());
        let journal = TradeJournal::new(&config.trading.journal_path);
        let paper_balance = config.trading.paper_capital;

        Ok(Self {
            config,
            client,
            tracker,
            trend,
            risk,
            journal,
            paper_mode,
            paper_balance,
            active: None,
            cycle_count: 0,
        })
    }

    async fn run_cycle(&mut self) -> Result<()> {
        self.cycle_count += 1;
        let symbol = self.config.trading.symbol.clone();
        let limit = self.config.trading.kline_limit;

        let higher = self
            .client
            .get_klines(&symbol, &self.config.trading.higher_interval, limit)
            .await
            .context("failed to fetch higher-timeframe klines")?;
        let lower = self
            .client
            .get_klines(&symbol, &self.config.trading.lower_interval, limit)
            .await
            .context("failed to fetch lower-timeframe klines")?;

        let current_price = match lower.last() {
            Some(candle) => candle.close,
            None => {
                warn!("no lower-timeframe candles returned, skipping cycle");
                return Ok(());
            }
        };

        debug!(
            cycle = self.cycle_count,
            %symbol,
            price = current_price,
            higher_candles = higher.len(),
            lower_candles = lower.len(),
            "tick"
        );

        if self.active.is_some() {
            self.monitor_position(current_price).await?;
        }

        if self.active.is_none() {
            let plan = match self.config.strategy {
                StrategyKind::Bos => self.evaluate_structure(&higher, &lower),
                StrategyKind::Trend => self.evaluate_trend(&higher),
            };

            if let Some(plan) = plan {
                self.open_trade(plan).await?;
            }
        }

        Ok(())
    }

    fn evaluate_structure(
        &mut self,
        higher: &[bos_trader::types::Candle],
        lower: &[bos_trader::types::Candle],
    ) -> Option<TradePlan> {
        let analysis = self.tracker.analyze(higher, lower);

        if analysis.long_signal.signal || analysis.short_signal.signal {
            let fired = if analysis.long_signal.signal {
                &analysis.long_signal
            } else {
                &analysis.short_signal
            };
            info!("entry signal: {}", fired.reasons.join("; "));
            self.tracker.trade_plan()
        } else {
            debug!(
                long = analysis.long_signal.first_unmet().unwrap_or("-"),
                short = analysis.short_signal.first_unmet().unwrap_or("-"),
                "no signal"
            );
            None
        }
    }

    fn evaluate_trend(&self, candles: &[bos_trader::types::Candle]) -> Option<TradePlan> {
        let assessment = self.trend.assess(candles);

        let direction = if assessment.long_signal.signal {
            info!("entry signal: {}", assessment.long_signal.reasons.join("; "));
            TradeDirection::Bullish
        } else if assessment.short_signal.signal {
            info!(
                "entry signal: {}",
                assessment.short_signal.reasons.join("; ")
            );
            TradeDirection::Bearish
        } else {
            debug!(
                long = assessment.long_signal.first_unmet().unwrap_or("-"),
                short = assessment.short_signal.first_unmet().unwrap_or("-"),
                "no signal"
            );
            return None;
        };

        self.trend.trade_plan(candles, direction)
    }

    async fn open_trade(&mut self, plan: TradePlan) -> Result<()> {
        let today = Utc::now().date_naive();
        if !self.risk.can_trade(today) {
            warn!(
                trades_today = self.risk.trades_today(),
                "daily trade limit reached, skipping entry"
            );
            return Ok(());
        }

        let (balance, available_margin) = if self.paper_mode {
            (self.paper_balance, self.paper_balance)
        } else {
            let account = self
                .client
                .get_balance()
                .await
                .context("failed to fetch balance")?;
            (account.balance_value(), account.available_margin_value())
        };

        let quantity = self
            .risk
            .position_size(balance, plan.entry_price, plan.stop_loss);
        if quantity <= 0.0 {
            debug!("position size is zero, skipping entry");
            return Ok(());
        }
        if !self
            .risk
            .has_sufficient_margin(available_margin, quantity, plan.entry_price)
        {
            warn!(available_margin, "insufficient margin, skipping entry");
            return Ok(());
        }

        let symbol = self.config.trading.symbol.clone();
        let order_id = if self.paper_mode {
            info!(
                %symbol,
                direction = %plan.direction,
                quantity,
                entry = plan.entry_price,
                stop = plan.stop_loss,
                target = plan.take_profit,
                "[PAPER] opening position"
            );
            None
        } else {
            let order = self
                .client
                .place_order(
                    &symbol,
                    plan.direction,
                    quantity,
                    Some(plan.stop_loss),
                    Some(plan.take_profit),
                )
                .await
                .context("order placement failed")?;
            info!(
                %symbol,
                direction = %plan.direction,
                quantity,
                order_id = order.order_id,
                "[LIVE] order placed"
            );
            Some(order.order_id)
        };

        self.journal.append(&TradeRecord {
            timestamp: Utc::now(),
            event: JournalEvent::Entry,
            symbol: Symbol::new(symbol),
            direction: plan.direction,
            quantity,
            entry_price: plan.entry_price,
            stop_loss: Some(plan.stop_loss),
            take_profit: Some(plan.take_profit),
            exit_price: None,
            pnl: None,
            order_id,
            paper: self.paper_mode,
            note: None,
        })?;

        self.risk.record_trade(today);
        self.active = Some(ActiveTrade {
            plan,
            quantity,
            opened_at: Utc::now(),
        });

        Ok(())
    }

    async fn monitor_position(&mut self, current_price: f64) -> Result<()> {
        let trade = match &self.active {
            Some(trade) => trade.clone(),
            None => return Ok(()),
        };

        if self.paper_mode {
            let plan = &trade.plan;
            let (stopped, targeted) = match plan.direction {
                TradeDirection::Bullish => (
                    current_price <= plan.stop_loss,
                    current_price >= plan.take_profit,
                ),
                TradeDirection::Bearish => (
                    current_price >= plan.stop_loss,
                    current_price <= plan.take_profit,
                ),
            };

            if stopped || targeted {
                let (exit_price, reason) = if stopped {
                    (plan.stop_loss, "stop loss")
                } else {
                    (plan.take_profit, "take profit")
                };
                self.close_paper_trade(&trade, exit_price, reason)?;
            }
        } else {
            let positions = self
                .client
                .get_positions(&self.config.trading.symbol)
                .await
                .context("failed to fetch positions")?;

            // The exchange manages the attached stop/target; an empty
            // position list means one of them filled.
            if positions.is_empty() {
                info!(
                    opened_at = %trade.opened_at,
                    "position closed on exchange"
                );
                self.journal.append(&TradeRecord {
                    timestamp: Utc::now(),
                    event: JournalEvent::Exit,
                    symbol: Symbol::new(&self.config.trading.symbol),
                    direction: trade.plan.direction,
                    quantity: trade.quantity,
                    entry_price: trade.plan.entry_price,
                    stop_loss: Some(trade.plan.stop_loss),
                    take_profit: Some(trade.plan.take_profit),
                    exit_price: Some(current_price),
                    pnl: None,
                    order_id: None,
                    paper: false,
                    note: Some("closed by exchange-side stop or target".to_string()),
                })?;
                self.active = None;
                self.tracker.reset_state();
            }
        }

        Ok(())
    }

    fn close_paper_trade(&mut self, trade: &ActiveTrade, exit_price: f64, reason: &str) -> Result<()> {
        let plan = &trade.plan;
        let pnl = match plan.direction {
            TradeDirection::Bullish => (exit_price - plan.entry_price) * trade.quantity,
            TradeDirection::Bearish => (plan.entry_price - exit_price) * trade.quantity,
        };
        self.paper_balance += pnl;

        info!(
            direction = %plan.direction,
            exit_price,
            pnl,
            balance = self.paper_balance,
            "[PAPER] position closed: {}",
            reason
        );

        self.journal.append(&TradeRecord {
            timestamp: Utc::now(),
            event: JournalEvent::Exit,
            symbol: Symbol::new(&self.config.trading.symbol),
            direction: plan.direction,
            quantity: trade.quantity,
            entry_price: plan.entry_price,
            stop_loss: Some(plan.stop_loss),
            take_profit: Some(plan.take_profit),
            exit_price: Some(exit_price),
            pnl: Some(pnl),
            order_id: None,
            paper: true,
            note: Some(reason.to_string()),
        })?;

        self.active = None;
        self.tracker.reset_state();

        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(trade) = self.active.clone() {
            if self.paper_mode {
                warn!("closing paper position on shutdown");
                self.close_paper_trade(&trade, trade.plan.entry_price, "shutdown")?;
            } else {
                warn!(
                    "live position stays open with its exchange-side stop and target attached"
                );
            }
        }

        if self.paper_mode {
            info!(balance = self.paper_balance, "paper session ended");
        }
        Ok(())
    }
}

pub fn run(config_path: String, paper: bool, live: bool, poll_interval: Option<u64>) -> Result<()> {
    if !paper && !live {
        anyhow::bail!("Must specify either --paper or --live mode");
    }
    if paper && live {
        anyhow::bail!("Cannot specify both --paper and --live modes");
    }

    dotenv::dotenv().ok();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_async(config_path, paper, poll_interval))
}

async fn run_async(config_path: String, paper_mode: bool, poll_interval: Option<u64>) -> Result<()> {
    let mut config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;
    if let Some(secs) = poll_interval {
        config.trading.poll_interval_secs = secs;
        config.validate()?;
    }

    let interval_secs = config.trading.poll_interval_secs;
    let mode = if paper_mode { "PAPER" } else { "LIVE" };

    info!("strategy: {}", config.strategy);
    info!(
        "symbol: {} ({} / {})",
        config.trading.symbol, config.trading.higher_interval, config.trading.lower_interval
    );
    info!("mode: {}, poll interval: {}s", mode, interval_secs);

    if !paper_mode {
        warn!("LIVE TRADING MODE - REAL MONEY AT RISK");
    }

    let mut bot = Bot::new(config, paper_mode)?;

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install signal handler: {}", e);
            return;
        }
        info!("received ctrl-c, shutting down after the current cycle");
        let _ = shutdown_tx.send(()).await;
    });

    let mut ticker = interval(Duration::from_secs(interval_secs));

    info!("starting trading loop");

    loop {
        // Cycles run strictly sequentially: the next tick is not
        // consumed until the previous cycle's future resolves.
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = bot.run_cycle().await {
                    error!("trading cycle error: {:#}", e);
                }
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    bot.shutdown()?;
    info!("trading session ended");
    Ok(())
}
