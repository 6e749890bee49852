//! The structure tracker: per-tick pipeline over two timeframes
//!
//! `analyze()` runs a fixed-order pipeline (trend, higher-timeframe
//! break, retracement zone, zone occupancy, lower-timeframe
//! confirmation, entry proposal), mutating the held [`StrategyState`]
//! and returning a snapshot of everything it saw. It performs no I/O,
//! reads no clock, and never fails: every insufficiency degrades to
//! "not detected" and surfaces as the first unmet step of a checklist.

use serde::Serialize;
use tracing::debug;

use super::config::BosConfig;
use super::structure::{detect_break, entry_plan, retracement_zone, StrategyState};
use crate::indicators::{IndicatorConfig, IndicatorSnapshot};
use crate::strategies::SignalCheck;
use crate::types::{Candle, TradeDirection, TradePlan};

/// Everything one `analyze()` call produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub higher_indicators: IndicatorSnapshot,
    pub lower_indicators: IndicatorSnapshot,
    pub long_signal: SignalCheck,
    pub short_signal: SignalCheck,
    pub state: StrategyState,
}

/// Tracks structural state for one symbol across polling ticks.
///
/// The state is owned exclusively by the tracker: `analyze()` is the
/// only mutator and `reset_state()` the only way back to a blank slate.
/// The caller resets after a position closes or a setup is abandoned;
/// the tracker never resets itself.
#[derive(Debug, Clone)]
pub struct StructureTracker {
    config: BosConfig,
    state: StrategyState,
}

impl StructureTracker {
    pub fn new(config: BosConfig) -> Self {
        Self {
            config,
            state: StrategyState::default(),
        }
    }

    pub fn config(&self) -> &BosConfig {
        &self.config
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    pub fn indicator_config(&self) -> &IndicatorConfig {
        &self.config.indicators
    }

    /// Run one tick of the pipeline.
    ///
    /// Deterministic: identical candle input against identical state
    /// yields an identical result and identical resulting state.
    pub fn analyze(&mut self, higher: &[Candle], lower: &[Candle]) -> Analysis {
        let cfg = &self.config;
        let higher_indicators = IndicatorSnapshot::compute(higher, &cfg.indicators);
        let lower_indicators = IndicatorSnapshot::compute(lower, &cfg.indicators);

        // 1. Trend: latest close against the long EMA. Equal, or an
        //    unavailable EMA, means no trend and the pipeline idles.
        self.state.trend = match (higher_indicators.current_price, higher_indicators.ema_trend) {
            (Some(price), Some(ema)) if price > ema => Some(TradeDirection::Bullish),
            (Some(price), Some(ema)) if price < ema => Some(TradeDirection::Bearish),
            _ => None,
        };

        // 2. + 3. Higher-timeframe break and its retracement zone. Not
        //    revisited once an entry proposal is locked in.
        if !self.state.entry_proposed {
            if let Some(direction) = self.state.trend {
                if let Some(brk) = detect_break(
                    higher,
                    direction,
                    cfg.higher_lookback,
                    cfg.swing_neighbor,
                ) {
                    let zone =
                        retracement_zone(&brk.impulse, direction, cfg.fib_entry, cfg.fib_stop);
                    debug!(
                        %direction,
                        level = brk.break_level,
                        impulse_start = brk.impulse.start,
                        impulse_end = brk.impulse.end,
                        zone_low = zone.low,
                        zone_high = zone.high,
                        "structure break on higher timeframe"
                    );
                    // A fresh impulse voids any confirmation of the old one
                    self.state.lower_break = None;
                    self.state.retracement_zone = Some(zone);
                    self.state.higher_break = Some(brk);
                }
            }
        }

        // 4. Zone occupancy: recomputed every call, never sticky.
        self.state.in_retracement_zone = match (
            &self.state.retracement_zone,
            higher_indicators.current_price,
        ) {
            (Some(zone), Some(price)) => zone.contains(price),
            _ => false,
        };

        if !self.state.entry_proposed {
            // 5. Confirmation break on the lower timeframe, only while
            //    price holds inside the zone. Direction is fixed by the
            //    held break, not re-derived from the possibly wobbling
            //    trend EMA.
            if self.state.in_retracement_zone && self.state.lower_break.is_none() {
                if let Some(higher_break) = &self.state.higher_break {
                    self.state.lower_break = detect_break(
                        lower,
                        higher_break.direction,
                        cfg.lower_lookback,
                        cfg.swing_neighbor,
                    );
                }
            }

            // 6. Entry proposal from the confirmation impulse, locked in
            //    until reset_state().
            if let Some(confirmation) = self.state.lower_break.clone() {
                let plan = entry_plan(
                    &confirmation.impulse,
                    confirmation.direction,
                    cfg.fib_entry,
                    cfg.fib_stop,
                    cfg.stop_buffer,
                    cfg.risk_reward,
                );
                debug!(
                    direction = %confirmation.direction,
                    entry = plan.entry_price,
                    stop = plan.stop_loss,
                    target = plan.take_profit,
                    "entry proposal locked in"
                );
                self.state.entry_price = Some(plan.entry_price);
                self.state.stop_loss = Some(plan.stop_loss);
                self.state.take_profit = Some(plan.take_profit);
                self.state.entry_proposed = true;
            }
        } else if self.state.retracement_zone.is_some() {
            // The armed setup has no expiry; keep it visible in the log.
            debug!(
                in_zone = self.state.in_retracement_zone,
                "entry proposal still armed, awaiting caller reset"
            );
        }

        Analysis {
            long_signal: self.checklist(TradeDirection::Bullish),
            short_signal: self.checklist(TradeDirection::Bearish),
            higher_indicators,
            lower_indicators,
            state: self.state.clone(),
        }
    }

    /// Clear all structural state. The caller invokes this after a
    /// position closes or when a setup is abandoned.
    pub fn reset_state(&mut self) {
        self.state = StrategyState::default();
    }

    /// The locked-in proposal as an executable plan, if one exists
    pub fn trade_plan(&self) -> Option<TradePlan> {
        if !self.state.entry_proposed {
            return None;
        }
        let direction = self.state.lower_break.as_ref()?.direction;
        Some(TradePlan {
            direction,
            entry_price: self.state.entry_price?,
            stop_loss: self.state.stop_loss?,
            take_profit: self.state.take_profit?,
        })
    }

    fn checklist(&self, direction: TradeDirection) -> SignalCheck {
        let s = &self.state;

        let break_held = s
            .higher_break
            .as_ref()
            .map(|b| b.direction == direction)
            .unwrap_or(false);
        let break_reason = s
            .higher_break
            .as_ref()
            .map(|b| format!("{} structure break at {:.4}", direction, b.break_level))
            .unwrap_or_default();

        let confirmed = s
            .lower_break
            .as_ref()
            .map(|b| b.direction == direction)
            .unwrap_or(false);

        let zone_reason = s
            .retracement_zone
            .as_ref()
            .map(|z| format!("retracement zone {:.4}..{:.4} armed", z.low, z.high))
            .unwrap_or_default();

        let entry_reason = match (s.entry_price, s.stop_loss, s.take_profit) {
            (Some(e), Some(sl), Some(tp)) => {
                format!("entry proposed at {:.4} (stop {:.4}, target {:.4})", e, sl, tp)
            }
            _ => String::new(),
        };

        SignalCheck::from_steps([
            (
                s.trend == Some(direction),
                format!("{} trend: close beyond the trend EMA", direction),
                format!("no {} trend on the higher timeframe", direction),
            ),
            (
                break_held,
                break_reason,
                format!("no {} structure break on the higher timeframe", direction),
            ),
            (
                s.retracement_zone.is_some(),
                zone_reason,
                "no retracement zone computed".to_string(),
            ),
            (
                s.in_retracement_zone,
                "price inside the retracement zone".to_string(),
                "price outside the retracement zone".to_string(),
            ),
            (
                confirmed,
                format!("{} confirmation break on the lower timeframe", direction),
                "no lower-timeframe confirmation break".to_string(),
            ),
            (
                s.entry_proposed,
                entry_reason,
                "no entry proposal yet".to_string(),
            ),
        ])
    }
}
