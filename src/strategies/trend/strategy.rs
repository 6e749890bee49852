//! Single-timeframe trend strategy
//!
//! Independent threshold checks over one indicator snapshot, no state
//! carried between ticks. Stops fall back on the trailing swing extreme
//! (the simple min/max variant from the indicator engine, not the
//! neighbor-window extremum the structure tracker uses for impulses).

use serde::Serialize;

use super::config::TrendConfig;
use crate::indicators::IndicatorSnapshot;
use crate::strategies::SignalCheck;
use crate::types::{Candle, TradeDirection, TradePlan};

/// What one evaluation of the trend checklist produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAssessment {
    pub indicators: IndicatorSnapshot,
    pub long_signal: SignalCheck,
    pub short_signal: SignalCheck,
}

pub struct TrendStrategy {
    config: TrendConfig,
}

impl TrendStrategy {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Evaluate both directions' checklists against the latest candle
    pub fn assess(&self, candles: &[Candle]) -> TrendAssessment {
        let indicators = IndicatorSnapshot::compute(candles, &self.config.indicators);
        TrendAssessment {
            long_signal: self.checklist(&indicators, TradeDirection::Bullish),
            short_signal: self.checklist(&indicators, TradeDirection::Bearish),
            indicators,
        }
    }

    fn checklist(&self, snap: &IndicatorSnapshot, direction: TradeDirection) -> SignalCheck {
        let cfg = &self.config;

        let trend_ok = match (snap.current_price, snap.ema_slow) {
            (Some(price), Some(ema)) => match direction {
                TradeDirection::Bullish => price > ema,
                TradeDirection::Bearish => price < ema,
            },
            _ => false,
        };

        let momentum_ok = snap
            .macd
            .map(|m| match direction {
                TradeDirection::Bullish => m.bullish_cross || m.histogram > 0.0,
                TradeDirection::Bearish => m.bearish_cross || m.histogram < 0.0,
            })
            .unwrap_or(false);

        let rsi_ok = snap
            .rsi
            .map(|r| match direction {
                TradeDirection::Bullish => r < cfg.rsi_overbought,
                TradeDirection::Bearish => r > cfg.rsi_oversold,
            })
            .unwrap_or(false);

        let break_ok = match direction {
            TradeDirection::Bullish => snap.bullish_breakout,
            TradeDirection::Bearish => snap.bearish_breakdown,
        };

        let mut steps = vec![
            (
                trend_ok,
                format!("{} trend: close beyond the slow EMA", direction),
                format!("no {} trend against the slow EMA", direction),
            ),
            (
                momentum_ok,
                format!("MACD momentum agrees with the {} case", direction),
                format!("MACD momentum does not support a {} entry", direction),
            ),
            (
                rsi_ok,
                "RSI within entry bounds".to_string(),
                "RSI outside entry bounds".to_string(),
            ),
            (
                break_ok,
                match direction {
                    TradeDirection::Bullish => "close broke out above the recent range",
                    TradeDirection::Bearish => "close broke down below the recent range",
                }
                .to_string(),
                "no range break on the latest close".to_string(),
            ),
        ];

        if cfg.require_volume_spike {
            steps.push((
                snap.volume_spike,
                "volume spike on the signal candle".to_string(),
                "no volume spike on the signal candle".to_string(),
            ));
        }

        SignalCheck::from_steps(steps)
    }

    /// Market-entry plan for the given direction.
    ///
    /// The stop rests behind the trailing swing extreme, falling back on
    /// a fixed percent of the entry when the extreme is unavailable or
    /// on the wrong side of it.
    pub fn trade_plan(&self, candles: &[Candle], direction: TradeDirection) -> Option<TradePlan> {
        let snap = IndicatorSnapshot::compute(candles, &self.config.indicators);
        let entry_price = snap.current_price?;
        let cfg = &self.config;

        let stop_loss = match direction {
            TradeDirection::Bullish => snap
                .swing_low
                .filter(|&low| low < entry_price)
                .unwrap_or(entry_price * (1.0 - cfg.fallback_stop_pct)),
            TradeDirection::Bearish => snap
                .swing_high
                .filter(|&high| high > entry_price)
                .unwrap_or(entry_price * (1.0 + cfg.fallback_stop_pct)),
        };

        let risk = (entry_price - stop_loss).abs();
        let take_profit = match direction {
            TradeDirection::Bullish => entry_price + risk * cfg.risk_reward,
            TradeDirection::Bearish => entry_price - risk * cfg.risk_reward,
        };

        Some(TradePlan {
            direction,
            entry_price,
            stop_loss,
            take_profit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, Utc};

    fn candle(i: i64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            datetime: Utc::now() + Duration::minutes(15 * i),
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    fn small_config() -> TrendConfig {
        let mut config = TrendConfig::default();
        config.indicators.ema_slow = 4;
        config.indicators.swing_lookback = 3;
        config.indicators.breakout_lookback = 3;
        config.indicators.rsi_period = 3;
        config
    }

    #[test]
    fn test_no_data_fails_at_first_step() {
        let strategy = TrendStrategy::new(small_config());
        let assessment = strategy.assess(&[]);

        assert!(!assessment.long_signal.signal);
        assert_eq!(
            assessment.long_signal.first_unmet(),
            Some("no bullish trend against the slow EMA")
        );
        assert!(strategy.trade_plan(&[], TradeDirection::Bullish).is_none());
    }

    #[test]
    fn test_overheated_rsi_blocks_long() {
        // Monotonic rise: trend and breakout hold but RSI pegs at 100
        let strategy = TrendStrategy::new(small_config());
        let candles: Vec<Candle> = (0..40)
            .map(|i| {
                let price = 100.0 + i as f64;
                candle(i as i64, price + 0.5, price - 0.5, price)
            })
            .collect();

        let assessment = strategy.assess(&candles);
        assert!(!assessment.long_signal.signal);
        assert_eq!(
            assessment.long_signal.first_unmet(),
            Some("RSI outside entry bounds")
        );
    }

    #[test]
    fn test_bullish_plan_uses_swing_low() {
        let strategy = TrendStrategy::new(small_config());
        let candles = vec![
            candle(0, 101.0, 99.0, 100.0),
            candle(1, 102.0, 100.0, 101.0),
            candle(2, 103.0, 100.5, 102.0), // swing window starts here
            candle(3, 104.0, 101.5, 103.0),
            candle(4, 105.0, 102.0, 104.0),
        ];

        let plan = strategy
            .trade_plan(&candles, TradeDirection::Bullish)
            .unwrap();
        assert_relative_eq!(plan.entry_price, 104.0);
        assert_relative_eq!(plan.stop_loss, 100.5);
        assert_relative_eq!(plan.take_profit, 104.0 + 3.5 * 2.0);
    }

    #[test]
    fn test_stop_falls_back_without_swing() {
        let mut config = small_config();
        config.indicators.swing_lookback = 10; // more than we have
        let strategy = TrendStrategy::new(config);

        let candles = vec![
            candle(0, 101.0, 99.0, 100.0),
            candle(1, 102.0, 100.0, 101.0),
        ];

        let plan = strategy
            .trade_plan(&candles, TradeDirection::Bullish)
            .unwrap();
        assert_relative_eq!(plan.stop_loss, 101.0 * 0.98, epsilon = 1e-9);
    }

    #[test]
    fn test_bearish_plan_mirrors() {
        let strategy = TrendStrategy::new(small_config());
        let candles = vec![
            candle(0, 105.0, 103.0, 104.0),
            candle(1, 104.5, 102.0, 103.0),
            candle(2, 104.0, 101.0, 102.0),
            candle(3, 103.0, 100.0, 101.0),
            candle(4, 102.0, 99.0, 100.0),
        ];

        let plan = strategy
            .trade_plan(&candles, TradeDirection::Bearish)
            .unwrap();
        assert_relative_eq!(plan.entry_price, 100.0);
        assert_relative_eq!(plan.stop_loss, 104.0); // swing high of last 3
        assert!(plan.take_profit < plan.entry_price);
    }
}
