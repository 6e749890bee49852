//! Technical indicators over ordered candle sequences
//!
//! EMA and MACD are provided by the `ta` crate (well-maintained, minimal
//! dependencies); its EMA seeds with the first value and smooths with
//! `2/(period+1)`, which is the definition the rest of the system relies
//! on. RSI and ATR are computed by hand because the variants needed here
//! (trailing-window average gain/loss, trailing mean of true range)
//! differ from the smoothed forms the crate ships.
//!
//! All numeric outputs are `Option<f64>`: a `None` means the sequence is
//! too short for the requested period. Nothing in this module panics on
//! short input.

use itertools::izip;
use serde::{Deserialize, Serialize};
use ta::indicators::{ExponentialMovingAverage, MovingAverageConvergenceDivergence};
use ta::Next;

use crate::types::Candle;

// =============================================================================
// Series calculations
// =============================================================================

/// Calculate Exponential Moving Average
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut indicator = match ExponentialMovingAverage::new(period) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    let mut result = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let ema_val = indicator.next(value);
        if i + 1 >= period {
            result.push(Some(ema_val));
        } else {
            result.push(None);
        }
    }

    result
}

/// Calculate MACD (line, signal, histogram)
///
/// Values are reported only once both the slow EMA and the signal EMA
/// have a full window, i.e. from index `slow + signal - 1` on.
pub fn macd(
    values: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    if values.is_empty() {
        return (vec![], vec![], vec![]);
    }

    let mut indicator =
        match MovingAverageConvergenceDivergence::new(fast_period, slow_period, signal_period) {
            Ok(i) => i,
            Err(_) => {
                return (
                    vec![None; values.len()],
                    vec![None; values.len()],
                    vec![None; values.len()],
                )
            }
        };

    let warmup = slow_period + signal_period;
    let mut macd_line = Vec::with_capacity(values.len());
    let mut signal_line = Vec::with_capacity(values.len());
    let mut histogram = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let out = indicator.next(value);
        if i + 1 >= warmup {
            macd_line.push(Some(out.macd));
            signal_line.push(Some(out.signal));
            histogram.push(Some(out.histogram));
        } else {
            macd_line.push(None);
            signal_line.push(None);
            histogram.push(None);
        }
    }

    (macd_line, signal_line, histogram)
}

/// Calculate RSI from trailing-window average gain / average loss
///
/// Uses `period` price changes (so `period + 1` closes) per point and
/// plain means, not Wilder smoothing. Reports 100 when the window holds
/// no losses.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut result = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        if i < period {
            result.push(None);
            continue;
        }

        let mut gains = 0.0;
        let mut losses = 0.0;
        for j in (i + 1 - period)..=i {
            let change = values[j] - values[j - 1];
            if change > 0.0 {
                gains += change;
            } else {
                losses += -change;
            }
        }

        let avg_gain = gains / period as f64;
        let avg_loss = losses / period as f64;

        if avg_loss == 0.0 {
            result.push(Some(100.0));
        } else {
            let rs = avg_gain / avg_loss;
            result.push(Some(100.0 - 100.0 / (1.0 + rs)));
        }
    }

    result
}

/// Calculate True Range
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(high.len());
    let mut prev_close: Option<f64> = None;

    for (&h, &l, &c) in izip!(high, low, close) {
        let value = match prev_close {
            None => h - l,
            Some(pc) => (h - l).max((h - pc).abs()).max((l - pc).abs()),
        };
        tr.push(value);
        prev_close = Some(c);
    }

    tr
}

/// Calculate ATR as the trailing mean of true range
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    if high.is_empty() || period == 0 || high.len() != low.len() || high.len() != close.len() {
        return vec![];
    }

    let tr = true_range(high, low, close);
    let mut result = Vec::with_capacity(tr.len());

    for i in 0..tr.len() {
        if i + 1 < period {
            result.push(None);
        } else {
            let sum: f64 = tr[i + 1 - period..=i].iter().sum();
            result.push(Some(sum / period as f64));
        }
    }

    result
}

/// Trailing mean of volume
pub fn average_volume(volumes: &[f64], window: usize) -> Vec<Option<f64>> {
    if volumes.is_empty() || window == 0 {
        return vec![];
    }

    let mut result = Vec::with_capacity(volumes.len());

    for i in 0..volumes.len() {
        if i + 1 < window {
            result.push(None);
        } else {
            let sum: f64 = volumes[i + 1 - window..=i].iter().sum();
            result.push(Some(sum / window as f64));
        }
    }

    result
}

// =============================================================================
// Per-timeframe snapshot
// =============================================================================

/// Indicator periods and thresholds for one timeframe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default = "default_ema_fast")]
    pub ema_fast: usize,

    #[serde(default = "default_ema_slow")]
    pub ema_slow: usize,

    /// Long EMA used for trend direction. 200 is the full-strength
    /// period; the default is 50 because kline fetch limits often leave
    /// fewer than 200 candles on the higher timeframe.
    #[serde(default = "default_ema_trend")]
    pub ema_trend: usize,

    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,

    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,

    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    #[serde(default = "default_volume_window")]
    pub volume_window: usize,

    /// Latest volume above `avg × multiplier` flags a spike
    #[serde(default = "default_volume_spike_mult")]
    pub volume_spike_mult: f64,

    /// Trailing window for the simple swing low/high (min/max)
    #[serde(default = "default_swing_lookback")]
    pub swing_lookback: usize,

    #[serde(default = "default_breakout_lookback")]
    pub breakout_lookback: usize,

    /// Fractional tolerance letting near-miss closes count as a break
    #[serde(default = "default_breakout_tolerance")]
    pub breakout_tolerance: f64,
}

fn default_ema_fast() -> usize {
    20
}
fn default_ema_slow() -> usize {
    50
}
fn default_ema_trend() -> usize {
    50
}
fn default_macd_fast() -> usize {
    12
}
fn default_macd_slow() -> usize {
    26
}
fn default_macd_signal() -> usize {
    9
}
fn default_rsi_period() -> usize {
    14
}
fn default_atr_period() -> usize {
    14
}
fn default_volume_window() -> usize {
    20
}
fn default_volume_spike_mult() -> f64 {
    1.3
}
fn default_swing_lookback() -> usize {
    10
}
fn default_breakout_lookback() -> usize {
    20
}
fn default_breakout_tolerance() -> f64 {
    0.002
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_fast: default_ema_fast(),
            ema_slow: default_ema_slow(),
            ema_trend: default_ema_trend(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            rsi_period: default_rsi_period(),
            atr_period: default_atr_period(),
            volume_window: default_volume_window(),
            volume_spike_mult: default_volume_spike_mult(),
            swing_lookback: default_swing_lookback(),
            breakout_lookback: default_breakout_lookback(),
            breakout_tolerance: default_breakout_tolerance(),
        }
    }
}

/// MACD state at the latest candle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdSnapshot {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    pub bullish_cross: bool,
    pub bearish_cross: bool,
}

/// All indicator values for one timeframe at its latest candle.
///
/// Numeric fields are `None` and flags are `false` whenever the candle
/// history is shorter than the corresponding period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub ema_trend: Option<f64>,
    pub macd: Option<MacdSnapshot>,
    pub rsi: Option<f64>,
    pub atr: Option<f64>,
    pub avg_volume: Option<f64>,
    pub volume_spike: bool,
    pub swing_low: Option<f64>,
    pub swing_high: Option<f64>,
    pub bullish_breakout: bool,
    pub bearish_breakdown: bool,
    pub current_price: Option<f64>,
}

impl IndicatorSnapshot {
    /// Compute the snapshot for the latest candle of `candles`
    pub fn compute(candles: &[Candle], config: &IndicatorConfig) -> Self {
        if candles.is_empty() {
            return Self::default();
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        let last = |series: Vec<Option<f64>>| series.last().copied().flatten();

        let ema_fast = last(ema(&closes, config.ema_fast));
        let ema_slow = last(ema(&closes, config.ema_slow));
        let ema_trend = last(ema(&closes, config.ema_trend));

        let macd_snapshot = {
            let (line, signal, histogram) = macd(
                &closes,
                config.macd_fast,
                config.macd_slow,
                config.macd_signal,
            );
            match (
                line.last().copied().flatten(),
                signal.last().copied().flatten(),
                histogram.last().copied().flatten(),
            ) {
                (Some(m), Some(s), Some(h)) => {
                    let prev_hist = if histogram.len() >= 2 {
                        histogram[histogram.len() - 2]
                    } else {
                        None
                    };
                    let (bullish_cross, bearish_cross) = match prev_hist {
                        Some(p) => (p <= 0.0 && h > 0.0, p >= 0.0 && h < 0.0),
                        None => (false, false),
                    };
                    Some(MacdSnapshot {
                        macd: m,
                        signal: s,
                        histogram: h,
                        bullish_cross,
                        bearish_cross,
                    })
                }
                _ => None,
            }
        };

        let rsi_value = last(rsi(&closes, config.rsi_period));
        let atr_value = last(atr(&highs, &lows, &closes, config.atr_period));

        let avg_volume = last(average_volume(&volumes, config.volume_window));
        let volume_spike = match (avg_volume, volumes.last()) {
            (Some(avg), Some(&latest)) => avg > 0.0 && latest > avg * config.volume_spike_mult,
            _ => false,
        };

        let (swing_low, swing_high) = if candles.len() >= config.swing_lookback
            && config.swing_lookback > 0
        {
            let window = &candles[candles.len() - config.swing_lookback..];
            (
                Some(window.iter().map(|c| c.low).fold(f64::MAX, f64::min)),
                Some(window.iter().map(|c| c.high).fold(f64::MIN, f64::max)),
            )
        } else {
            (None, None)
        };

        let current_price = closes.last().copied();

        // Breaks measure the latest close against the window *before* it
        let (bullish_breakout, bearish_breakdown) = if candles.len() > config.breakout_lookback
            && config.breakout_lookback > 0
        {
            let window = &candles[candles.len() - 1 - config.breakout_lookback..candles.len() - 1];
            let window_high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
            let window_low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
            let close = closes[closes.len() - 1];
            (
                close > window_high * (1.0 - config.breakout_tolerance),
                close < window_low * (1.0 + config.breakout_tolerance),
            )
        } else {
            (false, false)
        };

        IndicatorSnapshot {
            ema_fast,
            ema_slow,
            ema_trend,
            macd: macd_snapshot,
            rsi: rsi_value,
            atr: atr_value,
            avg_volume,
            volume_spike,
            swing_low,
            swing_high,
            bullish_breakout,
            bearish_breakdown,
            current_price,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, Utc};

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        let start = Utc::now() - Duration::hours(closes.len() as i64);
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle {
                datetime: start + Duration::hours(i as i64),
                open: c,
                high: c + 0.5,
                low: c - 0.5,
                close: c,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn test_ema_warmup_and_seed() {
        let values = vec![10.0, 11.0, 12.0, 13.0, 14.0];
        let result = ema(&values, 3);

        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        // Seeded with the first value, multiplier 2/(3+1) = 0.5:
        // 10 -> 10.5 -> 11.25 -> 12.125 -> 13.0625
        assert_relative_eq!(result[2].unwrap(), 11.25, epsilon = 1e-9);
        assert_relative_eq!(result[4].unwrap(), 13.0625, epsilon = 1e-9);
    }

    #[test]
    fn test_ema_too_short() {
        let values = vec![10.0, 11.0];
        let result = ema(&values, 5);
        assert!(result.iter().all(|v| v.is_none()));
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let values: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let result = rsi(&values, 14);
        assert_eq!(result.last().unwrap().unwrap(), 100.0);
    }

    #[test]
    fn test_rsi_bounds_and_warmup() {
        let values = vec![
            44.0, 44.25, 44.5, 43.75, 44.5, 44.25, 44.0, 43.5, 44.0, 44.5, 45.0, 45.25, 45.5,
            45.0, 44.75,
        ];
        let result = rsi(&values, 14);

        assert_eq!(result[13], None);
        let last = result[14].unwrap();
        assert!((0.0..=100.0).contains(&last));
    }

    #[test]
    fn test_rsi_trailing_window_value() {
        // period 2 over [10, 11, 10.5]: changes +1.0, -0.5
        // avg gain 0.5, avg loss 0.25, rs = 2, rsi = 100 - 100/3
        let result = rsi(&[10.0, 11.0, 10.5], 2);
        assert_relative_eq!(result[2].unwrap(), 100.0 - 100.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_atr_trailing_mean() {
        let high = vec![10.0, 11.0, 12.0];
        let low = vec![9.0, 10.0, 11.0];
        let close = vec![9.5, 10.5, 11.5];

        // TR: 1.0, then max(1.0, 1.5, 0.5) = 1.5, then max(1.0, 1.5, 0.5) = 1.5
        let result = atr(&high, &low, &close, 2);
        assert_eq!(result[0], None);
        assert_relative_eq!(result[1].unwrap(), 1.25, epsilon = 1e-9);
        assert_relative_eq!(result[2].unwrap(), 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_macd_warmup() {
        let values: Vec<f64> = (1..=50).map(|x| x as f64).collect();
        let (line, signal, histogram) = macd(&values, 12, 26, 9);

        assert_eq!(line[33], None);
        assert!(line[34].is_some());
        assert!(signal.last().unwrap().is_some());
        assert!(histogram.last().unwrap().is_some());
    }

    #[test]
    fn test_average_volume() {
        let volumes = vec![100.0, 200.0, 300.0];
        let result = average_volume(&volumes, 2);
        assert_eq!(result[0], None);
        assert_relative_eq!(result[1].unwrap(), 150.0, epsilon = 1e-9);
        assert_relative_eq!(result[2].unwrap(), 250.0, epsilon = 1e-9);
    }

    #[test]
    fn test_snapshot_empty_input() {
        let snapshot = IndicatorSnapshot::compute(&[], &IndicatorConfig::default());
        assert_eq!(snapshot, IndicatorSnapshot::default());
        assert!(!snapshot.volume_spike);
        assert!(snapshot.current_price.is_none());
    }

    #[test]
    fn test_snapshot_short_history_degrades() {
        let candles = candles_from_closes(&[100.0, 101.0, 102.0]);
        let snapshot = IndicatorSnapshot::compute(&candles, &IndicatorConfig::default());

        assert!(snapshot.ema_trend.is_none());
        assert!(snapshot.macd.is_none());
        assert!(snapshot.rsi.is_none());
        assert!(!snapshot.bullish_breakout);
        assert_eq!(snapshot.current_price, Some(102.0));
    }

    #[test]
    fn test_snapshot_swing_and_breakout() {
        let mut config = IndicatorConfig::default();
        config.swing_lookback = 3;
        config.breakout_lookback = 3;

        let mut candles = candles_from_closes(&[100.0, 101.0, 99.0, 100.5]);
        // Latest candle closes above every prior high (101.5 max + tolerance)
        candles.push(Candle {
            datetime: candles.last().unwrap().datetime + Duration::hours(1),
            open: 100.5,
            high: 103.0,
            low: 100.0,
            close: 102.5,
            volume: 1000.0,
        });

        let snapshot = IndicatorSnapshot::compute(&candles, &config);

        assert_eq!(snapshot.swing_low, Some(98.5));
        assert_eq!(snapshot.swing_high, Some(103.0));
        assert!(snapshot.bullish_breakout);
        assert!(!snapshot.bearish_breakdown);
    }

    #[test]
    fn test_snapshot_volume_spike() {
        let mut config = IndicatorConfig::default();
        config.volume_window = 4;

        let mut candles = candles_from_closes(&[100.0, 100.0, 100.0, 100.0]);
        candles.last_mut().unwrap().volume = 5000.0;

        // avg = (1000*3 + 5000)/4 = 2000; 5000 > 2000 * 1.3
        let snapshot = IndicatorSnapshot::compute(&candles, &config);
        assert!(snapshot.volume_spike);
    }
}
