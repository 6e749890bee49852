//! Structural primitives: breaks, impulses, retracement zones
//!
//! Everything here is a pure function over candle slices; the tracker
//! threads these through its per-tick pipeline. One break type serves
//! both timeframes: the lookback is a parameter of detection, not of
//! the type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Candle, TradeDirection, TradePlan};

/// The price excursion whose retracement is measured
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Impulse {
    pub start: f64,
    pub end: f64,
}

impl Impulse {
    pub fn size(&self) -> f64 {
        (self.end - self.start).abs()
    }
}

/// A close beyond a recent structure extreme, in trend direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureBreak {
    pub direction: TradeDirection,
    /// The resistance (bullish) or support (bearish) level that broke
    pub break_level: f64,
    pub impulse: Impulse,
    pub timestamp: DateTime<Utc>,
}

/// Fibonacci band of an impulse, stored with `low < high` regardless of
/// trade direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetracementZone {
    pub low: f64,
    pub high: f64,
    pub direction: TradeDirection,
}

impl RetracementZone {
    /// Inclusive membership test
    pub fn contains(&self, price: f64) -> bool {
        self.low <= price && price <= self.high
    }
}

/// Everything the tracker remembers between ticks.
///
/// Mutated only by `StructureTracker::analyze` and cleared only by
/// `StructureTracker::reset_state`. `entry_proposed == true` implies the
/// three price fields and `lower_break` are all populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyState {
    pub trend: Option<TradeDirection>,
    pub higher_break: Option<StructureBreak>,
    pub retracement_zone: Option<RetracementZone>,
    pub in_retracement_zone: bool,
    pub lower_break: Option<StructureBreak>,
    pub entry_proposed: bool,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

/// Last local low with `neighbor` strictly higher lows on each side.
///
/// Scans from the most recent interior candle backwards; candles too
/// close to either edge to have a full neighborhood are skipped.
pub fn last_swing_low(candles: &[Candle], neighbor: usize) -> Option<f64> {
    if neighbor == 0 || candles.len() < 2 * neighbor + 1 {
        return None;
    }

    for i in (neighbor..candles.len() - neighbor).rev() {
        let low = candles[i].low;
        let is_swing = candles[i - neighbor..i]
            .iter()
            .chain(&candles[i + 1..=i + neighbor])
            .all(|c| c.low > low);
        if is_swing {
            return Some(low);
        }
    }

    None
}

/// Mirror of [`last_swing_low`] for local highs
pub fn last_swing_high(candles: &[Candle], neighbor: usize) -> Option<f64> {
    if neighbor == 0 || candles.len() < 2 * neighbor + 1 {
        return None;
    }

    for i in (neighbor..candles.len() - neighbor).rev() {
        let high = candles[i].high;
        let is_swing = candles[i - neighbor..i]
            .iter()
            .chain(&candles[i + 1..=i + neighbor])
            .all(|c| c.high < high);
        if is_swing {
            return Some(high);
        }
    }

    None
}

/// Detect a structural break at the latest candle.
///
/// The last `lookback + 2` candles split into a structure window and a
/// previous/current pair. A bullish break requires the current close
/// strictly above the window's max high while the previous close was
/// still at or below it; a break that happened on an earlier candle is
/// not re-flagged once price stays extended. Bearish is the mirror over
/// the window's min low.
///
/// The impulse runs from the last interior swing extreme of the scanned
/// slice (window plus the pre-break candle) to the breaking candle's
/// high/low; when no candle has a full swing neighborhood the slice's
/// extreme is used instead.
pub fn detect_break(
    candles: &[Candle],
    direction: TradeDirection,
    lookback: usize,
    swing_neighbor: usize,
) -> Option<StructureBreak> {
    if lookback == 0 || candles.len() < lookback + 2 {
        return None;
    }

    let tail = &candles[candles.len() - lookback - 2..];
    let (window, edge) = tail.split_at(lookback);
    let previous = &edge[0];
    let current = &edge[1];

    // Window plus the pre-break candle; the breaking candle itself is
    // excluded from the impulse-origin search.
    let search = &tail[..lookback + 1];

    match direction {
        TradeDirection::Bullish => {
            let resistance = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
            if current.close > resistance && previous.close <= resistance {
                let start = last_swing_low(search, swing_neighbor).unwrap_or_else(|| {
                    search.iter().map(|c| c.low).fold(f64::MAX, f64::min)
                });
                Some(StructureBreak {
                    direction,
                    break_level: resistance,
                    impulse: Impulse {
                        start,
                        end: current.high,
                    },
                    timestamp: current.datetime,
                })
            } else {
                None
            }
        }
        TradeDirection::Bearish => {
            let support = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
            if current.close < support && previous.close >= support {
                let start = last_swing_high(search, swing_neighbor).unwrap_or_else(|| {
                    search.iter().map(|c| c.high).fold(f64::MIN, f64::max)
                });
                Some(StructureBreak {
                    direction,
                    break_level: support,
                    impulse: Impulse {
                        start,
                        end: current.low,
                    },
                    timestamp: current.datetime,
                })
            } else {
                None
            }
        }
    }
}

/// Fibonacci band between the `fib_entry` and `fib_stop` retracements of
/// an impulse, normalized so `low < high`
pub fn retracement_zone(
    impulse: &Impulse,
    direction: TradeDirection,
    fib_entry: f64,
    fib_stop: f64,
) -> RetracementZone {
    let size = impulse.size();
    let (a, b) = match direction {
        TradeDirection::Bullish => (
            impulse.end - fib_stop * size,
            impulse.end - fib_entry * size,
        ),
        TradeDirection::Bearish => (
            impulse.end + fib_entry * size,
            impulse.end + fib_stop * size,
        ),
    };

    RetracementZone {
        low: a.min(b),
        high: a.max(b),
        direction,
    }
}

/// Derive entry, stop and target from a confirmation impulse.
///
/// Entry sits at the `fib_entry` retracement, the stop at the `fib_stop`
/// retracement pushed `stop_buffer × size` further away from the entry,
/// and the target at `risk_reward` times the risk distance in the
/// trade's favor.
pub fn entry_plan(
    impulse: &Impulse,
    direction: TradeDirection,
    fib_entry: f64,
    fib_stop: f64,
    stop_buffer: f64,
    risk_reward: f64,
) -> TradePlan {
    let size = impulse.size();
    match direction {
        TradeDirection::Bullish => {
            let entry_price = impulse.end - fib_entry * size;
            let stop_loss = impulse.end - fib_stop * size - stop_buffer * size;
            let take_profit = entry_price + (entry_price - stop_loss) * risk_reward;
            TradePlan {
                direction,
                entry_price,
                stop_loss,
                take_profit,
            }
        }
        TradeDirection::Bearish => {
            let entry_price = impulse.end + fib_entry * size;
            let stop_loss = impulse.end + fib_stop * size + stop_buffer * size;
            let take_profit = entry_price - (stop_loss - entry_price) * risk_reward;
            TradePlan {
                direction,
                entry_price,
                stop_loss,
                take_profit,
            }
        }
    }
}
