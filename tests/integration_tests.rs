//! Integration tests for the trading system
//!
//! These exercise the pipeline across module boundaries: indicator
//! engine into the structure tracker, tracker output into risk sizing
//! and the journal.

use approx::assert_relative_eq;
use chrono::{Duration, Utc};

use bos_trader::journal::{JournalEvent, TradeJournal, TradeRecord};
use bos_trader::risk::{RiskConfig, RiskManager};
use bos_trader::strategies::bos::{detect_break, retracement_zone};
use bos_trader::strategies::{BosConfig, StructureTracker};
use bos_trader::types::{Candle, Symbol, TradeDirection};

// =============================================================================
// Test Utilities
// =============================================================================

fn candle(i: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        datetime: Utc::now() + Duration::hours(i),
        open,
        high,
        low,
        close,
        volume: 1000.0 + i as f64,
    }
}

/// Deterministic wavy series for scanning many prefixes
fn generate_wavy_candles(count: usize, base_price: f64, amplitude: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let phase = match i % 6 {
                0 => 0.0,
                1 => 0.6,
                2 => 1.0,
                3 => 0.7,
                4 => 0.2,
                _ => -0.4,
            };
            let drift = i as f64 * amplitude * 0.05;
            let price = base_price + amplitude * phase + drift;
            candle(
                i as i64,
                price - amplitude * 0.1,
                price + amplitude * 0.3,
                price - amplitude * 0.3,
                price,
            )
        })
        .collect()
}

/// Steadily rising series
fn generate_trending_candles(count: usize, base_price: f64, step: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let price = base_price + i as f64 * step;
            candle(
                i as i64,
                price - step * 0.4,
                price + step * 0.6,
                price - step * 0.6,
                price,
            )
        })
        .collect()
}

fn small_bos_config() -> BosConfig {
    let mut config = BosConfig {
        higher_lookback: 4,
        lower_lookback: 3,
        swing_neighbor: 1,
        ..BosConfig::default()
    };
    config.indicators.ema_trend = 7;
    config
}

/// Higher timeframe: break of the 103 structure high, impulse 95 -> 104
fn higher_break_tick() -> Vec<Candle> {
    vec![
        candle(0, 79.0, 81.0, 78.0, 80.0),
        candle(1, 80.0, 86.0, 79.5, 85.0),
        candle(2, 90.0, 98.0, 96.0, 97.0),
        candle(3, 97.0, 99.0, 95.0, 96.0),
        candle(4, 96.0, 101.0, 96.5, 100.0),
        candle(5, 100.0, 103.0, 99.0, 102.0),
        candle(6, 102.0, 102.9, 101.5, 102.5),
        candle(7, 102.5, 104.0, 102.0, 104.0),
    ]
}

fn higher_pullback_tick() -> Vec<Candle> {
    let mut candles = higher_break_tick();
    candles.push(candle(8, 104.0, 104.2, 98.8, 99.0));
    candles
}

/// Lower timeframe: confirmation impulse 98 -> 99.5
fn lower_confirmation_tick() -> Vec<Candle> {
    vec![
        candle(0, 98.5, 98.8, 98.3, 98.6),
        candle(1, 98.6, 98.7, 98.2, 98.5),
        candle(2, 98.5, 98.9, 98.1, 98.4),
        candle(3, 98.4, 98.8, 98.0, 98.45),
        candle(4, 98.45, 99.1, 98.35, 98.7),
        candle(5, 98.7, 99.2, 98.6, 98.9),
        candle(6, 98.9, 99.3, 98.9, 99.1),
        candle(7, 99.1, 99.5, 99.0, 99.4),
    ]
}

// =============================================================================
// Pipeline robustness
// =============================================================================

#[test]
fn test_analyze_never_panics_on_short_sequences() {
    let wavy = generate_wavy_candles(40, 100.0, 2.0);

    for higher_len in 0..wavy.len() {
        for lower_len in [0usize, 1, 5, 12] {
            let mut tracker = StructureTracker::new(BosConfig::default());
            let analysis = tracker.analyze(&wavy[..higher_len], &wavy[..lower_len]);

            assert!(!analysis.long_signal.reasons.is_empty());
            assert!(!analysis.short_signal.reasons.is_empty());
            if higher_len < tracker.config().min_higher_candles() {
                assert!(!analysis.long_signal.signal);
                assert!(!analysis.short_signal.signal);
            }
        }
    }
}

#[test]
fn test_zone_bounds_stay_inside_the_impulse() {
    let wavy = generate_wavy_candles(120, 50.0, 3.0);

    for len in 12..wavy.len() {
        let prefix = &wavy[..len];
        for direction in [TradeDirection::Bullish, TradeDirection::Bearish] {
            if let Some(brk) = detect_break(prefix, direction, 8, 2) {
                let zone = retracement_zone(&brk.impulse, direction, 0.5, 0.618);
                assert!(zone.low < zone.high, "zone must be normalized");

                if brk.impulse.size() > 0.0 {
                    let lo = brk.impulse.start.min(brk.impulse.end);
                    let hi = brk.impulse.start.max(brk.impulse.end);
                    assert!(zone.low > lo && zone.high < hi);
                }
            }
        }
    }
}

#[test]
fn test_trend_emerges_with_enough_history() {
    let trending = generate_trending_candles(80, 100.0, 0.8);
    let mut tracker = StructureTracker::new(BosConfig::default());

    let analysis = tracker.analyze(&trending, &trending);
    assert_eq!(analysis.state.trend, Some(TradeDirection::Bullish));
    // An uptrend alone is not a signal
    assert!(!analysis.long_signal.signal);
}

// =============================================================================
// Full setup -> sizing -> journal
// =============================================================================

#[test]
fn test_full_setup_feeds_risk_sizing_and_journal() {
    let mut tracker = StructureTracker::new(small_bos_config());
    tracker.analyze(&higher_break_tick(), &lower_confirmation_tick()[..7]);
    let analysis = tracker.analyze(&higher_pullback_tick(), &lower_confirmation_tick());

    assert!(analysis.long_signal.signal);
    let plan = tracker.trade_plan().expect("locked-in proposal");
    assert_relative_eq!(plan.entry_price, 98.75, epsilon = 1e-9);
    assert_relative_eq!(plan.stop_loss, 98.498, epsilon = 1e-9);

    // Fixed-risk sizing over the proposal
    let risk = RiskManager::new(RiskConfig::default());
    let quantity = risk.position_size(10_000.0, plan.entry_price, plan.stop_loss);
    let expected = (10_000.0 * 0.02) / (98.75 - 98.498);
    assert_relative_eq!(quantity, expected, epsilon = 1e-6);
    assert!(quantity > 0.0);

    // Journal the entry and read it back
    let path = std::env::temp_dir().join(format!(
        "bos_integration_journal_{}.ndjson",
        std::process::id()
    ));
    std::fs::remove_file(&path).ok();

    let journal = TradeJournal::new(&path);
    journal
        .append(&TradeRecord {
            timestamp: Utc::now(),
            event: JournalEvent::Entry,
            symbol: Symbol::new("BTC-USDT"),
            direction: plan.direction,
            quantity,
            entry_price: plan.entry_price,
            stop_loss: Some(plan.stop_loss),
            take_profit: Some(plan.take_profit),
            exit_price: None,
            pnl: None,
            order_id: None,
            paper: true,
            note: None,
        })
        .unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let record: TradeRecord = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
    assert_eq!(record.direction, TradeDirection::Bullish);
    assert_relative_eq!(record.entry_price, 98.75, epsilon = 1e-9);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_proposal_survives_new_data_until_reset() {
    let mut tracker = StructureTracker::new(small_bos_config());
    tracker.analyze(&higher_break_tick(), &lower_confirmation_tick()[..7]);
    tracker.analyze(&higher_pullback_tick(), &lower_confirmation_tick());
    let locked = tracker.trade_plan().unwrap();

    // Feed progressively extended series; the proposal must not move
    let mut higher = higher_pullback_tick();
    let mut lower = lower_confirmation_tick();
    for i in 0..5 {
        higher.push(candle(9 + i, 99.0, 101.0 + i as f64, 98.5, 100.0 + i as f64));
        lower.push(candle(8 + i, 99.4, 100.0 + i as f64, 99.0, 99.8 + i as f64));

        let analysis = tracker.analyze(&higher, &lower);
        assert!(analysis.state.entry_proposed);
        assert_eq!(tracker.trade_plan().unwrap(), locked);
    }

    tracker.reset_state();
    assert!(tracker.trade_plan().is_none());

    // After the reset the full pipeline replays from scratch
    tracker.analyze(&higher_break_tick(), &lower_confirmation_tick()[..7]);
    tracker.analyze(&higher_pullback_tick(), &lower_confirmation_tick());
    assert_eq!(tracker.trade_plan().unwrap(), locked);
}
