#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use fx_grid_engine::config::Config;
use fx_grid_engine::models::{BaseTrade, Candle, CandleSeries, Direction, IndicatorSnapshot, MarketSnapshot};

/// Create candles from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc);

    let candles: Vec<Candle> = data
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle {
            timestamp: base + Duration::minutes(i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
        })
        .collect();

    CandleSeries::new(candles)
}

pub fn bar(o: f64, h: f64, l: f64, c: f64) -> Candle {
    make_candles(&[(o, h, l, c)])[0].clone()
}

pub fn eurusd_buy() -> BaseTrade {
    BaseTrade {
        symbol: "EURUSD".to_string(),
        direction: Direction::Buy,
        base_price: 1.1000,
        base_sl: 1.0950,
        base_tp: 1.1100,
        base_size: 0.1,
        atr: 0.0010,
    }
}

pub fn xauusd_sell() -> BaseTrade {
    BaseTrade {
        symbol: "XAUUSD".to_string(),
        direction: Direction::Sell,
        base_price: 2000.0,
        base_sl: 2010.0,
        base_tp: 1980.0,
        base_size: 0.1,
        atr: 2.0,
    }
}

/// ADX 30 with EMAs rising, wide bands, no swings supplied.
pub fn trending_up(price: f64, atr: f64) -> MarketSnapshot {
    MarketSnapshot::new(IndicatorSnapshot {
        atr,
        atr_median: atr,
        ema_short: price + atr,
        ema_long: price - atr,
        adx: 30.0,
        plus_di: 30.0,
        minus_di: 12.0,
        bb_upper: price * 1.04,
        bb_middle: price,
        bb_lower: price * 0.96,
    })
}

/// ATR twice its median, no trend, wide bands.
pub fn volatile(price: f64, atr: f64) -> MarketSnapshot {
    MarketSnapshot::new(IndicatorSnapshot {
        atr,
        atr_median: atr / 2.0,
        ema_short: price,
        ema_long: price,
        adx: 18.0,
        plus_di: 20.0,
        minus_di: 20.0,
        bb_upper: price * 1.04,
        bb_middle: price,
        bb_lower: price * 0.96,
    })
}

/// Defaults with a 2-bar cooldown and widening off, so stopped-out slots
/// come back at their original prices.
pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.regeneration.cooldown_bars = 2;
    cfg.regeneration.widening.enabled = false;
    cfg
}
