use chrono::{DateTime, Duration, Utc};

use crate::core::risk::{default_symbols, RiskSizer};
use crate::models::{
    BaseTrade, Candle, CandleSeries, Direction, IndicatorSnapshot, MarketSnapshot, OrderStatus,
    OrderType, SwingPoint, SwingType,
};
use crate::strategies::SlotKey;
use crate::trading::PendingOrder;

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Create candles from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
pub fn make_candles(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = base_time();

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

/// A single candle at the base timestamp.
pub fn bar(open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        timestamp: base_time(),
        open,
        high,
        low,
        close,
        volume: 100.0,
    }
}

/// EURUSD buy: SL 50 pips below, TP 100 pips above, 0.1 lots.
pub fn buy_trade(price: f64, atr: f64) -> BaseTrade {
    BaseTrade {
        symbol: "EURUSD".to_string(),
        direction: Direction::Buy,
        base_price: price,
        base_sl: price - 0.0050,
        base_tp: price + 0.0100,
        base_size: 0.1,
        atr,
    }
}

/// Mirror of [`buy_trade`].
pub fn sell_trade(price: f64, atr: f64) -> BaseTrade {
    BaseTrade {
        symbol: "EURUSD".to_string(),
        direction: Direction::Sell,
        base_price: price,
        base_sl: price + 0.0050,
        base_tp: price - 0.0100,
        base_size: 0.1,
        atr,
    }
}

pub fn swing(swing_type: SwingType, price: f64) -> SwingPoint {
    SwingPoint {
        swing_type,
        price,
        timestamp: base_time(),
    }
}

pub fn test_sizer() -> RiskSizer {
    RiskSizer::new(default_symbols(), 0.5)
}

/// Strong uptrend around 1.1000: ADX 30, rising EMAs, bands wide enough
/// not to read as a range, nearest swing 2.5 ATR away.
pub fn trending_snapshot() -> MarketSnapshot {
    MarketSnapshot::new(IndicatorSnapshot {
        atr: 0.0010,
        atr_median: 0.0010,
        ema_short: 1.1010,
        ema_long: 1.0990,
        adx: 30.0,
        plus_di: 28.0,
        minus_di: 14.0,
        bb_upper: 1.1400,
        bb_middle: 1.1000,
        bb_lower: 1.0600,
    })
    .with_swings(vec![
        swing(SwingType::High, 1.1025),
        swing(SwingType::High, 1.1040),
        swing(SwingType::High, 1.1060),
        swing(SwingType::Low, 1.0975),
        swing(SwingType::Low, 1.0960),
        swing(SwingType::Low, 1.0940),
    ])
}

/// Flat market inside tight bands 1.0970-1.1030.
pub fn ranging_snapshot() -> MarketSnapshot {
    MarketSnapshot::new(IndicatorSnapshot {
        atr: 0.0010,
        atr_median: 0.0010,
        ema_short: 1.1000,
        ema_long: 1.1000,
        adx: 12.0,
        plus_di: 18.0,
        minus_di: 18.0,
        bb_upper: 1.1030,
        bb_middle: 1.1000,
        bb_lower: 1.0970,
    })
}

/// A pending EURUSD order at slot #1 of its type.
pub fn pending_order(order_type: OrderType, entry: f64, sl: f64, tp: f64) -> PendingOrder {
    PendingOrder {
        order_id: "grid_test_EURUSD_1-1".to_string(),
        symbol: "EURUSD".to_string(),
        order_type,
        entry_price: entry,
        sl_price: sl,
        tp_price: tp,
        lot_size: 0.1,
        status: OrderStatus::Pending,
        source_grid_id: "grid_test_EURUSD_1".to_string(),
        regeneration_attempt: 0,
        cooldown_until_bar: None,
        origin_slot: SlotKey::new(order_type, 1),
        triggered_at_bar: None,
        closed_at_bar: None,
    }
}
