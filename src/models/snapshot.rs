use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{GridError, GridResult};
use crate::models::{CandleSeries, Direction, SwingType};

/// The trade a grid is built around. Immutable once a grid exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseTrade {
    pub symbol: String,
    pub direction: Direction,
    pub base_price: f64,
    pub base_sl: f64,
    pub base_tp: f64,
    #[serde(default)]
    pub base_size: f64,
    pub atr: f64,
}

impl BaseTrade {
    pub fn validate_atr(&self) -> GridResult<()> {
        if self.atr.is_finite() && self.atr > 0.0 {
            Ok(())
        } else {
            Err(GridError::InvalidAtr(self.atr))
        }
    }

    /// ATR first, then the stop loss position relative to the base price.
    pub fn validate(&self) -> GridResult<()> {
        self.validate_atr()?;
        for (name, value) in [
            ("base_price", self.base_price),
            ("base_sl", self.base_sl),
            ("base_tp", self.base_tp),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GridError::InvalidParameter(format!(
                    "{name} must be a positive price, got {value}"
                )));
            }
        }
        if self.base_sl == self.base_price {
            return Err(GridError::DegenerateRange {
                what: "base price to stop loss distance",
                low: self.base_sl,
                high: self.base_price,
            });
        }
        let sl_on_loss_side = match self.direction {
            Direction::Buy => self.base_sl < self.base_price,
            Direction::Sell => self.base_sl > self.base_price,
        };
        if !sl_on_loss_side {
            return Err(GridError::StopOnWrongSide {
                direction: self.direction,
                base_price: self.base_price,
                base_sl: self.base_sl,
            });
        }
        Ok(())
    }

    pub fn sl_distance(&self) -> f64 {
        (self.base_price - self.base_sl).abs()
    }

    pub fn tp_distance(&self) -> f64 {
        (self.base_tp - self.base_price).abs()
    }

    /// Same direction and SL/TP distances, anchored at `price`.
    pub fn recentered_at(&self, price: f64) -> BaseTrade {
        let sign = self.direction.sign();
        BaseTrade {
            base_price: price,
            base_sl: price - sign * self.sl_distance(),
            base_tp: price + sign * self.tp_distance(),
            ..self.clone()
        }
    }
}

fn nan() -> f64 {
    f64::NAN
}

fn nan_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Latest indicator readings for one symbol. Missing values are NaN.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    #[serde(default = "nan", deserialize_with = "nan_if_null")]
    pub atr: f64,
    #[serde(default = "nan", deserialize_with = "nan_if_null")]
    pub atr_median: f64,
    #[serde(default = "nan", deserialize_with = "nan_if_null")]
    pub ema_short: f64,
    #[serde(default = "nan", deserialize_with = "nan_if_null")]
    pub ema_long: f64,
    #[serde(default = "nan", deserialize_with = "nan_if_null")]
    pub adx: f64,
    #[serde(default = "nan", deserialize_with = "nan_if_null")]
    pub plus_di: f64,
    #[serde(default = "nan", deserialize_with = "nan_if_null")]
    pub minus_di: f64,
    #[serde(default = "nan", deserialize_with = "nan_if_null")]
    pub bb_upper: f64,
    #[serde(default = "nan", deserialize_with = "nan_if_null")]
    pub bb_middle: f64,
    #[serde(default = "nan", deserialize_with = "nan_if_null")]
    pub bb_lower: f64,
}

impl Default for IndicatorSnapshot {
    fn default() -> Self {
        Self {
            atr: f64::NAN,
            atr_median: f64::NAN,
            ema_short: f64::NAN,
            ema_long: f64::NAN,
            adx: f64::NAN,
            plus_di: f64::NAN,
            minus_di: f64::NAN,
            bb_upper: f64::NAN,
            bb_middle: f64::NAN,
            bb_lower: f64::NAN,
        }
    }
}

impl IndicatorSnapshot {
    /// Bollinger band width as a fraction of the middle band.
    pub fn bb_width_fraction(&self) -> f64 {
        (self.bb_upper - self.bb_lower) / self.bb_middle
    }

    pub fn ema_slope(&self) -> f64 {
        self.ema_short - self.ema_long
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub swing_type: SwingType,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Everything a grid model or the regime selector may look at. Captured
/// once per grid so regeneration sees the same inputs as creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub candles: CandleSeries,
    #[serde(default)]
    pub indicators: IndicatorSnapshot,
    #[serde(default)]
    pub swings: Vec<SwingPoint>,
}

impl MarketSnapshot {
    pub fn new(indicators: IndicatorSnapshot) -> Self {
        Self {
            candles: CandleSeries::default(),
            indicators,
            swings: Vec::new(),
        }
    }

    pub fn with_candles(mut self, candles: CandleSeries) -> Self {
        self.candles = candles;
        self
    }

    pub fn with_swings(mut self, swings: Vec<SwingPoint>) -> Self {
        self.swings = swings;
        self
    }

    /// Absolute price distance from `price` to the closest swing level.
    pub fn nearest_swing_distance(&self, price: f64) -> Option<f64> {
        self.swings
            .iter()
            .map(|s| (s.price - price).abs())
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Distance to the closest swing level in ATR units; +inf without swings.
    pub fn swing_distance_atr(&self, price: f64, atr: f64) -> f64 {
        match self.nearest_swing_distance(price) {
            Some(d) => d / atr,
            None => f64::INFINITY,
        }
    }
}
