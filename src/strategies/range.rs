use serde::{Deserialize, Serialize};

use super::{require_non_negative, require_positive, GridContext, Level, SlotKey};
use crate::error::{GridError, GridResult};
use crate::models::OrderType;

/// Where the range edges come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RangeSource {
    Bollinger,
    Static { low: f64, high: f64 },
    RecentHighLow { bars: usize },
}

/// Sell limits in the upper half, buy limits in the lower half, stepping
/// inward from each edge by a fraction of the range width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeParams {
    pub per_side: u32,
    pub spacing_fraction: f64,
    pub sl_buffer_atr: f64,
    /// Target the opposite edge instead of `tp_atr × ATR`
    pub tp_other_side: bool,
    pub tp_atr: f64,
    pub source: RangeSource,
}

impl Default for RangeParams {
    fn default() -> Self {
        Self {
            per_side: 3,
            spacing_fraction: 0.2,
            sl_buffer_atr: 0.5,
            tp_other_side: true,
            tp_atr: 1.5,
            source: RangeSource::Bollinger,
        }
    }
}

impl RangeParams {
    /// (lower, upper) edges of the range.
    pub fn bounds(&self, ctx: &GridContext<'_>) -> GridResult<(f64, f64)> {
        let (low, high) = match &self.source {
            RangeSource::Bollinger => {
                let ind = &ctx.snapshot.indicators;
                if ind.bb_upper.is_nan() {
                    return Err(GridError::DataInsufficient {
                        indicator: "bb_upper",
                    });
                }
                if ind.bb_lower.is_nan() {
                    return Err(GridError::DataInsufficient {
                        indicator: "bb_lower",
                    });
                }
                (ind.bb_lower, ind.bb_upper)
            }
            RangeSource::Static { low, high } => (*low, *high),
            RangeSource::RecentHighLow { bars } => {
                let candles = &ctx.snapshot.candles;
                if *bars == 0 || candles.len() < *bars {
                    return Err(GridError::DataInsufficient {
                        indicator: "recent_high_low",
                    });
                }
                let window = candles.tail(*bars);
                (window.lows_min(), window.highs_max())
            }
        };
        if !(high > low) {
            return Err(GridError::DegenerateRange {
                what: "range bounds",
                low,
                high,
            });
        }
        Ok((low, high))
    }

    pub fn levels(&self, ctx: &GridContext<'_>) -> GridResult<Vec<Level>> {
        require_positive("range spacing_fraction", self.spacing_fraction)?;
        require_non_negative("range sl_buffer_atr", self.sl_buffer_atr)?;
        if !self.tp_other_side {
            require_positive("range tp_atr", self.tp_atr)?;
        }

        let (low, high) = self.bounds(ctx)?;
        let atr = ctx.base.atr;
        let mid = (low + high) / 2.0;
        let step = (high - low) * self.spacing_fraction;
        let buffer = self.sl_buffer_atr * atr;

        let mut levels = Vec::new();
        for i in 0..self.per_side {
            let entry = high - i as f64 * step;
            if entry <= mid {
                break;
            }
            let tp = if self.tp_other_side {
                low
            } else {
                entry - self.tp_atr * atr
            };
            levels.push(Level {
                slot: SlotKey::new(OrderType::SellLimit, i + 1),
                entry: ctx.round(entry),
                sl: ctx.round(high + buffer),
                tp: ctx.round(tp),
            });
        }
        for i in 0..self.per_side {
            let entry = low + i as f64 * step;
            if entry >= mid {
                break;
            }
            let tp = if self.tp_other_side {
                high
            } else {
                entry + self.tp_atr * atr
            };
            levels.push(Level {
                slot: SlotKey::new(OrderType::BuyLimit, i + 1),
                entry: ctx.round(entry),
                sl: ctx.round(low - buffer),
                tp: ctx.round(tp),
            });
        }
        Ok(levels)
    }
}
