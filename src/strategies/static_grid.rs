use serde::{Deserialize, Serialize};

use super::{require_positive, GridContext, Level, SlotKey};
use crate::error::{GridError, GridResult};
use crate::models::Direction;

/// Evenly spaced limit orders between the base price and the base stop,
/// all sharing the base stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticParams {
    pub lines: u32,
    /// Every order targets the base TP; otherwise `reward_risk` from its
    /// own entry and SL
    pub shared_base_tp: bool,
    pub reward_risk: f64,
}

impl Default for StaticParams {
    fn default() -> Self {
        Self {
            lines: 5,
            shared_base_tp: true,
            reward_risk: 1.0,
        }
    }
}

impl StaticParams {
    pub fn levels(&self, ctx: &GridContext<'_>) -> GridResult<Vec<Level>> {
        let base = ctx.base;
        if self.shared_base_tp {
            let tp_on_profit_side = match base.direction {
                Direction::Buy => base.base_tp > base.base_price,
                Direction::Sell => base.base_tp < base.base_price,
            };
            if !tp_on_profit_side {
                return Err(GridError::InvalidParameter(format!(
                    "base_tp {} is on the wrong side of base price {} for a {} trade",
                    base.base_tp, base.base_price, base.direction
                )));
            }
        } else {
            require_positive("static reward_risk", self.reward_risk)?;
        }

        let sign = base.direction.sign();
        let spacing = base.sl_distance() / (self.lines as f64 + 1.0);
        let order_type = base.direction.limit_order();

        Ok((1..=self.lines)
            .map(|k| {
                let entry = ctx.round(base.base_price - sign * k as f64 * spacing);
                let tp = if self.shared_base_tp {
                    base.base_tp
                } else {
                    entry + sign * (entry - base.base_sl).abs() * self.reward_risk
                };
                Level {
                    slot: SlotKey::new(order_type, k),
                    entry,
                    sl: base.base_sl,
                    tp: ctx.round(tp),
                }
            })
            .collect())
    }
}
