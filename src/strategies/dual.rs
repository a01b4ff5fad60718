use serde::{Deserialize, Serialize};

use super::{require_positive, GridContext, Level, SlotKey};
use crate::error::GridResult;
use crate::models::{Direction, OrderType};

/// Breakout stop ladders on both sides of price plus reversal limit ladders
/// fading each side. Each leg has its own spacing and SL/TP multiples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DualParams {
    pub breakout_levels: u32,
    pub reversal_levels: u32,
    pub breakout_atr_multiplier: f64,
    pub reversal_atr_multiplier: f64,
    pub breakout_sl_atr: f64,
    pub breakout_tp_atr: f64,
    pub reversal_sl_atr: f64,
    pub reversal_tp_atr: f64,
    /// Also place both ladders for the opposite direction: sell stops below
    /// and sell limits above a buy base. Off keeps only the base direction.
    pub both_sides: bool,
}

impl Default for DualParams {
    fn default() -> Self {
        Self {
            breakout_levels: 2,
            reversal_levels: 2,
            breakout_atr_multiplier: 1.0,
            reversal_atr_multiplier: 0.75,
            breakout_sl_atr: 1.0,
            breakout_tp_atr: 1.5,
            reversal_sl_atr: 1.0,
            reversal_tp_atr: 1.5,
            both_sides: true,
        }
    }
}

impl DualParams {
    pub fn levels(&self, ctx: &GridContext<'_>) -> GridResult<Vec<Level>> {
        require_positive("dual breakout_atr_multiplier", self.breakout_atr_multiplier)?;
        require_positive("dual reversal_atr_multiplier", self.reversal_atr_multiplier)?;
        require_positive("dual breakout_sl_atr", self.breakout_sl_atr)?;
        require_positive("dual breakout_tp_atr", self.breakout_tp_atr)?;
        require_positive("dual reversal_sl_atr", self.reversal_sl_atr)?;
        require_positive("dual reversal_tp_atr", self.reversal_tp_atr)?;

        let direction = ctx.base.direction;
        let mut levels = self.legs(ctx, direction);
        if self.both_sides {
            levels.extend(self.legs(ctx, direction.opposite()));
        }
        Ok(levels)
    }

    fn legs(&self, ctx: &GridContext<'_>, direction: Direction) -> Vec<Level> {
        let mut levels = self.leg(
            ctx,
            direction.stop_order(),
            self.breakout_levels,
            self.breakout_atr_multiplier,
            self.breakout_sl_atr,
            self.breakout_tp_atr,
        );
        levels.extend(self.leg(
            ctx,
            direction.limit_order(),
            self.reversal_levels,
            self.reversal_atr_multiplier,
            self.reversal_sl_atr,
            self.reversal_tp_atr,
        ));
        levels
    }

    fn leg(
        &self,
        ctx: &GridContext<'_>,
        order_type: OrderType,
        count: u32,
        spacing_atr: f64,
        sl_atr: f64,
        tp_atr: f64,
    ) -> Vec<Level> {
        let atr = ctx.base.atr;
        // stops go with the move, limits against it
        let outward = if order_type.is_stop() {
            order_type.direction().sign()
        } else {
            -order_type.direction().sign()
        };
        (1..=count)
            .map(|k| {
                let entry = ctx.base.base_price + outward * k as f64 * spacing_atr * atr;
                ctx.level(
                    SlotKey::new(order_type, k),
                    entry,
                    sl_atr * atr,
                    tp_atr * atr,
                )
            })
            .collect()
    }
}
