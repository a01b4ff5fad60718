use serde::{Deserialize, Serialize};

use super::{require_positive, GridContext, Level, SlotKey};
use crate::error::GridResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PyramidStop {
    /// `sl_atr × ATR` from the order's own entry
    FixedAtr,
    /// At the previous level's entry (base price for the first level)
    PreviousLevel,
}

/// Same-direction stop orders adding to a winning position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PyramidParams {
    pub levels: u32,
    pub spacing_atr: f64,
    pub stop: PyramidStop,
    pub sl_atr: f64,
    pub tp_atr: f64,
}

impl Default for PyramidParams {
    fn default() -> Self {
        Self {
            levels: 3,
            spacing_atr: 1.0,
            stop: PyramidStop::PreviousLevel,
            sl_atr: 1.0,
            tp_atr: 2.0,
        }
    }
}

impl PyramidParams {
    pub fn levels(&self, ctx: &GridContext<'_>) -> GridResult<Vec<Level>> {
        require_positive("pyramid spacing_atr", self.spacing_atr)?;
        require_positive("pyramid sl_atr", self.sl_atr)?;
        require_positive("pyramid tp_atr", self.tp_atr)?;

        let atr = ctx.base.atr;
        let direction = ctx.base.direction;
        let sign = direction.sign();
        let spacing = atr * self.spacing_atr;

        let mut levels = Vec::with_capacity(self.levels as usize);
        let mut previous_entry = ctx.base.base_price;
        for k in 1..=self.levels {
            let entry = ctx.base.base_price + sign * k as f64 * spacing;
            let sl_distance = match self.stop {
                PyramidStop::FixedAtr => atr * self.sl_atr,
                PyramidStop::PreviousLevel => (entry - previous_entry).abs(),
            };
            levels.push(ctx.level(
                SlotKey::new(direction.stop_order(), k),
                entry,
                sl_distance,
                atr * self.tp_atr,
            ));
            previous_entry = entry;
        }
        Ok(levels)
    }
}
