use serde::{Deserialize, Serialize};

use super::{require_positive, GridContext, Level, SlotKey};
use crate::error::GridResult;
use crate::models::Direction;

/// Stop orders every `atr_multiplier × ATR` beyond the base price in the
/// trade direction, optionally mirrored on the other side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityParams {
    pub levels: u32,
    pub atr_multiplier: f64,
    pub sl_atr_multiplier: f64,
    pub tp_atr_multiplier: f64,
    /// Opposite-direction stop orders below (for buys) the base price
    pub mirror_levels: u32,
}

impl Default for VolatilityParams {
    fn default() -> Self {
        Self {
            levels: 3,
            atr_multiplier: 1.0,
            sl_atr_multiplier: 1.0,
            tp_atr_multiplier: 1.0,
            mirror_levels: 0,
        }
    }
}

impl VolatilityParams {
    pub fn levels(&self, ctx: &GridContext<'_>) -> GridResult<Vec<Level>> {
        require_positive("volatility atr_multiplier", self.atr_multiplier)?;
        require_positive("volatility sl_atr_multiplier", self.sl_atr_multiplier)?;
        require_positive("volatility tp_atr_multiplier", self.tp_atr_multiplier)?;

        let direction = ctx.base.direction;
        let mut levels = self.ladder(ctx, direction, self.levels);
        levels.extend(self.ladder(ctx, direction.opposite(), self.mirror_levels));
        Ok(levels)
    }

    fn ladder(&self, ctx: &GridContext<'_>, direction: Direction, count: u32) -> Vec<Level> {
        let atr = ctx.base.atr;
        let spacing = atr * self.atr_multiplier;
        (1..=count)
            .map(|k| {
                let entry = ctx.base.base_price + direction.sign() * k as f64 * spacing;
                ctx.level(
                    SlotKey::new(direction.stop_order(), k),
                    entry,
                    atr * self.sl_atr_multiplier,
                    atr * self.tp_atr_multiplier,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::risk::default_symbols;
    use crate::models::{MarketSnapshot, OrderType};
    use crate::strategies::GridModel;
    use crate::test_helpers::{buy_trade, sell_trade, test_sizer};

    #[test]
    fn buy_base_three_stop_levels() {
        let symbols = default_symbols();
        let base = buy_trade(1.1000, 0.0010);
        let snapshot = MarketSnapshot::default();
        let ctx = GridContext::new(&base, &snapshot, &symbols["EURUSD"]);
        let plan = GridModel::Volatility(VolatilityParams::default())
            .generate_grid_orders(&ctx, &test_sizer(), 10.0, 10_000.0)
            .unwrap();

        assert_eq!(plan.orders.len(), 3);
        assert!(plan.skipped.is_empty());
        for (o, expected) in plan.orders.iter().zip([1.1010, 1.1020, 1.1030]) {
            assert_eq!(o.order_type, OrderType::BuyStop);
            assert!((o.entry - expected).abs() < 1e-9);
            assert!((o.sl - (expected - 0.0010)).abs() < 1e-9);
            assert!((o.tp - (expected + 0.0010)).abs() < 1e-9);
            assert!((o.lot_size - 0.1).abs() < 1e-9);
        }
    }

    #[test]
    fn sell_base_mirrors_below() {
        let symbols = default_symbols();
        let base = sell_trade(1.1000, 0.0010);
        let snapshot = MarketSnapshot::default();
        let ctx = GridContext::new(&base, &snapshot, &symbols["EURUSD"]);
        let params = VolatilityParams {
            levels: 2,
            atr_multiplier: 1.5,
            mirror_levels: 1,
            ..VolatilityParams::default()
        };
        let levels = params.levels(&ctx).unwrap();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0].order_type(), OrderType::SellStop);
        assert!((levels[0].entry - 1.0985).abs() < 1e-9);
        assert!((levels[1].entry - 1.0970).abs() < 1e-9);
        assert!(levels[0].sl > levels[0].entry);
        assert_eq!(levels[2].order_type(), OrderType::BuyStop);
        assert!((levels[2].entry - 1.1015).abs() < 1e-9);
    }

    #[test]
    fn non_positive_multiplier_is_rejected() {
        let symbols = default_symbols();
        let base = buy_trade(1.1000, 0.0010);
        let snapshot = MarketSnapshot::default();
        let ctx = GridContext::new(&base, &snapshot, &symbols["EURUSD"]);
        let params = VolatilityParams {
            atr_multiplier: 0.0,
            ..VolatilityParams::default()
        };
        assert!(params.levels(&ctx).unwrap_err().is_validation());
    }
}
