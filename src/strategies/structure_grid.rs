use serde::{Deserialize, Serialize};

use super::{require_non_negative, require_positive, GridContext, Level, SlotKey};
use crate::core::structure::nearest_levels;
use crate::error::GridResult;
use crate::models::{Direction, OrderType, SwingType};

/// Orders anchored at the nearest swing levels: breakout stops past the
/// levels in the trade direction, limits resting at the levels behind price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureParams {
    /// Swing levels used per side
    pub levels: u32,
    pub entry_buffer_atr: f64,
    /// SL distance beyond the swing level
    pub sl_atr: f64,
    pub tp_atr: f64,
}

impl Default for StructureParams {
    fn default() -> Self {
        Self {
            levels: 3,
            entry_buffer_atr: 0.1,
            sl_atr: 1.0,
            tp_atr: 1.5,
        }
    }
}

impl StructureParams {
    pub fn levels(&self, ctx: &GridContext<'_>) -> GridResult<Vec<Level>> {
        require_non_negative("structure entry_buffer_atr", self.entry_buffer_atr)?;
        require_positive("structure sl_atr", self.sl_atr)?;
        require_positive("structure tp_atr", self.tp_atr)?;

        let direction = ctx.base.direction;
        let (breakout_swings, breakout_above, resting_swings) = match direction {
            Direction::Buy => (SwingType::High, true, SwingType::Low),
            Direction::Sell => (SwingType::Low, false, SwingType::High),
        };

        let mut levels = self.anchored(
            ctx,
            direction.stop_order(),
            &nearest_levels(
                &ctx.snapshot.swings,
                breakout_swings,
                ctx.base.base_price,
                breakout_above,
                self.levels as usize,
            ),
        );
        levels.extend(self.anchored(
            ctx,
            direction.limit_order(),
            &nearest_levels(
                &ctx.snapshot.swings,
                resting_swings,
                ctx.base.base_price,
                !breakout_above,
                self.levels as usize,
            ),
        ));
        Ok(levels)
    }

    fn anchored(&self, ctx: &GridContext<'_>, order_type: OrderType, swings: &[f64]) -> Vec<Level> {
        let atr = ctx.base.atr;
        let sign = order_type.direction().sign();
        swings
            .iter()
            .zip(1u32..)
            .map(|(&swing, k)| {
                let entry = swing + sign * self.entry_buffer_atr * atr;
                Level {
                    slot: SlotKey::new(order_type, k),
                    entry: ctx.round(entry),
                    sl: ctx.round(swing - sign * self.sl_atr * atr),
                    tp: ctx.round(entry + sign * self.tp_atr * atr),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::risk::default_symbols;
    use crate::models::MarketSnapshot;
    use crate::test_helpers::{buy_trade, sell_trade, swing};

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot::default().with_swings(vec![
            swing(SwingType::High, 1.1060),
            swing(SwingType::High, 1.1025),
            swing(SwingType::Low, 1.0975),
            swing(SwingType::Low, 1.0940),
            swing(SwingType::Low, 1.0960),
        ])
    }

    #[test]
    fn buy_anchors_stops_at_highs_limits_at_lows() {
        let symbols = default_symbols();
        let base = buy_trade(1.1000, 0.0010);
        let snap = snapshot();
        let ctx = GridContext::new(&base, &snap, &symbols["EURUSD"]);
        let params = StructureParams {
            levels: 2,
            ..StructureParams::default()
        };
        let levels = params.levels(&ctx).unwrap();
        assert_eq!(levels.len(), 4);

        assert_eq!(levels[0].order_type(), OrderType::BuyStop);
        assert!((levels[0].entry - 1.1026).abs() < 1e-9);
        assert!((levels[0].sl - 1.1015).abs() < 1e-9);
        assert!((levels[0].tp - 1.1041).abs() < 1e-9);
        assert!((levels[1].entry - 1.1061).abs() < 1e-9);

        assert_eq!(levels[2].order_type(), OrderType::BuyLimit);
        assert!((levels[2].entry - 1.0976).abs() < 1e-9);
        assert!((levels[2].sl - 1.0965).abs() < 1e-9);
        // second nearest low is 1.0960, not 1.0940
        assert!((levels[3].entry - 1.0961).abs() < 1e-9);
    }

    #[test]
    fn sell_mirrors() {
        let symbols = default_symbols();
        let base = sell_trade(1.1000, 0.0010);
        let snap = snapshot();
        let ctx = GridContext::new(&base, &snap, &symbols["EURUSD"]);
        let levels = StructureParams::default().levels(&ctx).unwrap();
        assert_eq!(levels[0].order_type(), OrderType::SellStop);
        assert!((levels[0].entry - 1.0974).abs() < 1e-9);
        assert!((levels[0].sl - 1.0985).abs() < 1e-9);
        let limit = levels
            .iter()
            .find(|l| l.order_type() == OrderType::SellLimit)
            .unwrap();
        assert!((limit.entry - 1.1024).abs() < 1e-9);
        assert!((limit.sl - 1.1035).abs() < 1e-9);
    }

    #[test]
    fn no_swings_means_no_levels() {
        let symbols = default_symbols();
        let base = buy_trade(1.1000, 0.0010);
        let snap = MarketSnapshot::default();
        let ctx = GridContext::new(&base, &snap, &symbols["EURUSD"]);
        assert!(StructureParams::default().levels(&ctx).unwrap().is_empty());
    }
}
