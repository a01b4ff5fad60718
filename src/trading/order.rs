use serde::{Deserialize, Serialize};

use crate::models::{Candle, OrderStatus, OrderType};
use crate::strategies::SlotKey;

/// How a triggered order left the market on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    StopLoss,
    TakeProfit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub order_id: String,
    pub symbol: String,
    pub order_type: OrderType,
    pub entry_price: f64,
    pub sl_price: f64,
    pub tp_price: f64,
    pub lot_size: f64,
    pub status: OrderStatus,
    pub source_grid_id: String,
    pub regeneration_attempt: u32,
    #[serde(default)]
    pub cooldown_until_bar: Option<u64>,
    pub origin_slot: SlotKey,
    #[serde(default)]
    pub triggered_at_bar: Option<u64>,
    #[serde(default)]
    pub closed_at_bar: Option<u64>,
}

impl PendingOrder {
    /// Whether the bar reached this order's entry. Stops fill on the move
    /// through the entry, limits on the touch from the other side.
    pub fn entry_crossed(&self, bar: &Candle) -> bool {
        match self.order_type {
            OrderType::BuyStop | OrderType::SellLimit => bar.high >= self.entry_price,
            OrderType::SellStop | OrderType::BuyLimit => bar.low <= self.entry_price,
        }
    }

    /// SL is checked first, so a bar spanning both exits closes at SL.
    pub fn exit_hit(&self, bar: &Candle) -> Option<Exit> {
        let (sl_hit, tp_hit) = if self.order_type.is_buy() {
            (bar.low <= self.sl_price, bar.high >= self.tp_price)
        } else {
            (bar.high >= self.sl_price, bar.low <= self.tp_price)
        };
        if sl_hit {
            Some(Exit::StopLoss)
        } else if tp_hit {
            Some(Exit::TakeProfit)
        } else {
            None
        }
    }

    pub fn trigger(&mut self, bar_index: u64) {
        self.status = OrderStatus::Triggered;
        self.triggered_at_bar = Some(bar_index);
    }

    pub fn close(&mut self, exit: Exit, bar_index: u64) {
        self.status = match exit {
            Exit::StopLoss => OrderStatus::ClosedSl,
            Exit::TakeProfit => OrderStatus::ClosedTp,
        };
        self.closed_at_bar = Some(bar_index);
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn ticket(&self) -> OrderTicket {
        OrderTicket {
            order_type: self.order_type,
            entry: self.entry_price,
            sl: self.sl_price,
            tp: self.tp_price,
            lot_size: self.lot_size,
            symbol: self.symbol.clone(),
            grid_id: self.source_grid_id.clone(),
            order_id: self.order_id.clone(),
        }
    }
}

/// The fixed-key mapping handed to order execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTicket {
    pub order_type: OrderType,
    pub entry: f64,
    pub sl: f64,
    pub tp: f64,
    pub lot_size: f64,
    pub symbol: String,
    pub grid_id: String,
    pub order_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{bar, pending_order};

    #[test]
    fn entry_rules_per_order_type() {
        let b = bar(1.1000, 1.1012, 1.0991, 1.1005);
        assert!(pending_order(OrderType::BuyStop, 1.1010, 1.1000, 1.1025).entry_crossed(&b));
        assert!(!pending_order(OrderType::BuyStop, 1.1015, 1.1005, 1.1030).entry_crossed(&b));
        assert!(pending_order(OrderType::BuyLimit, 1.0992, 1.0980, 1.1010).entry_crossed(&b));
        assert!(!pending_order(OrderType::BuyLimit, 1.0990, 1.0980, 1.1010).entry_crossed(&b));
        assert!(pending_order(OrderType::SellLimit, 1.1012, 1.1020, 1.0990).entry_crossed(&b));
        assert!(pending_order(OrderType::SellStop, 1.0991, 1.1000, 1.0970).entry_crossed(&b));
        assert!(!pending_order(OrderType::SellStop, 1.0990, 1.1000, 1.0970).entry_crossed(&b));
    }

    #[test]
    fn stop_loss_wins_when_bar_spans_both_exits() {
        let order = pending_order(OrderType::BuyStop, 1.1010, 1.1000, 1.1020);
        let wide = bar(1.1010, 1.1025, 1.0995, 1.1010);
        assert_eq!(order.exit_hit(&wide), Some(Exit::StopLoss));

        let sell = pending_order(OrderType::SellLimit, 1.1010, 1.1020, 1.1000);
        assert_eq!(sell.exit_hit(&wide), Some(Exit::StopLoss));

        let up_only = bar(1.1010, 1.1021, 1.1005, 1.1020);
        assert_eq!(order.exit_hit(&up_only), Some(Exit::TakeProfit));
        assert_eq!(order.exit_hit(&bar(1.1010, 1.1015, 1.1005, 1.1010)), None);
    }

    #[test]
    fn ticket_carries_fixed_keys() {
        let order = pending_order(OrderType::SellStop, 1.0990, 1.1000, 1.0975);
        let json = serde_json::to_value(order.ticket()).unwrap();
        assert_eq!(json["order_type"], "SELL_STOP");
        for key in ["entry", "sl", "tp", "lot_size", "symbol", "grid_id", "order_id"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
