use serde::Serialize;
use std::collections::HashSet;

use crate::models::{BaseTrade, MarketSnapshot, OrderStatus};
use crate::strategies::{GridModel, PlannedOrder, SlotKey};
use crate::trading::order::{OrderTicket, PendingOrder};

/// One base trade's grid. Owns every order it generated: the current order
/// per slot in generation order, and a history of the ones it replaced,
/// cancelled, closed in profit or retired.
#[derive(Debug, Clone, Serialize)]
pub struct Grid {
    pub grid_id: String,
    pub base: BaseTrade,
    pub model: GridModel,
    /// Inputs captured at creation, reused for single-slot placement
    pub snapshot: MarketSnapshot,
    pub recenter_anchor_price: f64,
    pub active: bool,
    pub created_at_bar: u64,
    orders: Vec<PendingOrder>,
    history: Vec<PendingOrder>,
    retired: HashSet<SlotKey>,
    seq: u64,
}

impl Grid {
    pub fn new(
        grid_id: String,
        base: BaseTrade,
        model: GridModel,
        snapshot: MarketSnapshot,
        created_at_bar: u64,
    ) -> Self {
        Self {
            grid_id,
            recenter_anchor_price: base.base_price,
            base,
            model,
            snapshot,
            active: true,
            created_at_bar,
            orders: Vec::new(),
            history: Vec::new(),
            retired: HashSet::new(),
            seq: 0,
        }
    }

    /// Add a pending order for `planned.slot` with a fresh id. An order
    /// already occupying the slot moves to history and the new one takes
    /// its position.
    pub fn issue(
        &mut self,
        planned: &PlannedOrder,
        regeneration_attempt: u32,
        cooldown_until_bar: Option<u64>,
    ) -> &PendingOrder {
        self.seq += 1;
        let order = PendingOrder {
            order_id: format!("{}-{}", self.grid_id, self.seq),
            symbol: self.base.symbol.clone(),
            order_type: planned.order_type,
            entry_price: planned.entry,
            sl_price: planned.sl,
            tp_price: planned.tp,
            lot_size: planned.lot_size,
            status: OrderStatus::Pending,
            source_grid_id: self.grid_id.clone(),
            regeneration_attempt,
            cooldown_until_bar,
            origin_slot: planned.slot,
            triggered_at_bar: None,
            closed_at_bar: None,
        };
        let idx = match self.position(planned.slot) {
            Some(idx) => {
                let previous = std::mem::replace(&mut self.orders[idx], order);
                self.history.push(previous);
                idx
            }
            None => {
                self.orders.push(order);
                self.orders.len() - 1
            }
        };
        &self.orders[idx]
    }

    fn position(&self, slot: SlotKey) -> Option<usize> {
        self.orders.iter().position(|o| o.origin_slot == slot)
    }

    pub fn orders(&self) -> &[PendingOrder] {
        &self.orders
    }

    pub(crate) fn orders_mut(&mut self) -> &mut [PendingOrder] {
        &mut self.orders
    }

    pub fn order(&self, slot: SlotKey) -> Option<&PendingOrder> {
        self.orders.iter().find(|o| o.origin_slot == slot)
    }

    pub(crate) fn order_mut(&mut self, slot: SlotKey) -> Option<&mut PendingOrder> {
        self.orders.iter_mut().find(|o| o.origin_slot == slot)
    }

    pub fn history(&self) -> &[PendingOrder] {
        &self.history
    }

    pub fn is_retired(&self, slot: SlotKey) -> bool {
        self.retired.contains(&slot)
    }

    /// Stop tracking `slot` for good.
    pub fn retire(&mut self, slot: SlotKey) {
        self.retired.insert(slot);
        self.archive(|o| o.origin_slot == slot);
    }

    /// Cancel every pending order. Returns the cancelled orders.
    pub fn cancel_pending(&mut self) -> Vec<PendingOrder> {
        for order in self.orders.iter_mut().filter(|o| o.is_pending()) {
            order.status = OrderStatus::Cancelled;
        }
        self.archive(|o| o.status == OrderStatus::Cancelled)
    }

    /// Move orders matching `pred` from the active set to history.
    pub(crate) fn archive<F>(&mut self, pred: F) -> Vec<PendingOrder>
    where
        F: Fn(&PendingOrder) -> bool,
    {
        let (moved, kept): (Vec<_>, Vec<_>) = self.orders.drain(..).partition(|o| pred(o));
        self.orders = kept;
        self.history.extend(moved.iter().cloned());
        moved
    }

    /// Tickets for every order still waiting on its entry.
    pub fn tickets(&self) -> Vec<OrderTicket> {
        self.orders
            .iter()
            .filter(|o| o.is_pending())
            .map(PendingOrder::ticket)
            .collect()
    }

    pub fn has_open_positions(&self) -> bool {
        self.orders
            .iter()
            .any(|o| o.status == OrderStatus::Triggered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderType;
    use crate::strategies::StaticParams;
    use crate::test_helpers::buy_trade;

    fn planned(order_type: OrderType, index: u32, entry: f64) -> PlannedOrder {
        PlannedOrder {
            slot: SlotKey::new(order_type, index),
            order_type,
            entry,
            sl: entry - 0.0010,
            tp: entry + 0.0010,
            lot_size: 0.1,
        }
    }

    fn grid() -> Grid {
        Grid::new(
            "grid_static_EURUSD_1".to_string(),
            buy_trade(1.1000, 0.0010),
            GridModel::Static(StaticParams::default()),
            MarketSnapshot::default(),
            0,
        )
    }

    #[test]
    fn reissue_keeps_slot_position_with_fresh_id() {
        let mut g = grid();
        g.issue(&planned(OrderType::BuyLimit, 1, 1.0990), 0, None);
        g.issue(&planned(OrderType::BuyLimit, 2, 1.0980), 0, None);
        let id = g.issue(&planned(OrderType::BuyLimit, 1, 1.0990), 1, Some(7)).order_id.clone();

        assert_eq!(id, "grid_static_EURUSD_1-3");
        assert_eq!(g.orders().len(), 2);
        assert_eq!(g.orders()[0].order_id, id);
        assert_eq!(g.orders()[0].regeneration_attempt, 1);
        assert_eq!(g.history().len(), 1);
        assert_eq!(g.history()[0].order_id, "grid_static_EURUSD_1-1");
    }

    #[test]
    fn cancel_pending_leaves_open_positions() {
        let mut g = grid();
        g.issue(&planned(OrderType::BuyLimit, 1, 1.0990), 0, None);
        g.issue(&planned(OrderType::BuyLimit, 2, 1.0980), 0, None);
        g.orders_mut()[0].trigger(3);

        let cancelled = g.cancel_pending();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].status, OrderStatus::Cancelled);
        assert!(g.has_open_positions());
        assert!(g.tickets().is_empty());
    }

    #[test]
    fn retired_slot_leaves_active_set() {
        let mut g = grid();
        let slot = SlotKey::new(OrderType::BuyLimit, 1);
        g.issue(&planned(OrderType::BuyLimit, 1, 1.0990), 0, None);
        g.retire(slot);
        assert!(g.is_retired(slot));
        assert!(g.order(slot).is_none());
        assert_eq!(g.history().len(), 1);
    }
}
