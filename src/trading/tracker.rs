use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::risk::RiskSizer;
use crate::core::widen::{widen, WideningPolicy};
use crate::error::{GridResult, SkipReason};
use crate::models::{Candle, OrderStatus};
use crate::strategies::{size_level, GridContext, Level, SlotKey};
use crate::trading::grid::Grid;
use crate::trading::order::{Exit, OrderTicket};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegenerationPolicy {
    /// Regenerations allowed per slot
    pub max_attempts: u32,
    pub cooldown_bars: u64,
    pub widening: WideningPolicy,
}

impl Default for RegenerationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            cooldown_bars: 5,
            widening: WideningPolicy::default(),
        }
    }
}

/// When price has drifted far enough from a grid's anchor to replace it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RecenterRule {
    AtrMultiple { multiple: f64 },
    /// `percent` of the anchor price, e.g. 1.0 for 1%
    Percent { percent: f64 },
    /// Whichever threshold is smaller
    Either { atr_multiple: f64, percent: f64 },
}

impl Default for RecenterRule {
    fn default() -> Self {
        RecenterRule::AtrMultiple { multiple: 2.0 }
    }
}

impl RecenterRule {
    /// Price distance from `anchor` beyond which the grid is replaced.
    pub fn threshold(&self, anchor: f64, atr: f64) -> f64 {
        match *self {
            RecenterRule::AtrMultiple { multiple } => multiple * atr,
            RecenterRule::Percent { percent } => anchor * percent / 100.0,
            RecenterRule::Either {
                atr_multiple,
                percent,
            } => (atr_multiple * atr).min(anchor * percent / 100.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecenterSignal {
    pub anchor: f64,
    pub price: f64,
    pub deviation: f64,
    pub threshold: f64,
}

/// Everything that happened to one order slot on a bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Triggered {
        order_id: String,
        slot: SlotKey,
    },
    ClosedTp {
        order_id: String,
        slot: SlotKey,
    },
    ClosedSl {
        order_id: String,
        slot: SlotKey,
        cooldown_until_bar: u64,
    },
    Cancelled {
        order_id: String,
        slot: SlotKey,
    },
    Regenerated {
        replaces: String,
        slot: SlotKey,
        attempt: u32,
        ticket: OrderTicket,
    },
    RegenerationSkipped {
        slot: SlotKey,
        attempt: u32,
        reason: String,
    },
    RegenerationExhausted {
        order_id: String,
        slot: SlotKey,
        attempts: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarUpdate {
    pub grid_id: String,
    pub bar_index: u64,
    pub events: Vec<OrderEvent>,
    pub recenter: Option<RecenterSignal>,
    /// Grid created by the controller in place of a recentered one
    pub replacement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_error: Option<String>,
}

impl BarUpdate {
    fn new(grid_id: &str, bar_index: u64) -> Self {
        Self {
            grid_id: grid_id.to_string(),
            bar_index,
            events: Vec::new(),
            recenter: None,
            replacement: None,
            replacement_error: None,
        }
    }
}

/// Per-bar state machine for a grid's orders: fills, exits, recenter
/// detection and stop-loss regeneration.
#[derive(Debug, Clone, Default)]
pub struct OrderLifecycleTracker {
    pub policy: RegenerationPolicy,
    pub recenter: RecenterRule,
}

impl OrderLifecycleTracker {
    pub fn new(policy: RegenerationPolicy, recenter: RecenterRule) -> Self {
        Self { policy, recenter }
    }

    /// Apply one bar to `grid`. Fills and exits first, then the recenter
    /// check, then regeneration of stopped-out slots. A recentered grid is
    /// left inactive with its pending orders cancelled and does not
    /// regenerate; inactive grids only see their open positions through
    /// to SL or TP.
    pub fn on_bar(
        &self,
        grid: &mut Grid,
        bar_index: u64,
        bar: &Candle,
        sizer: &RiskSizer,
        risk_usd: f64,
        account_balance: f64,
    ) -> GridResult<BarUpdate> {
        let mut update = BarUpdate::new(&grid.grid_id, bar_index);
        self.apply_fills(grid, bar_index, bar, &mut update.events);

        if !grid.active {
            grid.archive(|o| o.status.is_closed());
            return Ok(update);
        }

        let threshold = self
            .recenter
            .threshold(grid.recenter_anchor_price, grid.base.atr);
        let deviation = (bar.close - grid.recenter_anchor_price).abs();
        if deviation > threshold {
            warn!(
                grid_id = %grid.grid_id,
                anchor = grid.recenter_anchor_price,
                price = bar.close,
                deviation,
                threshold,
                "Recenter triggered"
            );
            for order in grid.cancel_pending() {
                update.events.push(OrderEvent::Cancelled {
                    order_id: order.order_id,
                    slot: order.origin_slot,
                });
            }
            grid.archive(|o| o.status.is_closed());
            grid.active = false;
            update.recenter = Some(RecenterSignal {
                anchor: grid.recenter_anchor_price,
                price: bar.close,
                deviation,
                threshold,
            });
            return Ok(update);
        }

        self.regenerate(grid, bar_index, sizer, risk_usd, account_balance, &mut update.events)?;
        Ok(update)
    }

    fn apply_fills(&self, grid: &mut Grid, bar_index: u64, bar: &Candle, events: &mut Vec<OrderEvent>) {
        let cooldown = self.policy.cooldown_bars;
        for order in grid.orders_mut() {
            if order.is_pending() && order.entry_crossed(bar) {
                order.trigger(bar_index);
                debug!(order_id = %order.order_id, slot = %order.origin_slot, entry = order.entry_price, "Order triggered");
                events.push(OrderEvent::Triggered {
                    order_id: order.order_id.clone(),
                    slot: order.origin_slot,
                });
            }
            if order.status != OrderStatus::Triggered {
                continue;
            }
            match order.exit_hit(bar) {
                Some(Exit::StopLoss) => {
                    order.close(Exit::StopLoss, bar_index);
                    let until = bar_index + cooldown;
                    order.cooldown_until_bar = Some(until);
                    debug!(order_id = %order.order_id, slot = %order.origin_slot, sl = order.sl_price, "Order stopped out");
                    events.push(OrderEvent::ClosedSl {
                        order_id: order.order_id.clone(),
                        slot: order.origin_slot,
                        cooldown_until_bar: until,
                    });
                }
                Some(Exit::TakeProfit) => {
                    order.close(Exit::TakeProfit, bar_index);
                    debug!(order_id = %order.order_id, slot = %order.origin_slot, tp = order.tp_price, "Order hit take profit");
                    events.push(OrderEvent::ClosedTp {
                        order_id: order.order_id.clone(),
                        slot: order.origin_slot,
                    });
                }
                None => {}
            }
        }
        grid.archive(|o| o.status == OrderStatus::ClosedTp);
    }

    fn regenerate(
        &self,
        grid: &mut Grid,
        bar_index: u64,
        sizer: &RiskSizer,
        risk_usd: f64,
        account_balance: f64,
        events: &mut Vec<OrderEvent>,
    ) -> GridResult<()> {
        let stopped: Vec<(SlotKey, String, u32, Option<u64>)> = grid
            .orders()
            .iter()
            .filter(|o| o.status == OrderStatus::ClosedSl)
            .map(|o| {
                (
                    o.origin_slot,
                    o.order_id.clone(),
                    o.regeneration_attempt,
                    o.cooldown_until_bar,
                )
            })
            .collect();

        for (slot, order_id, attempt, cooldown_until) in stopped {
            if attempt >= self.policy.max_attempts {
                info!(grid_id = %grid.grid_id, slot = %slot, attempts = attempt, "Regeneration exhausted, slot retired");
                grid.retire(slot);
                events.push(OrderEvent::RegenerationExhausted {
                    order_id,
                    slot,
                    attempts: attempt,
                });
                continue;
            }
            if bar_index < cooldown_until.unwrap_or(0) {
                continue;
            }

            let next_attempt = attempt + 1;
            let outcome = self.replacement(grid, slot, next_attempt, sizer, risk_usd, account_balance)?;
            let cooldown = Some(bar_index + self.policy.cooldown_bars);
            match outcome {
                Ok(planned) => {
                    let order = grid.issue(&planned, next_attempt, cooldown);
                    info!(
                        grid_id = %order.source_grid_id,
                        slot = %slot,
                        attempt = next_attempt,
                        order_id = %order.order_id,
                        entry = order.entry_price,
                        sl = order.sl_price,
                        tp = order.tp_price,
                        lots = order.lot_size,
                        "Order regenerated"
                    );
                    events.push(OrderEvent::Regenerated {
                        replaces: order_id,
                        slot,
                        attempt: next_attempt,
                        ticket: order.ticket(),
                    });
                }
                Err(SkipReason::SlotUnavailable) => {
                    warn!(grid_id = %grid.grid_id, slot = %slot, "Slot no longer placed by model, retired");
                    grid.retire(slot);
                    events.push(OrderEvent::RegenerationSkipped {
                        slot,
                        attempt: next_attempt,
                        reason: SkipReason::SlotUnavailable.to_string(),
                    });
                }
                Err(reason) => {
                    // the attempt is spent even though nothing was placed
                    warn!(grid_id = %grid.grid_id, slot = %slot, attempt = next_attempt, reason = %reason, "Regeneration skipped");
                    if let Some(order) = grid.order_mut(slot) {
                        order.regeneration_attempt = next_attempt;
                        order.cooldown_until_bar = cooldown;
                    }
                    events.push(OrderEvent::RegenerationSkipped {
                        slot,
                        attempt: next_attempt,
                        reason: reason.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Re-place `slot` with the grid's own model and inputs, then widen its
    /// SL/TP distances for `attempt`.
    fn replacement(
        &self,
        grid: &Grid,
        slot: SlotKey,
        attempt: u32,
        sizer: &RiskSizer,
        risk_usd: f64,
        account_balance: f64,
    ) -> GridResult<Result<crate::strategies::PlannedOrder, SkipReason>> {
        let spec = sizer.symbol(&grid.base.symbol)?;
        let ctx = GridContext::new(&grid.base, &grid.snapshot, spec);
        let Some(level) = grid.model.place_slot(&ctx, slot)? else {
            return Ok(Err(SkipReason::SlotUnavailable));
        };
        let sign = slot.order_type.direction().sign();
        let sl_distance = widen((level.entry - level.sl).abs(), attempt, &self.policy.widening);
        let tp_distance = widen((level.tp - level.entry).abs(), attempt, &self.policy.widening);
        let widened = Level {
            sl: ctx.round(level.entry - sign * sl_distance),
            tp: ctx.round(level.entry + sign * tp_distance),
            ..level
        };
        Ok(size_level(&ctx, &widened, sizer, risk_usd, account_balance))
    }
}
