use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::regime::{RegimeInputs, RegimeRule, RegimeSelector};
use crate::core::risk::RiskSizer;
use crate::core::structure::SwingDetector;
use crate::error::{GridError, GridResult};
use crate::models::{BaseTrade, Candle, MarketSnapshot};
use crate::strategies::{GridContext, GridModel, SkippedOrder};
use crate::trading::grid::Grid;
use crate::trading::order::OrderTicket;
use crate::trading::tracker::{BarUpdate, OrderEvent, OrderLifecycleTracker};

/// Result of creating a grid: the tickets to place and every level that
/// was left out, with its reason.
#[derive(Debug, Clone, Serialize)]
pub struct GridCreation {
    pub grid_id: String,
    pub model: GridModel,
    /// Set when the regime selector picked the model
    pub rule: Option<RegimeRule>,
    pub orders: Vec<OrderTicket>,
    #[serde(skip)]
    pub skipped: Vec<SkippedOrder>,
}

/// Top-level entry point: regime selection, grid generation and per-bar
/// lifecycle for any number of symbols. Grids share no order state.
pub struct GridController {
    sizer: RiskSizer,
    selector: RegimeSelector,
    tracker: OrderLifecycleTracker,
    detector: SwingDetector,
    risk_per_order_usd: f64,
    account_balance: f64,
    grids: Vec<Grid>,
    bar_clock: HashMap<String, u64>,
    seq: u64,
}

impl GridController {
    pub fn new(config: &Config) -> Self {
        Self {
            sizer: RiskSizer::new(config.symbols.clone(), config.max_margin_fraction),
            selector: RegimeSelector::new(config.regime.clone(), config.models.clone()),
            tracker: OrderLifecycleTracker::new(config.regeneration.clone(), config.recenter.clone()),
            detector: SwingDetector::with_lookback(config.regime.swing_lookback_bars)
                .within(config.regime.swing_window_bars),
            risk_per_order_usd: config.risk_per_order_usd,
            account_balance: config.account_balance,
            grids: Vec::new(),
            bar_clock: HashMap::new(),
            seq: 0,
        }
    }

    /// Pick a model for `base` from the snapshot and generate its grid.
    pub fn create_new_grid(
        &mut self,
        base: BaseTrade,
        mut snapshot: MarketSnapshot,
    ) -> GridResult<GridCreation> {
        base.validate()?;
        self.sizer.symbol(&base.symbol)?;
        self.detector.ensure_swings(&mut snapshot);

        let inputs = RegimeInputs::from_snapshot(&base, &snapshot);
        let decision = self.selector.select(&inputs, base.direction)?;
        let mut creation = self.create_grid_with_model(base, snapshot, decision.model)?;
        creation.rule = Some(decision.rule);
        Ok(creation)
    }

    /// Generate a grid with a caller-chosen model, bypassing the selector.
    pub fn create_grid_with_model(
        &mut self,
        base: BaseTrade,
        mut snapshot: MarketSnapshot,
        model: GridModel,
    ) -> GridResult<GridCreation> {
        self.detector.ensure_swings(&mut snapshot);
        let spec = self.sizer.symbol(&base.symbol)?;
        let ctx = GridContext::new(&base, &snapshot, spec);
        let plan = model.generate_grid_orders(
            &ctx,
            &self.sizer,
            self.risk_per_order_usd,
            self.account_balance,
        )?;

        self.seq += 1;
        let grid_id = format!("grid_{}_{}_{}", model.name(), base.symbol, self.seq);
        let created_at_bar = self.bar_index(&base.symbol);
        let mut grid = Grid::new(grid_id.clone(), base, model.clone(), snapshot, created_at_bar);

        let mut orders = Vec::with_capacity(plan.orders.len());
        for planned in &plan.orders {
            let order = grid.issue(planned, 0, None);
            debug!(
                grid_id = %grid_id,
                order_id = %order.order_id,
                slot = %order.origin_slot,
                entry = order.entry_price,
                sl = order.sl_price,
                tp = order.tp_price,
                lots = order.lot_size,
                "Order generated"
            );
            orders.push(order.ticket());
        }

        info!(
            grid_id = %grid_id,
            model = model.name(),
            symbol = %grid.base.symbol,
            direction = %grid.base.direction,
            base_price = grid.base.base_price,
            atr = grid.base.atr,
            orders = orders.len(),
            skipped = plan.skipped.len(),
            "Grid created"
        );
        self.grids.push(grid);

        Ok(GridCreation {
            grid_id,
            model,
            rule: None,
            orders,
            skipped: plan.skipped,
        })
    }

    /// Feed the next bar for `symbol` to every grid on it. Recentered grids
    /// are replaced at the bar's close, re-running regime selection (and
    /// taking its ATR) when `latest` is given and reusing the old model and
    /// inputs otherwise. Inactive grids with no open positions left are
    /// dropped.
    ///
    /// The bar is consumed even when a grid fails on it: the remaining grids
    /// still see it and the clock moves on before the first error returns.
    pub fn advance_bar(
        &mut self,
        symbol: &str,
        bar: &Candle,
        latest: Option<&MarketSnapshot>,
    ) -> GridResult<Vec<BarUpdate>> {
        let bar_index = self.bar_index(symbol);
        let mut updates = Vec::new();
        let mut recentered = Vec::new();
        let mut failure = None;

        for grid in self.grids.iter_mut().filter(|g| g.base.symbol == symbol) {
            let update = match self.tracker.on_bar(
                grid,
                bar_index,
                bar,
                &self.sizer,
                self.risk_per_order_usd,
                self.account_balance,
            ) {
                Ok(update) => update,
                Err(e) => {
                    warn!(grid_id = %grid.grid_id, bar_index, error = %e, "Bar not applied");
                    failure.get_or_insert(e);
                    continue;
                }
            };
            if update.recenter.is_some() {
                recentered.push((
                    updates.len(),
                    grid.base.recentered_at(bar.close),
                    grid.model.clone(),
                    grid.snapshot.clone(),
                ));
            }
            updates.push(update);
        }

        for (idx, mut base, model, snapshot) in recentered {
            let replaced = match latest {
                Some(latest) => {
                    let atr = latest.indicators.atr;
                    if atr.is_finite() && atr > 0.0 {
                        base.atr = atr;
                    }
                    self.create_new_grid(base, latest.clone())
                }
                None => self.create_grid_with_model(base, snapshot, model),
            };
            let update: &mut BarUpdate = &mut updates[idx];
            match replaced {
                Ok(creation) => {
                    info!(
                        old_grid_id = %update.grid_id,
                        new_grid_id = %creation.grid_id,
                        price = bar.close,
                        "Grid recentered"
                    );
                    update.replacement = Some(creation.grid_id);
                }
                Err(e) => {
                    warn!(grid_id = %update.grid_id, error = %e, "Replacement grid not created");
                    update.replacement_error = Some(e.to_string());
                }
            }
        }

        self.grids.retain(|g| g.active || g.has_open_positions());
        self.bar_clock.insert(symbol.to_string(), bar_index + 1);
        match failure {
            Some(e) => Err(e),
            None => Ok(updates),
        }
    }

    /// Cancel a grid's pending orders and stop regenerating it. Open
    /// positions keep draining on later bars.
    pub fn cancel_grid(&mut self, grid_id: &str) -> GridResult<Vec<OrderEvent>> {
        let grid = self
            .grids
            .iter_mut()
            .find(|g| g.grid_id == grid_id)
            .ok_or_else(|| GridError::GridNotFound(grid_id.to_string()))?;
        let events = grid
            .cancel_pending()
            .into_iter()
            .map(|o| OrderEvent::Cancelled {
                order_id: o.order_id,
                slot: o.origin_slot,
            })
            .collect();
        grid.active = false;
        info!(grid_id = %grid_id, "Grid cancelled");
        self.grids.retain(|g| g.active || g.has_open_positions());
        Ok(events)
    }

    pub fn grid(&self, grid_id: &str) -> Option<&Grid> {
        self.grids.iter().find(|g| g.grid_id == grid_id)
    }

    pub fn active_grids(&self) -> impl Iterator<Item = &Grid> {
        self.grids.iter().filter(|g| g.active)
    }

    /// Every pending order across active grids, for order execution.
    pub fn tickets(&self) -> Vec<OrderTicket> {
        self.active_grids().flat_map(Grid::tickets).collect()
    }

    /// Affects sizing of orders generated from now on.
    pub fn set_account_balance(&mut self, balance: f64) {
        self.account_balance = balance;
    }

    /// Index the next bar for `symbol` will get. Starts at 0.
    pub fn bar_index(&self, symbol: &str) -> u64 {
        self.bar_clock.get(symbol).copied().unwrap_or(0)
    }
}
