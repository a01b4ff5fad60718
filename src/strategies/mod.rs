//! Grid layouts. Each variant turns a base trade plus a market snapshot into
//! an ordered list of price levels; [`GridModel::generate_grid_orders`] sizes
//! them into orders.

pub mod dual;
pub mod pyramid;
pub mod range;
pub mod static_grid;
pub mod structure_grid;
pub mod volatility;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::core::risk::{RiskSizer, SymbolSpec};
use crate::error::{GridError, GridResult, SkipReason};
use crate::models::{BaseTrade, Direction, MarketSnapshot, OrderType};

pub use dual::DualParams;
pub use pyramid::{PyramidParams, PyramidStop};
pub use range::{RangeParams, RangeSource};
pub use static_grid::StaticParams;
pub use structure_grid::StructureParams;
pub use volatility::VolatilityParams;

/// Inputs shared by every layout.
#[derive(Debug, Clone, Copy)]
pub struct GridContext<'a> {
    pub base: &'a BaseTrade,
    pub snapshot: &'a MarketSnapshot,
    pub symbol: &'a SymbolSpec,
}

impl<'a> GridContext<'a> {
    pub fn new(base: &'a BaseTrade, snapshot: &'a MarketSnapshot, symbol: &'a SymbolSpec) -> Self {
        Self {
            base,
            snapshot,
            symbol,
        }
    }

    pub fn round(&self, price: f64) -> f64 {
        self.symbol.round_price(price)
    }

    /// A level for an order of `direction`: SL below / TP above the entry
    /// for buys, mirrored for sells.
    fn level(&self, slot: SlotKey, entry: f64, sl_distance: f64, tp_distance: f64) -> Level {
        let sign = slot.order_type.direction().sign();
        Level {
            slot,
            entry: self.round(entry),
            sl: self.round(entry - sign * sl_distance),
            tp: self.round(entry + sign * tp_distance),
        }
    }
}

/// Identifies one geometric slot of a grid: the order type and its 1-based
/// rank on that ladder. Survives regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub order_type: OrderType,
    pub index: u32,
}

impl SlotKey {
    pub fn new(order_type: OrderType, index: u32) -> Self {
        Self { order_type, index }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.order_type, self.index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    pub slot: SlotKey,
    pub entry: f64,
    pub sl: f64,
    pub tp: f64,
}

impl Level {
    pub fn order_type(&self) -> OrderType {
        self.slot.order_type
    }

    /// Buy: SL < entry < TP. Sell: TP < entry < SL.
    pub fn has_valid_geometry(&self) -> bool {
        match self.order_type().direction() {
            Direction::Buy => self.sl < self.entry && self.entry < self.tp,
            Direction::Sell => self.tp < self.entry && self.entry < self.sl,
        }
    }
}

/// A sized level ready to become a pending order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedOrder {
    pub slot: SlotKey,
    pub order_type: OrderType,
    pub entry: f64,
    pub sl: f64,
    pub tp: f64,
    pub lot_size: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedOrder {
    pub slot: SlotKey,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridPlan {
    pub orders: Vec<PlannedOrder>,
    pub skipped: Vec<SkippedOrder>,
}

/// Side, geometry and sizing checks shared by creation and regeneration.
pub fn size_level(
    ctx: &GridContext<'_>,
    level: &Level,
    sizer: &RiskSizer,
    risk_usd: f64,
    account_balance: f64,
) -> Result<PlannedOrder, SkipReason> {
    if !level
        .order_type()
        .rests_on_valid_side(level.entry, ctx.base.base_price)
    {
        return Err(SkipReason::WrongSide {
            entry: level.entry,
            base_price: ctx.base.base_price,
        });
    }
    if !level.has_valid_geometry() {
        return Err(SkipReason::InvalidGeometry {
            entry: level.entry,
            sl: level.sl,
            tp: level.tp,
        });
    }
    let lot_size = sizer.size(
        &ctx.base.symbol,
        level.entry,
        level.sl,
        risk_usd,
        account_balance,
    )?;
    Ok(PlannedOrder {
        slot: level.slot,
        order_type: level.order_type(),
        entry: level.entry,
        sl: level.sl,
        tp: level.tp,
        lot_size,
    })
}

pub(crate) fn require_positive(name: &str, value: f64) -> GridResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GridError::InvalidParameter(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

pub(crate) fn require_non_negative(name: &str, value: f64) -> GridResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GridError::InvalidParameter(format!(
            "{name} must not be negative, got {value}"
        )))
    }
}

/// The closed set of layouts, each with its own parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", content = "params", rename_all = "snake_case")]
pub enum GridModel {
    Volatility(VolatilityParams),
    Dual(DualParams),
    Pyramid(PyramidParams),
    Static(StaticParams),
    Structure(StructureParams),
    Range(RangeParams),
}

impl fmt::Display for GridModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl GridModel {
    pub fn name(&self) -> &'static str {
        match self {
            GridModel::Volatility(_) => "volatility",
            GridModel::Dual(_) => "dual",
            GridModel::Pyramid(_) => "pyramid",
            GridModel::Static(_) => "static",
            GridModel::Structure(_) => "structure",
            GridModel::Range(_) => "range",
        }
    }

    /// Unsized levels in generation order. Validates the base trade (ATR
    /// first) before any placement math.
    pub fn levels(&self, ctx: &GridContext<'_>) -> GridResult<Vec<Level>> {
        ctx.base.validate()?;
        match self {
            GridModel::Volatility(p) => p.levels(ctx),
            GridModel::Dual(p) => p.levels(ctx),
            GridModel::Pyramid(p) => p.levels(ctx),
            GridModel::Static(p) => p.levels(ctx),
            GridModel::Structure(p) => p.levels(ctx),
            GridModel::Range(p) => p.levels(ctx),
        }
    }

    /// The single level this model places at `slot`, if it still exists.
    pub fn place_slot(&self, ctx: &GridContext<'_>, slot: SlotKey) -> GridResult<Option<Level>> {
        Ok(self.levels(ctx)?.into_iter().find(|l| l.slot == slot))
    }

    /// Sized orders plus the reasons for every level left out. Pure: the
    /// same inputs give the same plan.
    pub fn generate_grid_orders(
        &self,
        ctx: &GridContext<'_>,
        sizer: &RiskSizer,
        risk_usd: f64,
        account_balance: f64,
    ) -> GridResult<GridPlan> {
        let mut plan = GridPlan::default();
        let mut seen: Vec<(OrderType, f64)> = Vec::new();
        for level in self.levels(ctx)? {
            let duplicate = seen
                .iter()
                .any(|&(t, e)| t == level.order_type() && (e - level.entry).abs() < 1e-12);
            seen.push((level.order_type(), level.entry));
            let outcome = if duplicate {
                Err(SkipReason::DuplicateEntry(level.entry))
            } else {
                size_level(ctx, &level, sizer, risk_usd, account_balance)
            };
            match outcome {
                Ok(order) => plan.orders.push(order),
                Err(reason) => {
                    warn!(
                        model = self.name(),
                        symbol = %ctx.base.symbol,
                        slot = %level.slot,
                        entry = level.entry,
                        reason = %reason,
                        "Order skipped"
                    );
                    plan.skipped.push(SkippedOrder {
                        slot: level.slot,
                        reason,
                    });
                }
            }
        }
        Ok(plan)
    }
}

/// Parameter sets the regime selector instantiates models with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDefaults {
    pub volatility: VolatilityParams,
    pub dual: DualParams,
    pub pyramid: PyramidParams,
    #[serde(rename = "static")]
    pub static_grid: StaticParams,
    pub structure: StructureParams,
    pub range: RangeParams,
}
