//! Error types for grid generation and lifecycle tracking

use thiserror::Error;

use crate::models::Direction;

/// Errors that abort grid creation, regime selection or regeneration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("ATR must be a positive finite number, got {0}")]
    InvalidAtr(f64),

    #[error("Stop loss {base_sl} is on the wrong side of base price {base_price} for a {direction} trade")]
    StopOnWrongSide {
        direction: Direction,
        base_price: f64,
        base_sl: f64,
    },

    #[error("Degenerate {what}: lower bound {low} is not below upper bound {high}")]
    DegenerateRange {
        what: &'static str,
        low: f64,
        high: f64,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Insufficient data: indicator '{indicator}' is missing or NaN")]
    DataInsufficient { indicator: &'static str },

    #[error("Grid not found: {0}")]
    GridNotFound(String),
}

impl GridError {
    /// Malformed or degenerate inputs. Never retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GridError::InvalidAtr(_)
                | GridError::StopOnWrongSide { .. }
                | GridError::DegenerateRange { .. }
                | GridError::InvalidParameter(_)
                | GridError::UnknownSymbol(_)
        )
    }

    /// The caller has to wait for more history before trying again.
    pub fn is_data_insufficient(&self) -> bool {
        matches!(self, GridError::DataInsufficient { .. })
    }
}

/// Result type for grid operations
pub type GridResult<T> = std::result::Result<T, GridError>;

/// Why a lot size could not be produced for an order
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SizingRejected {
    #[error("no sizing data for symbol {0}")]
    UnknownSymbol(String),

    #[error("risk amount must be positive, got {0}")]
    NonPositiveRisk(f64),

    #[error("entry and stop loss are identical")]
    ZeroStopDistance,

    #[error("stop distance {pips:.1} pips is below the broker minimum of {min_pips:.1}")]
    StopTooClose { pips: f64, min_pips: f64 },

    #[error("raw lot size {raw:.4} is below the minimum lot {min}")]
    BelowMinLot { raw: f64, min: f64 },

    #[error("required margin {required:.2} exceeds cap {cap:.2}")]
    MarginCapExceeded { required: f64, cap: f64 },
}

/// Why a planned or regenerated order was left out
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    #[error("sizing rejected: {0}")]
    Sizing(#[from] SizingRejected),

    #[error("entry {entry} is on the wrong side of base price {base_price}")]
    WrongSide { entry: f64, base_price: f64 },

    #[error("stop loss {sl} / take profit {tp} not on the correct sides of entry {entry}")]
    InvalidGeometry { entry: f64, sl: f64, tp: f64 },

    #[error("duplicate entry {0}")]
    DuplicateEntry(f64),

    #[error("slot can no longer be placed by its grid model")]
    SlotUnavailable,
}
