pub mod candle;
pub mod direction;
pub mod snapshot;

pub use candle::{Candle, CandleSeries};
pub use direction::*;
pub use snapshot::{BaseTrade, IndicatorSnapshot, MarketSnapshot, SwingPoint};
