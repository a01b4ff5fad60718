pub mod controller;
pub mod grid;
pub mod order;
pub mod tracker;

pub use controller::{GridController, GridCreation};
pub use grid::Grid;
pub use order::{Exit, OrderTicket, PendingOrder};
pub use tracker::{
    BarUpdate, OrderEvent, OrderLifecycleTracker, RecenterRule, RecenterSignal, RegenerationPolicy,
};
