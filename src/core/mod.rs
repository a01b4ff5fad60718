pub mod regime;
pub mod risk;
pub mod structure;
pub mod widen;
