use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[serde(alias = "buy")]
    Buy,
    #[serde(alias = "sell")]
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }

    /// +1 for buys, -1 for sells. Multiplies a distance into a price offset
    /// in the favourable direction.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
        }
    }

    pub fn stop_order(self) -> OrderType {
        match self {
            Direction::Buy => OrderType::BuyStop,
            Direction::Sell => OrderType::SellStop,
        }
    }

    pub fn limit_order(self) -> OrderType {
        match self {
            Direction::Buy => OrderType::BuyLimit,
            Direction::Sell => OrderType::SellLimit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    BuyStop,
    SellStop,
    BuyLimit,
    SellLimit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::BuyStop => "BUY_STOP",
            OrderType::SellStop => "SELL_STOP",
            OrderType::BuyLimit => "BUY_LIMIT",
            OrderType::SellLimit => "SELL_LIMIT",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            OrderType::BuyStop | OrderType::BuyLimit => Direction::Buy,
            OrderType::SellStop | OrderType::SellLimit => Direction::Sell,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.direction() == Direction::Buy
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, OrderType::BuyStop | OrderType::SellStop)
    }

    /// Whether `entry` sits where a resting order of this type can live
    /// relative to `reference`: buy stops and sell limits above, sell stops
    /// and buy limits below.
    pub fn rests_on_valid_side(&self, entry: f64, reference: f64) -> bool {
        match self {
            OrderType::BuyStop | OrderType::SellLimit => entry > reference,
            OrderType::SellStop | OrderType::BuyLimit => entry < reference,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Triggered,
    ClosedTp,
    ClosedSl,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::Triggered => write!(f, "TRIGGERED"),
            OrderStatus::ClosedTp => write!(f, "CLOSED_TP"),
            OrderStatus::ClosedSl => write!(f, "CLOSED_SL"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl OrderStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, OrderStatus::ClosedTp | OrderStatus::ClosedSl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingType {
    High,
    Low,
}

impl fmt::Display for SwingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwingType::High => write!(f, "high"),
            SwingType::Low => write!(f, "low"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_type_serializes_as_wire_string() {
        let json = serde_json::to_string(&OrderType::BuyStop).unwrap();
        assert_eq!(json, "\"BUY_STOP\"");
        let parsed: OrderType = serde_json::from_str("\"SELL_LIMIT\"").unwrap();
        assert_eq!(parsed, OrderType::SellLimit);
        assert_eq!(OrderType::SellLimit.to_string(), "SELL_LIMIT");
    }

    #[test]
    fn direction_accepts_lowercase() {
        let d: Direction = serde_json::from_str("\"buy\"").unwrap();
        assert_eq!(d, Direction::Buy);
        let d: Direction = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(d, Direction::Sell);
    }

    #[test]
    fn resting_sides() {
        assert!(OrderType::BuyStop.rests_on_valid_side(1.101, 1.100));
        assert!(!OrderType::BuyStop.rests_on_valid_side(1.099, 1.100));
        assert!(OrderType::BuyLimit.rests_on_valid_side(1.099, 1.100));
        assert!(OrderType::SellStop.rests_on_valid_side(1.099, 1.100));
        assert!(OrderType::SellLimit.rests_on_valid_side(1.101, 1.100));
        assert!(!OrderType::SellLimit.rests_on_valid_side(1.100, 1.100));
    }

    #[test]
    fn direction_helpers() {
        assert_eq!(Direction::Buy.stop_order(), OrderType::BuyStop);
        assert_eq!(Direction::Sell.limit_order(), OrderType::SellLimit);
        assert_eq!(Direction::Sell.opposite(), Direction::Buy);
        assert!((Direction::Sell.sign() + 1.0).abs() < 1e-12);
        assert!(OrderType::BuyLimit.is_buy());
        assert!(!OrderType::BuyLimit.is_stop());
        assert!(OrderStatus::ClosedSl.is_closed());
        assert!(!OrderStatus::Triggered.is_closed());
    }
}
