use crate::models::{CandleSeries, MarketSnapshot, SwingPoint, SwingType};

/// Fractal swing detection: a bar is a swing high (low) when no bar within
/// `lookback` bars on either side has a higher high (lower low).
#[derive(Debug, Clone)]
pub struct SwingDetector {
    pub lookback: usize,
    /// Most recent bars scanned by `ensure_swings`; 0 scans everything
    pub window: usize,
}

impl SwingDetector {
    pub fn new() -> Self {
        Self::with_lookback(5)
    }

    pub fn with_lookback(lookback: usize) -> Self {
        Self {
            lookback,
            window: 50,
        }
    }

    pub fn within(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn find_swings(&self, candles: &CandleSeries) -> Vec<SwingPoint> {
        let lb = self.lookback;
        let len = candles.len();
        let mut swings = Vec::new();
        if lb == 0 || len <= lb * 2 {
            return swings;
        }

        for i in lb..(len - lb) {
            let window = (i - lb)..=(i + lb);

            let current_high = candles[i].high;
            if window.clone().all(|j| candles[j].high <= current_high) {
                swings.push(SwingPoint {
                    swing_type: SwingType::High,
                    price: current_high,
                    timestamp: candles[i].timestamp,
                });
            }

            let current_low = candles[i].low;
            if window.clone().all(|j| candles[j].low >= current_low) {
                swings.push(SwingPoint {
                    swing_type: SwingType::Low,
                    price: current_low,
                    timestamp: candles[i].timestamp,
                });
            }
        }
        swings
    }

    /// Fill `snapshot.swings` from its last `window` candles when the
    /// caller supplied none.
    pub fn ensure_swings(&self, snapshot: &mut MarketSnapshot) {
        if !snapshot.swings.is_empty() || snapshot.candles.is_empty() {
            return;
        }
        snapshot.swings = if self.window == 0 {
            self.find_swings(&snapshot.candles)
        } else {
            self.find_swings(&snapshot.candles.tail(self.window))
        };
    }
}

impl Default for SwingDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Up to `k` distinct swing prices of `swing_type` strictly above (or
/// below) `price`, nearest first.
pub fn nearest_levels(
    swings: &[SwingPoint],
    swing_type: SwingType,
    price: f64,
    above: bool,
    k: usize,
) -> Vec<f64> {
    let mut levels: Vec<f64> = swings
        .iter()
        .filter(|s| s.swing_type == swing_type)
        .map(|s| s.price)
        .filter(|&p| if above { p > price } else { p < price })
        .collect();
    levels.sort_by(|a, b| (a - price).abs().total_cmp(&(b - price).abs()));
    levels.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
    levels.truncate(k);
    levels
}
