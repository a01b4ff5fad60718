use serde::{Deserialize, Serialize};

/// How far SL/TP distances grow on each regeneration attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WideningPolicy {
    pub enabled: bool,
    /// Compounded per attempt when no explicit factor is listed
    pub factor: f64,
    /// Explicit factor for attempt 1, 2, ...
    pub per_attempt: Vec<f64>,
}

impl Default for WideningPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            factor: 1.2,
            per_attempt: Vec::new(),
        }
    }
}

impl WideningPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn factor_for(&self, attempt: u32) -> f64 {
        if !self.enabled || attempt == 0 {
            return 1.0;
        }
        match self.per_attempt.get(attempt as usize - 1) {
            Some(&f) => f,
            None => self.factor.powi(attempt as i32),
        }
    }
}

/// Distance to use on `attempt`, measured from the slot's original distance.
pub fn widen(base_distance: f64, attempt: u32, policy: &WideningPolicy) -> f64 {
    base_distance * policy.factor_for(attempt)
}
