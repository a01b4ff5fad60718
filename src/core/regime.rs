use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::error::{GridError, GridResult};
use crate::models::{BaseTrade, Direction, IndicatorSnapshot, MarketSnapshot};
use crate::strategies::{GridModel, ModelDefaults};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeThresholds {
    pub adx_trend_threshold: f64,
    /// ATR above `median × high_vol_factor` is high volatility
    pub high_vol_factor: f64,
    /// ATR below `median × low_vol_factor` is low volatility
    pub low_vol_factor: f64,
    /// Band width as a fraction of the middle band
    pub bb_width_threshold: f64,
    pub swing_proximity_atr: f64,
    /// Trend rule also needs +DI/-DI to agree with the direction
    pub require_di_confirmation: bool,
    /// Lookback for swing detection when the snapshot carries none
    pub swing_lookback_bars: usize,
    /// Only the most recent bars are searched for swings
    pub swing_window_bars: usize,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            adx_trend_threshold: 25.0,
            high_vol_factor: 1.5,
            low_vol_factor: 0.7,
            bb_width_threshold: 0.03,
            swing_proximity_atr: 0.5,
            require_di_confirmation: false,
            swing_lookback_bars: 5,
            swing_window_bars: 50,
        }
    }
}

/// What the selector looks at: the latest indicator readings plus the
/// distance from the base price to the nearest swing level in ATR units.
#[derive(Debug, Clone, Copy)]
pub struct RegimeInputs {
    pub indicators: IndicatorSnapshot,
    pub swing_distance_atr: f64,
}

impl RegimeInputs {
    pub fn from_snapshot(base: &BaseTrade, snapshot: &MarketSnapshot) -> Self {
        Self {
            indicators: snapshot.indicators,
            swing_distance_atr: snapshot.swing_distance_atr(base.base_price, base.atr),
        }
    }
}

/// Which rule of the priority list fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeRule {
    Range,
    Structure,
    Trend,
    HighVolatility,
    LowVolatility,
    Default,
}

impl RegimeRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegimeRule::Range => "range",
            RegimeRule::Structure => "structure",
            RegimeRule::Trend => "trend",
            RegimeRule::HighVolatility => "high_volatility",
            RegimeRule::LowVolatility => "low_volatility",
            RegimeRule::Default => "default",
        }
    }
}

impl fmt::Display for RegimeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeDecision {
    pub model: GridModel,
    pub rule: RegimeRule,
}

/// Picks a grid layout from market conditions. First matching rule wins:
/// range, structure, trend, high volatility, low volatility, else dual.
#[derive(Debug, Clone, Default)]
pub struct RegimeSelector {
    pub thresholds: RegimeThresholds,
    pub defaults: ModelDefaults,
}

impl RegimeSelector {
    pub fn new(thresholds: RegimeThresholds, defaults: ModelDefaults) -> Self {
        Self {
            thresholds,
            defaults,
        }
    }

    pub fn select(&self, inputs: &RegimeInputs, direction: Direction) -> GridResult<RegimeDecision> {
        let ind = &inputs.indicators;
        self.require_indicators(ind)?;
        let t = &self.thresholds;

        let bb_width = ind.bb_width_fraction();
        let slope = ind.ema_slope();
        let trend_agrees = slope * direction.sign() > 0.0
            && (!t.require_di_confirmation
                || (ind.plus_di - ind.minus_di) * direction.sign() > 0.0);

        let (rule, model) = if bb_width < t.bb_width_threshold {
            (RegimeRule::Range, GridModel::Range(self.defaults.range.clone()))
        } else if inputs.swing_distance_atr < t.swing_proximity_atr {
            (
                RegimeRule::Structure,
                GridModel::Structure(self.defaults.structure.clone()),
            )
        } else if ind.adx > t.adx_trend_threshold && trend_agrees {
            (RegimeRule::Trend, GridModel::Pyramid(self.defaults.pyramid.clone()))
        } else if ind.atr > ind.atr_median * t.high_vol_factor {
            (
                RegimeRule::HighVolatility,
                GridModel::Volatility(self.defaults.volatility.clone()),
            )
        } else if ind.atr < ind.atr_median * t.low_vol_factor {
            (
                RegimeRule::LowVolatility,
                GridModel::Static(self.defaults.static_grid.clone()),
            )
        } else {
            (RegimeRule::Default, GridModel::Dual(self.defaults.dual.clone()))
        };

        info!(
            rule = %rule,
            model = model.name(),
            direction = %direction,
            adx = ind.adx,
            ema_slope = slope,
            bb_width,
            atr = ind.atr,
            atr_median = ind.atr_median,
            swing_distance_atr = inputs.swing_distance_atr,
            "Regime selected"
        );
        Ok(RegimeDecision { model, rule })
    }

    fn require_indicators(&self, ind: &IndicatorSnapshot) -> GridResult<()> {
        let mut required = vec![
            ("atr", ind.atr),
            ("atr_median", ind.atr_median),
            ("ema_short", ind.ema_short),
            ("ema_long", ind.ema_long),
            ("adx", ind.adx),
            ("bb_upper", ind.bb_upper),
            ("bb_middle", ind.bb_middle),
            ("bb_lower", ind.bb_lower),
        ];
        if self.thresholds.require_di_confirmation {
            required.push(("plus_di", ind.plus_di));
            required.push(("minus_di", ind.minus_di));
        }
        if let Some(&(indicator, _)) = required.iter().find(|(_, v)| v.is_nan()) {
            return Err(GridError::DataInsufficient { indicator });
        }
        if ind.bb_middle == 0.0 {
            return Err(GridError::InvalidParameter(
                "bb_middle must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
