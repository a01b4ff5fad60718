use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{GridError, GridResult, SizingRejected};

fn default_contract_size() -> f64 {
    100_000.0
}

fn default_leverage() -> f64 {
    100.0
}

/// Broker metadata for one tradable symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSpec {
    pub min_lot_size: f64,
    pub lot_step: f64,
    /// Account-currency value of one pip for one lot
    pub pip_value_per_lot: f64,
    pub decimals: u32,
    pub point_value: f64,
    #[serde(default = "default_contract_size")]
    pub contract_size: f64,
    #[serde(default = "default_leverage")]
    pub leverage: f64,
    #[serde(default)]
    pub min_stop_distance_pips: f64,
    /// Metals and CFDs quote their pip as one point.
    #[serde(default)]
    pub metal: bool,
    /// Notional is denominated in the quote currency (EURUSD, GBPUSD) and
    /// needs the entry price to convert into account currency.
    #[serde(default)]
    pub notional_in_quote: bool,
}

impl SymbolSpec {
    pub fn forex(decimals: u32, pip_value_per_lot: f64, notional_in_quote: bool) -> Self {
        Self {
            min_lot_size: 0.01,
            lot_step: 0.01,
            pip_value_per_lot,
            decimals,
            point_value: 10f64.powi(-(decimals as i32)),
            contract_size: default_contract_size(),
            leverage: default_leverage(),
            min_stop_distance_pips: 2.0,
            metal: false,
            notional_in_quote,
        }
    }

    pub fn gold() -> Self {
        Self {
            min_lot_size: 0.01,
            lot_step: 0.01,
            pip_value_per_lot: 1.0,
            decimals: 2,
            point_value: 0.01,
            contract_size: 100.0,
            leverage: default_leverage(),
            min_stop_distance_pips: 20.0,
            metal: true,
            notional_in_quote: false,
        }
    }

    pub fn pip_size(&self) -> f64 {
        if self.metal {
            self.point_value
        } else {
            self.point_value * 10.0
        }
    }

    pub fn round_price(&self, price: f64) -> f64 {
        round_to(price, self.decimals)
    }

    fn lot_decimals(&self) -> u32 {
        if self.lot_step <= 0.0 {
            return 2;
        }
        (-self.lot_step.log10()).ceil().max(0.0) as u32
    }
}

/// Default symbol table: majors plus spot gold.
pub fn default_symbols() -> HashMap<String, SymbolSpec> {
    let mut symbols = HashMap::new();
    symbols.insert("EURUSD".to_string(), SymbolSpec::forex(5, 10.0, true));
    symbols.insert("GBPUSD".to_string(), SymbolSpec::forex(5, 10.0, true));
    symbols.insert("USDJPY".to_string(), SymbolSpec::forex(3, 8.5, false));
    symbols.insert("XAUUSD".to_string(), SymbolSpec::gold());
    symbols
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Fixed-dollar-risk lot sizing with lot-step flooring and a margin cap.
#[derive(Debug, Clone)]
pub struct RiskSizer {
    symbols: HashMap<String, SymbolSpec>,
    /// Largest share of the balance one order may tie up as margin
    max_margin_fraction: f64,
}

impl RiskSizer {
    pub fn new(symbols: HashMap<String, SymbolSpec>, max_margin_fraction: f64) -> Self {
        Self {
            symbols,
            max_margin_fraction,
        }
    }

    pub fn symbol(&self, symbol: &str) -> GridResult<&SymbolSpec> {
        self.symbols
            .get(symbol)
            .ok_or_else(|| GridError::UnknownSymbol(symbol.to_string()))
    }

    /// Lots such that a stop-out at `sl_price` loses about `risk_usd`.
    pub fn size(
        &self,
        symbol: &str,
        entry_price: f64,
        sl_price: f64,
        risk_usd: f64,
        account_balance: f64,
    ) -> Result<f64, SizingRejected> {
        let spec = self
            .symbols
            .get(symbol)
            .ok_or_else(|| SizingRejected::UnknownSymbol(symbol.to_string()))?;

        if !(risk_usd > 0.0) {
            return Err(SizingRejected::NonPositiveRisk(risk_usd));
        }

        let sl_distance = round_to((entry_price - sl_price).abs(), spec.decimals + 1);
        if sl_distance == 0.0 {
            return Err(SizingRejected::ZeroStopDistance);
        }

        let sl_pips = sl_distance / spec.pip_size();
        if sl_pips + 1e-9 < spec.min_stop_distance_pips {
            return Err(SizingRejected::StopTooClose {
                pips: sl_pips,
                min_pips: spec.min_stop_distance_pips,
            });
        }

        let raw = risk_usd / (sl_pips * spec.pip_value_per_lot);
        let stepped = if spec.lot_step > 0.0 {
            round_to(
                (raw / spec.lot_step + 1e-9).floor() * spec.lot_step,
                spec.lot_decimals(),
            )
        } else {
            raw
        };

        let lots = if stepped < spec.min_lot_size {
            if raw >= spec.min_lot_size {
                spec.min_lot_size
            } else {
                return Err(SizingRejected::BelowMinLot {
                    raw,
                    min: spec.min_lot_size,
                });
            }
        } else {
            stepped
        };

        let required = self.required_margin(spec, lots, entry_price);
        let cap = self.max_margin_fraction * account_balance;
        if required > cap {
            return Err(SizingRejected::MarginCapExceeded { required, cap });
        }

        debug!(
            symbol,
            sl_pips,
            raw,
            lots,
            margin = required,
            "Lot size computed"
        );
        Ok(lots)
    }

    pub fn required_margin(&self, spec: &SymbolSpec, lots: f64, entry_price: f64) -> f64 {
        let mut notional = lots * spec.contract_size;
        if spec.notional_in_quote {
            notional *= entry_price;
        }
        notional / spec.leverage
    }
}
