use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::core::regime::RegimeThresholds;
use crate::core::risk::{default_symbols, SymbolSpec};
use crate::strategies::ModelDefaults;
use crate::trading::tracker::{RecenterRule, RegenerationPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Account
    pub account_balance: f64,
    pub risk_per_order_usd: f64,
    /// Largest share of the balance one order's margin may use
    pub max_margin_fraction: f64,

    pub symbols: HashMap<String, SymbolSpec>,

    // Grid selection and layout
    pub regime: RegimeThresholds,
    pub models: ModelDefaults,

    // Lifecycle
    pub regeneration: RegenerationPolicy,
    pub recenter: RecenterRule,

    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            account_balance: 10_000.0,
            risk_per_order_usd: 10.0,
            max_margin_fraction: 0.5,
            symbols: default_symbols(),
            regime: RegimeThresholds::default(),
            models: ModelDefaults::default(),
            regeneration: RegenerationPolicy::default(),
            recenter: RecenterRule::default(),
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Defaults, replaced by the JSON file named in `GRID_CONFIG` if set,
    /// then individual env overrides. Reads `.env` first.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match std::env::var("GRID_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Config::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Missing fields keep their defaults.
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let num = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f64>().ok());
        let int = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let count = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u32>().ok());

        if let Some(v) = num("ACCOUNT_BALANCE") {
            self.account_balance = v;
        }
        if let Some(v) = num("RISK_PER_ORDER_USD") {
            self.risk_per_order_usd = v;
        }
        if let Some(v) = count("MAX_REGEN_ATTEMPTS") {
            self.regeneration.max_attempts = v;
        }
        if let Some(v) = int("COOLDOWN_BARS") {
            self.regeneration.cooldown_bars = v;
        }
        if let Some(v) = num("SLTP_WIDEN_FACTOR") {
            self.regeneration.widening.factor = v;
            self.regeneration.widening.enabled = v != 1.0;
        }
        if let Some(v) = num("ADX_TREND_THRESHOLD") {
            self.regime.adx_trend_threshold = v;
        }
        if let Some(v) = num("BB_WIDTH_THRESHOLD") {
            self.regime.bb_width_threshold = v;
        }
        self.recenter = match (num("RECENTER_ATR_MULTIPLE"), num("RECENTER_PERCENT")) {
            (Some(atr_multiple), Some(percent)) => RecenterRule::Either {
                atr_multiple,
                percent,
            },
            (Some(multiple), None) => RecenterRule::AtrMultiple { multiple },
            (None, Some(percent)) => RecenterRule::Percent { percent },
            (None, None) => self.recenter.clone(),
        };
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_forex_and_gold() {
        let config = Config::default();
        for symbol in ["EURUSD", "GBPUSD", "USDJPY", "XAUUSD"] {
            assert!(config.symbols.contains_key(symbol), "{symbol}");
        }
        assert_eq!(config.regeneration.max_attempts, 3);
        assert_eq!(config.recenter, RecenterRule::AtrMultiple { multiple: 2.0 });
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = Config::from_json_str(
            r#"{
                "risk_per_order_usd": 25.0,
                "recenter": { "mode": "percent", "percent": 1.0 },
                "models": { "volatility": { "levels": 5 } }
            }"#,
        )
        .unwrap();
        assert!((config.risk_per_order_usd - 25.0).abs() < 1e-12);
        assert_eq!(config.recenter, RecenterRule::Percent { percent: 1.0 });
        assert_eq!(config.models.volatility.levels, 5);
        assert!((config.models.volatility.atr_multiplier - 1.0).abs() < 1e-12);
        assert_eq!(config.symbols.len(), 4);
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ACCOUNT_BALANCE", "2500"),
            ("COOLDOWN_BARS", "8"),
            ("SLTP_WIDEN_FACTOR", "1.0"),
            ("RECENTER_ATR_MULTIPLE", "1.5"),
            ("RECENTER_PERCENT", "0.5"),
            ("ADX_TREND_THRESHOLD", "not a number"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert!((config.account_balance - 2500.0).abs() < 1e-12);
        assert_eq!(config.regeneration.cooldown_bars, 8);
        assert!(!config.regeneration.widening.enabled);
        assert_eq!(
            config.recenter,
            RecenterRule::Either {
                atr_multiple: 1.5,
                percent: 0.5
            }
        );
        assert!((config.regime.adx_trend_threshold - 25.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_attempt_count_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|k| (k == "MAX_REGEN_ATTEMPTS").then(|| "4294967297".to_string()));
        assert_eq!(config.regeneration.max_attempts, 3);

        config.apply_overrides(|k| (k == "MAX_REGEN_ATTEMPTS").then(|| "7".to_string()));
        assert_eq!(config.regeneration.max_attempts, 7);
    }
}
