use crate::error::{AppError, Result};

pub const MODEL_PATH: &str = "crop_price_model.json";

/// Predictions below this are treated as implausible and replaced by the fallback table.
/// Overridable via PRICE_FLOOR; the trained model's output range is not known up front.
pub const DEFAULT_PRICE_FLOOR: f64 = 5.0;

/// Price returned for a crop missing from the fallback table.
pub const DEFAULT_FALLBACK_PRICE: f64 = 50.0;

/// Crop list served when no artifact is loaded (or it has no `crop_type` encoder).
pub const DEFAULT_CROPS: &[&str] = &[
    "rice", "corn", "wheat", "potato", "tomato", "onion", "cabbage", "eggplant",
];

/// Static per-crop prices (₱/kg), keyed by lowercased crop name.
pub const FALLBACK_PRICES: &[(&str, f64)] = &[
    ("rice", 45.50),
    ("corn", 22.30),
    ("wheat", 38.75),
    ("potato", 55.20),
    ("tomato", 68.40),
    ("onion", 120.50),
    ("cabbage", 35.80),
    ("eggplant", 42.30),
    ("sweet_potato", 28.50),
    ("carrot", 65.80),
    ("bell_pepper", 85.20),
    ("banana", 25.30),
    ("mango", 90.75),
    ("pineapple", 35.20),
    ("mongo", 75.40),
    ("soybean", 42.60),
    ("coffee", 180.25),
    ("cacao", 150.80),
    ("sugarcane", 18.50),
];

/// Request defaults for the optional prediction fields.
pub mod request_defaults {
    pub const VARIETY: &str = "Standard";
    pub const QUANTITY: f64 = 100.0;
    pub const REGION: &str = "National Average";
}

/// Bounded ranges for numerical features the request never carries.
/// Each is `(low, high)`, sampled half-open.
pub mod filler_ranges {
    /// °C, typical Philippine lowland temperatures.
    pub const TEMPERATURE: (f64, f64) = (20.0, 32.0);
    /// mm per month.
    pub const RAINFALL: (f64, f64) = (50.0, 300.0);
    /// 1–10 scale.
    pub const SOIL_QUALITY: (f64, f64) = (3.0, 8.0);
    /// ₱ per hectare.
    pub const PRODUCTION_COST: (f64, f64) = (3000.0, 8000.0);
    /// Units.
    pub const MARKET_DEMAND: (f64, f64) = (500.0, 2000.0);
}

/// change_percentage thresholds for the market trend label.
pub mod trend_thresholds {
    pub const UP_ABOVE: f64 = 2.0;
    pub const DOWN_BELOW: f64 = -2.0;
}

/// How numerical filler features are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillerMode {
    /// Uniform draw within each range.
    Sampled,
    /// Midpoint of each range; fully deterministic.
    Midpoint,
}

impl std::str::FromStr for FillerMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sampled" => Ok(FillerMode::Sampled),
            "midpoint" => Ok(FillerMode::Midpoint),
            other => Err(AppError::Config(format!(
                "FILLER_MODE must be 'sampled' or 'midpoint', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the JSON model artifact (MODEL_PATH)
    pub model_path: String,
    pub log_level: String,
    pub api_host: String,
    pub api_port: u16,
    /// Plausibility floor for model output (PRICE_FLOOR)
    pub price_floor: f64,
    /// FILLER_MODE: sampled | midpoint
    pub filler_mode: FillerMode,
    /// FILLER_SEED: when set, every request's sampled filler starts from this seed.
    pub filler_seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let price_floor = var("PRICE_FLOOR")
            .unwrap_or_else(|| DEFAULT_PRICE_FLOOR.to_string())
            .trim()
            .parse::<f64>()
            .map_err(|_| AppError::Config("PRICE_FLOOR must be a number".to_string()))?;
        if !price_floor.is_finite() || price_floor < 0.0 {
            return Err(AppError::Config(
                "PRICE_FLOOR must be finite and non-negative".to_string(),
            ));
        }

        let filler_seed = match var("FILLER_SEED") {
            Some(s) if !s.trim().is_empty() => Some(s.trim().parse::<u64>().map_err(|_| {
                AppError::Config("FILLER_SEED must be an unsigned integer".to_string())
            })?),
            _ => None,
        };

        Ok(Self {
            model_path: var("MODEL_PATH").unwrap_or_else(|| MODEL_PATH.to_string()),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            api_host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            api_port: var("API_PORT")
                .unwrap_or_else(|| "5000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            price_floor,
            filler_mode: var("FILLER_MODE")
                .unwrap_or_else(|| "sampled".to_string())
                .parse()?,
            filler_seed,
        })
    }
}

/// Fallback table lookup. Unknown crops get [`DEFAULT_FALLBACK_PRICE`].
pub fn fallback_price(crop_type: &str) -> f64 {
    let key = crop_type.to_lowercase();
    FALLBACK_PRICES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|&(_, price)| price)
        .unwrap_or(DEFAULT_FALLBACK_PRICE)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn config_error(pairs: &[(&str, &str)]) -> String {
        match Config::from_lookup(lookup(pairs)) {
            Err(AppError::Config(msg)) => msg,
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.model_path, MODEL_PATH);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.api_host, "0.0.0.0");
        assert_eq!(cfg.api_port, 5000);
        assert_eq!(cfg.price_floor, DEFAULT_PRICE_FLOOR);
        assert_eq!(cfg.filler_mode, FillerMode::Sampled);
        assert_eq!(cfg.filler_seed, None);
    }

    #[test]
    fn overrides_are_read() {
        let cfg = Config::from_lookup(lookup(&[
            ("MODEL_PATH", "/srv/model.json"),
            ("API_PORT", "8080"),
            ("PRICE_FLOOR", "0"),
            ("FILLER_MODE", "midpoint"),
            ("FILLER_SEED", " 42 "),
        ]))
        .unwrap();
        assert_eq!(cfg.model_path, "/srv/model.json");
        assert_eq!(cfg.api_port, 8080);
        assert_eq!(cfg.price_floor, 0.0);
        assert_eq!(cfg.filler_mode, FillerMode::Midpoint);
        assert_eq!(cfg.filler_seed, Some(42));
    }

    #[test]
    fn invalid_price_floor_is_rejected() {
        assert!(config_error(&[("PRICE_FLOOR", "-1")]).contains("non-negative"));
        assert!(config_error(&[("PRICE_FLOOR", "NaN")]).contains("finite"));
        assert!(config_error(&[("PRICE_FLOOR", "inf")]).contains("finite"));
        assert!(config_error(&[("PRICE_FLOOR", "cheap")]).contains("must be a number"));
    }

    #[test]
    fn filler_seed_must_be_unsigned() {
        assert!(config_error(&[("FILLER_SEED", "abc")]).contains("FILLER_SEED"));
        assert!(config_error(&[("FILLER_SEED", "-3")]).contains("FILLER_SEED"));
    }

    #[test]
    fn blank_filler_seed_means_unseeded() {
        let cfg = Config::from_lookup(lookup(&[("FILLER_SEED", "  ")])).unwrap();
        assert_eq!(cfg.filler_seed, None);
    }

    #[test]
    fn unknown_filler_mode_is_rejected() {
        assert!(config_error(&[("FILLER_MODE", "random")]).contains("FILLER_MODE"));
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        assert!(config_error(&[("API_PORT", "99999")]).contains("API_PORT"));
    }

    #[test]
    fn fallback_lookup_is_case_insensitive() {
        assert_eq!(fallback_price("rice"), 45.50);
        assert_eq!(fallback_price("ONION"), 120.50);
        assert_eq!(fallback_price("Sweet_Potato"), 28.50);
    }

    #[test]
    fn fallback_unknown_crop_uses_default() {
        assert_eq!(fallback_price("durian"), DEFAULT_FALLBACK_PRICE);
        assert_eq!(fallback_price(""), DEFAULT_FALLBACK_PRICE);
    }

    #[test]
    fn fallback_table_is_plausible() {
        for &(name, price) in FALLBACK_PRICES {
            assert_eq!(name, name.to_lowercase());
            assert!(price.is_finite() && price >= DEFAULT_PRICE_FLOOR, "{name}={price}");
        }
    }

    #[test]
    fn filler_mode_parses() {
        assert_eq!("sampled".parse::<FillerMode>().unwrap(), FillerMode::Sampled);
        assert_eq!(" Midpoint ".parse::<FillerMode>().unwrap(), FillerMode::Midpoint);
        assert!("random".parse::<FillerMode>().is_err());
    }
}
