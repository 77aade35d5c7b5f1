use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::{request_defaults, trend_thresholds};
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Prediction request
// ---------------------------------------------------------------------------

/// A fully-defaulted prediction request. `crop_type` is already lowercased.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub crop_type: String,
    pub variety: String,
    pub quantity: f64,
    pub region: String,
}

impl PredictionRequest {
    pub fn new(crop_type: &str) -> Self {
        Self {
            crop_type: crop_type.to_lowercase(),
            variety: request_defaults::VARIETY.to_string(),
            quantity: request_defaults::QUANTITY,
            region: request_defaults::REGION.to_string(),
        }
    }

    pub fn with_variety(mut self, variety: impl Into<String>) -> Self {
        self.variety = variety.into();
        self
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Season
// ---------------------------------------------------------------------------

/// Philippine agricultural season. Shared by the feature assembler and the
/// market generator so both agree on which months are which.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    /// June–September
    Wet,
    /// October–January
    Dry,
    /// February–May
    Summer,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            6..=9 => Season::Wet,
            10..=12 | 1 => Season::Dry,
            _ => Season::Summer,
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::from_month(date.month())
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Season::Wet => "Wet",
            Season::Dry => "Dry",
            Season::Summer => "Summer",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Feature record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Categorical,
    Numerical,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    /// Raw categorical value, before encoding.
    Text(String),
    /// Encoded categorical value.
    Code(u32),
    Number(f64),
}

impl FeatureValue {
    #[cfg(test)]
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureValue::Text(_) | FeatureValue::Code(_) => FeatureKind::Categorical,
            FeatureValue::Number(_) => FeatureKind::Numerical,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One model input row, in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRecord {
    entries: Vec<(String, FeatureValue)>,
}

impl FeatureRecord {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            entries: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: FeatureValue) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FeatureValue> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    #[cfg(test)]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dense model input. Fails if any categorical value was left unencoded.
    pub fn to_vector(&self) -> Result<Vec<f64>, PipelineError> {
        self.iter()
            .map(|(name, value)| match value {
                FeatureValue::Number(v) => Ok(*v),
                FeatureValue::Code(c) => Ok(f64::from(*c)),
                FeatureValue::Text(_) => Err(PipelineError::Unencoded(name.to_string())),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Market snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropCategory {
    Grains,
    RootCrops,
    Vegetables,
    Fruits,
    Legumes,
    Commercial,
}

impl CropCategory {
    /// Unknown crops are priced as vegetables.
    pub fn of(crop: &str) -> Self {
        match crop.to_lowercase().as_str() {
            "rice" | "corn" | "wheat" => CropCategory::Grains,
            "potato" | "sweet_potato" => CropCategory::RootCrops,
            "banana" | "mango" | "pineapple" => CropCategory::Fruits,
            "mongo" | "soybean" => CropCategory::Legumes,
            "coffee" | "cacao" | "sugarcane" => CropCategory::Commercial,
            _ => CropCategory::Vegetables,
        }
    }

    /// Base price band in ₱/kg, `(min, max)`.
    pub fn price_band(self) -> (f64, f64) {
        match self {
            CropCategory::Grains => (20.0, 60.0),
            CropCategory::RootCrops => (25.0, 70.0),
            CropCategory::Vegetables => (30.0, 120.0),
            CropCategory::Fruits => (40.0, 150.0),
            CropCategory::Legumes => (50.0, 100.0),
            CropCategory::Commercial => (80.0, 200.0),
        }
    }
}

impl std::fmt::Display for CropCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CropCategory::Grains => "grains",
            CropCategory::RootCrops => "root_crops",
            CropCategory::Vegetables => "vegetables",
            CropCategory::Fruits => "fruits",
            CropCategory::Legumes => "legumes",
            CropCategory::Commercial => "commercial",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn from_change_percentage(pct: f64) -> Self {
        if pct > trend_thresholds::UP_ABOVE {
            Trend::Up
        } else if pct < trend_thresholds::DOWN_BELOW {
            Trend::Down
        } else {
            Trend::Stable
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub current: f64,
    pub previous: f64,
    pub region: String,
    pub supply: String,
    pub quality: String,
    pub category: CropCategory,
    pub price_change: f64,
    pub change_percentage: f64,
    pub trend: Trend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_boundaries() {
        assert_eq!(Season::from_month(6), Season::Wet);
        assert_eq!(Season::from_month(9), Season::Wet);
        assert_eq!(Season::from_month(10), Season::Dry);
        assert_eq!(Season::from_month(1), Season::Dry);
        assert_eq!(Season::from_month(2), Season::Summer);
        assert_eq!(Season::from_month(5), Season::Summer);
    }

    #[test]
    fn request_defaults_applied() {
        let req = PredictionRequest::new("Rice");
        assert_eq!(req.crop_type, "rice");
        assert_eq!(req.variety, "Standard");
        assert_eq!(req.quantity, 100.0);
        assert_eq!(req.region, "National Average");
    }

    #[test]
    fn trend_thresholds_are_exclusive() {
        assert_eq!(Trend::from_change_percentage(2.0), Trend::Stable);
        assert_eq!(Trend::from_change_percentage(2.1), Trend::Up);
        assert_eq!(Trend::from_change_percentage(-2.0), Trend::Stable);
        assert_eq!(Trend::from_change_percentage(-2.1), Trend::Down);
    }

    #[test]
    fn unknown_crop_is_vegetable() {
        assert_eq!(CropCategory::of("durian"), CropCategory::Vegetables);
        assert_eq!(CropCategory::of("Coffee"), CropCategory::Commercial);
        assert_eq!(CropCategory::RootCrops.to_string(), "root_crops");
    }

    #[test]
    fn record_to_vector_rejects_raw_text() {
        let mut record = FeatureRecord::default();
        record.push("crop_type", FeatureValue::Text("rice".into()));
        record.push("quantity", FeatureValue::Number(10.0));
        assert_eq!(
            record.to_vector(),
            Err(PipelineError::Unencoded("crop_type".into()))
        );

        *record.get_mut("crop_type").unwrap() = FeatureValue::Code(3);
        assert_eq!(record.to_vector().unwrap(), vec![3.0, 10.0]);
    }
}
