//! Builds a complete model input row from a sparse prediction request.
//!
//! Each feature name the schema declares is resolved through an explicit
//! name → resolver table. Names missing from the table fall through to a
//! per-kind default (`"Unknown"` / `0.0`), so assembly never fails.

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{filler_ranges, FillerMode};
use crate::model::ModelSchema;
use crate::types::{FeatureKind, FeatureRecord, FeatureValue, PredictionRequest, Season};

/// Value for categorical features nothing in the request can answer.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Value for numerical features with no resolver.
pub const UNKNOWN_NUMBER: f64 = 0.0;

/// Source for numerical features the request never carries (weather, cost, demand).
#[derive(Debug, Clone)]
pub enum FillerSource {
    /// Uniform draw from each range.
    Sampled(StdRng),
    /// Midpoint of each range.
    Midpoint,
}

impl FillerSource {
    /// Seeded when `seed` is given, otherwise from OS entropy.
    pub fn sampled(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        FillerSource::Sampled(rng)
    }

    pub fn from_mode(mode: FillerMode, seed: Option<u64>) -> Self {
        match mode {
            FillerMode::Sampled => Self::sampled(seed),
            FillerMode::Midpoint => FillerSource::Midpoint,
        }
    }

    pub fn draw(&mut self, (low, high): (f64, f64)) -> f64 {
        match self {
            FillerSource::Sampled(rng) => rng.gen_range(low..high),
            FillerSource::Midpoint => (low + high) / 2.0,
        }
    }
}

/// Inputs every resolver may read.
pub struct FeatureContext<'a> {
    pub request: &'a PredictionRequest,
    pub today: NaiveDate,
}

type CategoricalResolver = fn(&FeatureContext<'_>) -> String;
type NumericalResolver = fn(&FeatureContext<'_>, &mut FillerSource) -> f64;

const CATEGORICAL_RESOLVERS: &[(&str, CategoricalResolver)] = &[
    ("crop_type", resolve_crop_type),
    ("variety", resolve_variety),
    ("region", resolve_region),
    ("season", resolve_season),
];

const NUMERICAL_RESOLVERS: &[(&str, NumericalResolver)] = &[
    ("quantity", resolve_quantity),
    ("temperature", resolve_temperature),
    ("rainfall", resolve_rainfall),
    ("soil_quality", resolve_soil_quality),
    ("production_cost", resolve_production_cost),
    ("market_demand", resolve_market_demand),
    ("month", resolve_month),
    ("year", resolve_year),
];

fn resolve_crop_type(ctx: &FeatureContext<'_>) -> String {
    ctx.request.crop_type.clone()
}

fn resolve_variety(ctx: &FeatureContext<'_>) -> String {
    ctx.request.variety.clone()
}

fn resolve_region(ctx: &FeatureContext<'_>) -> String {
    ctx.request.region.clone()
}

fn resolve_season(ctx: &FeatureContext<'_>) -> String {
    Season::from_date(ctx.today).to_string()
}

fn resolve_quantity(ctx: &FeatureContext<'_>, _: &mut FillerSource) -> f64 {
    ctx.request.quantity
}

fn resolve_temperature(_: &FeatureContext<'_>, filler: &mut FillerSource) -> f64 {
    filler.draw(filler_ranges::TEMPERATURE)
}

fn resolve_rainfall(_: &FeatureContext<'_>, filler: &mut FillerSource) -> f64 {
    filler.draw(filler_ranges::RAINFALL)
}

fn resolve_soil_quality(_: &FeatureContext<'_>, filler: &mut FillerSource) -> f64 {
    filler.draw(filler_ranges::SOIL_QUALITY)
}

fn resolve_production_cost(_: &FeatureContext<'_>, filler: &mut FillerSource) -> f64 {
    filler.draw(filler_ranges::PRODUCTION_COST)
}

fn resolve_market_demand(_: &FeatureContext<'_>, filler: &mut FillerSource) -> f64 {
    filler.draw(filler_ranges::MARKET_DEMAND)
}

fn resolve_month(ctx: &FeatureContext<'_>, _: &mut FillerSource) -> f64 {
    f64::from(ctx.today.month())
}

fn resolve_year(ctx: &FeatureContext<'_>, _: &mut FillerSource) -> f64 {
    f64::from(ctx.today.year())
}

/// Resolve every schema feature, in schema order.
pub fn assemble(
    schema: &ModelSchema,
    request: &PredictionRequest,
    today: NaiveDate,
    filler: &mut FillerSource,
) -> FeatureRecord {
    let ctx = FeatureContext { request, today };
    let mut record = FeatureRecord::with_capacity(schema.len());

    for (name, kind) in schema.features() {
        let value = match kind {
            FeatureKind::Categorical => {
                let text = CATEGORICAL_RESOLVERS
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, resolve)| resolve(&ctx))
                    .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
                FeatureValue::Text(text)
            }
            FeatureKind::Numerical => {
                let number = NUMERICAL_RESOLVERS
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, resolve)| resolve(&ctx, filler))
                    .unwrap_or(UNKNOWN_NUMBER);
                FeatureValue::Number(number)
            }
        };
        record.push(name, value);
    }

    record
}
