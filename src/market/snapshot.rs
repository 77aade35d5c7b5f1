//! Synthetic per-crop market board.
//!
//! Not fed by the predictor. Values are random but each snapshot is
//! internally consistent: `price_change`, `change_percentage` and `trend` are
//! all derived from the rounded `current`/`previous` pair.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::types::{CropCategory, MarketSnapshot, Season, Trend};

pub const PHILIPPINE_REGIONS: &[&str] = &[
    "National Capital Region",
    "Cordillera Administrative Region",
    "Ilocos Region",
    "Cagayan Valley",
    "Central Luzon",
    "Calabarzon",
    "Mimaropa",
    "Bicol Region",
    "Western Visayas",
    "Central Visayas",
    "Eastern Visayas",
    "Zamboanga Peninsula",
    "Northern Mindanao",
    "Davao Region",
    "Soccsksargen",
    "Caraga",
    "Bangsamoro",
];

pub const SUPPLY_LEVELS: &[&str] = &["Very High", "High", "Medium", "Low", "Very Low"];

pub const QUALITY_GRADES: &[&str] = &["Premium", "Grade A", "Grade B", "Standard"];

/// previous = current / (1 + u), u in this range.
const PREVIOUS_DRIFT: (f64, f64) = (-0.15, 0.15);

/// Seasonal price multiplier range for a category, if the season affects it.
fn seasonal_multiplier(season: Season, category: CropCategory) -> Option<(f64, f64)> {
    match (season, category) {
        (Season::Wet, CropCategory::Vegetables | CropCategory::Fruits) => Some((1.1, 1.3)),
        (Season::Summer, CropCategory::Vegetables) => Some((1.05, 1.2)),
        _ => None,
    }
}

pub fn generate_snapshot<R: Rng + ?Sized>(
    crops: &[String],
    today: NaiveDate,
    rng: &mut R,
) -> BTreeMap<String, MarketSnapshot> {
    let season = Season::from_date(today);
    crops
        .iter()
        .map(|crop| (crop.clone(), snapshot_for(crop, season, rng)))
        .collect()
}

fn snapshot_for<R: Rng + ?Sized>(crop: &str, season: Season, rng: &mut R) -> MarketSnapshot {
    let category = CropCategory::of(crop);
    let (lo, hi) = category.price_band();
    let mut base = rng.gen_range(lo..hi);
    if let Some((mlo, mhi)) = seasonal_multiplier(season, category) {
        base *= rng.gen_range(mlo..mhi);
    }

    let current = round_to(base, 2);
    let drift = rng.gen_range(PREVIOUS_DRIFT.0..PREVIOUS_DRIFT.1);
    let previous = round_to(current / (1.0 + drift), 2);
    let change_percentage = round_to((current - previous) / previous * 100.0, 1);

    MarketSnapshot {
        current,
        previous,
        region: pick(PHILIPPINE_REGIONS, rng),
        supply: pick(SUPPLY_LEVELS, rng),
        quality: pick(QUALITY_GRADES, rng),
        category,
        price_change: round_to(current - previous, 2),
        change_percentage,
        trend: Trend::from_change_percentage(change_percentage),
    }
}

fn pick<R: Rng + ?Sized>(options: &[&str], rng: &mut R) -> String {
    options.choose(rng).copied().unwrap_or_default().to_string()
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
