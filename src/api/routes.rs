use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::stats::{LatencySummary, ServiceStats};
use crate::config::{request_defaults, FillerMode, DEFAULT_CROPS};
use crate::error::AppError;
use crate::market::generate_snapshot;
use crate::market::snapshot::round_to;
use crate::pipeline::{FillerSource, Prediction, PricePredictor};
use crate::types::{MarketSnapshot, PredictionRequest, Trend};

const SUCCESS: &str = "success";

#[derive(Clone)]
pub struct ApiState {
    pub predictor: PricePredictor,
    /// Crops accepted by the prediction endpoints, as published.
    pub crops: Arc<Vec<String>>,
    pub stats: Arc<ServiceStats>,
    pub filler_mode: FillerMode,
    pub filler_seed: Option<u64>,
}

impl ApiState {
    pub fn new(predictor: PricePredictor, filler_mode: FillerMode, filler_seed: Option<u64>) -> Self {
        let crops = known_crops(&predictor);
        Self {
            predictor,
            crops: Arc::new(crops),
            stats: Arc::new(ServiceStats::new()),
            filler_mode,
            filler_seed,
        }
    }

    /// Lowercased `crop_type` if it is non-empty and known.
    fn validate_crop(&self, crop_type: Option<&str>) -> Result<String, AppError> {
        let crop = crop_type.unwrap_or_default().to_lowercase();
        if crop.is_empty() {
            return Err(AppError::BadRequest("crop_type is required".to_string()));
        }
        if !self.crops.iter().any(|c| c.to_lowercase() == crop) {
            return Err(AppError::BadRequest(format!(
                "Crop \"{crop}\" not found in model. Available crops: {:?}",
                self.crops
            )));
        }
        Ok(crop)
    }

    fn run_prediction(&self, request: &PredictionRequest) -> Prediction {
        let mut filler = FillerSource::from_mode(self.filler_mode, self.filler_seed);
        let started = Instant::now();
        let prediction = self
            .predictor
            .predict(request, Local::now().date_naive(), &mut filler);
        self.stats.record(&prediction, started.elapsed());
        prediction
    }

    fn market_rng(&self) -> StdRng {
        match self.filler_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// The artifact's `crop_type` classes, else the built-in list.
pub fn known_crops(predictor: &PricePredictor) -> Vec<String> {
    predictor
        .artifact()
        .and_then(|a| a.crop_classes())
        .map(|classes| classes.to_vec())
        .unwrap_or_else(|| DEFAULT_CROPS.iter().map(|c| c.to_string()).collect())
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(get_home))
        .route("/health", get(get_health))
        .route("/available-crops", get(get_available_crops))
        .route("/market-prices", get(get_market_prices))
        .route("/predict-price", post(post_predict_price))
        .route("/batch-predict", post(post_batch_predict))
        .route("/stats/latency", get(get_stats_latency))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn timestamp() -> String {
    Local::now().to_rfc3339()
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PredictBody {
    pub crop_type: Option<String>,
    pub variety: Option<String>,
    #[serde(default, deserialize_with = "number_or_numeric_string")]
    pub quantity: Option<f64>,
    pub region: Option<String>,
}

impl PredictBody {
    fn into_request(self, crop_type: String) -> PredictionRequest {
        PredictionRequest::new(&crop_type)
            .with_variety(self.variety.unwrap_or_else(|| request_defaults::VARIETY.to_string()))
            .with_quantity(self.quantity.unwrap_or(request_defaults::QUANTITY))
            .with_region(self.region.unwrap_or_else(|| request_defaults::REGION.to_string()))
    }
}

/// Accepts `250`, `250.5` and `"250"`.
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Quantity {
        Number(f64),
        Text(String),
    }

    match Option::<Quantity>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Quantity::Number(v)) => Ok(Some(v)),
        Some(Quantity::Text(raw)) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("quantity must be a number, got {raw:?}"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchBody {
    #[serde(default)]
    pub crops: Vec<PredictBody>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HomeResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub model_loaded: bool,
    pub available_crops: Vec<String>,
    pub total_crops: usize,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub available_crops_count: usize,
    pub timestamp: String,
    pub predictions_total: u64,
    pub fallbacks_total: u64,
}

#[derive(Serialize)]
pub struct CropsResponse {
    pub status: &'static str,
    pub crops: Vec<String>,
    pub count: usize,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct MarketPricesResponse {
    pub status: &'static str,
    pub market_data: BTreeMap<String, MarketSnapshot>,
    pub current_prices: BTreeMap<String, f64>,
    pub previous_prices: BTreeMap<String, f64>,
    pub price_changes: BTreeMap<String, f64>,
    pub market_trends: BTreeMap<String, Trend>,
    pub regions: BTreeMap<String, String>,
    pub supply_levels: BTreeMap<String, String>,
    pub categories: BTreeMap<String, String>,
    pub total_crops: usize,
    pub timestamp: String,
    pub model_used: bool,
}

#[derive(Serialize)]
pub struct PredictResponse {
    pub status: &'static str,
    pub predicted_price: f64,
    pub crop_type: String,
    pub variety: String,
    pub quantity: f64,
    pub region: String,
    /// "high" when the model answered, "low" for a table price.
    pub confidence: &'static str,
    /// "model" or "fallback"
    pub source: &'static str,
    pub timestamp: String,
    pub model_used: bool,
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub status: &'static str,
    pub predictions: BTreeMap<String, f64>,
    pub total_predicted: usize,
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_home(State(state): State<ApiState>) -> Json<HomeResponse> {
    let endpoints = BTreeMap::from([
        ("/market-prices", "GET - Current market prices"),
        ("/predict-price", "POST - Predict price for specific crop"),
        ("/batch-predict", "POST - Predict prices for multiple crops"),
        ("/available-crops", "GET - List of all available crops"),
        ("/health", "GET - API health check"),
        ("/stats/latency", "GET - Prediction latency percentiles"),
    ]);
    Json(HomeResponse {
        status: SUCCESS,
        message: "AgriBid Crop Price API is running",
        model_loaded: state.predictor.model_loaded(),
        available_crops: state.crops.to_vec(),
        total_crops: state.crops.len(),
        endpoints,
    })
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: SUCCESS,
        model_loaded: state.predictor.model_loaded(),
        available_crops_count: state.crops.len(),
        timestamp: timestamp(),
        predictions_total: state.stats.predictions_total(),
        fallbacks_total: state.stats.fallbacks_total(),
    })
}

async fn get_available_crops(State(state): State<ApiState>) -> Json<CropsResponse> {
    Json(CropsResponse {
        status: SUCCESS,
        crops: state.crops.to_vec(),
        count: state.crops.len(),
        timestamp: timestamp(),
    })
}

async fn get_market_prices(State(state): State<ApiState>) -> Json<MarketPricesResponse> {
    let mut rng = state.market_rng();
    let market_data = generate_snapshot(&state.crops, Local::now().date_naive(), &mut rng);

    let mut resp = MarketPricesResponse {
        status: SUCCESS,
        market_data: BTreeMap::new(),
        current_prices: BTreeMap::new(),
        previous_prices: BTreeMap::new(),
        price_changes: BTreeMap::new(),
        market_trends: BTreeMap::new(),
        regions: BTreeMap::new(),
        supply_levels: BTreeMap::new(),
        categories: BTreeMap::new(),
        total_crops: market_data.len(),
        timestamp: timestamp(),
        model_used: state.predictor.model_loaded(),
    };
    for (crop, snap) in &market_data {
        resp.current_prices.insert(crop.clone(), snap.current);
        resp.previous_prices.insert(crop.clone(), snap.previous);
        resp.price_changes.insert(crop.clone(), snap.price_change);
        resp.market_trends.insert(crop.clone(), snap.trend);
        resp.regions.insert(crop.clone(), snap.region.clone());
        resp.supply_levels.insert(crop.clone(), snap.supply.clone());
        resp.categories.insert(crop.clone(), snap.category.to_string());
    }
    resp.market_data = market_data;

    Json(resp)
}

async fn post_predict_price(
    State(state): State<ApiState>,
    payload: Result<Json<PredictBody>, JsonRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    let Json(body) = payload?;
    let crop = state.validate_crop(body.crop_type.as_deref())?;
    let request = body.into_request(crop);
    let prediction = state.run_prediction(&request);

    Ok(Json(PredictResponse {
        status: SUCCESS,
        predicted_price: round_to(prediction.price(), 2),
        confidence: if prediction.is_model() { "high" } else { "low" },
        source: prediction.source(),
        model_used: prediction.is_model(),
        crop_type: request.crop_type,
        variety: request.variety,
        quantity: request.quantity,
        region: request.region,
        timestamp: timestamp(),
    }))
}

async fn post_batch_predict(
    State(state): State<ApiState>,
    payload: Result<Json<BatchBody>, JsonRejection>,
) -> Result<Json<BatchResponse>, AppError> {
    let Json(body) = payload?;

    let mut predictions = BTreeMap::new();
    for entry in body.crops {
        // empty or unknown crops are skipped, not reported
        let Ok(crop) = state.validate_crop(entry.crop_type.as_deref()) else {
            continue;
        };
        let request = entry.into_request(crop);
        let prediction = state.run_prediction(&request);
        predictions.insert(request.crop_type, round_to(prediction.price(), 2));
    }

    Ok(Json(BatchResponse {
        status: SUCCESS,
        total_predicted: predictions.len(),
        predictions,
        timestamp: timestamp(),
    }))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySummary> {
    Json(state.stats.latency())
}
