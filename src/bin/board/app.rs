use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::json;

// ---------------------------------------------------------------------------
// API response types (mirror api/routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotResponse {
    pub current: f64,
    pub previous: f64,
    pub region: String,
    pub supply: String,
    pub quality: String,
    pub category: String,
    pub price_change: f64,
    pub change_percentage: f64,
    pub trend: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MarketPricesResponse {
    pub market_data: BTreeMap<String, SnapshotResponse>,
    pub model_used: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HealthResponse {
    pub model_loaded: bool,
    pub available_crops_count: usize,
    pub predictions_total: Option<u64>,
    pub fallbacks_total: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BatchResponse {
    pub predictions: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LatencyResponse {
    pub p50_us: Option<u64>,
    pub p99_us: Option<u64>,
    pub sample_count: u64,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

/// One table row: the market snapshot joined with the model's prediction.
#[derive(Debug, Clone)]
pub struct BoardRow {
    pub crop: String,
    pub snapshot: SnapshotResponse,
    pub predicted: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub rows: Vec<BoardRow>,
    pub health: HealthResponse,
    pub latency: LatencyResponse,
    pub market_timestamp: String,
    /// Whether the server had a model loaded when it built the snapshot.
    pub market_model_used: bool,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            rows: Vec::new(),
            health: HealthResponse::default(),
            latency: LatencyResponse::default(),
            market_timestamp: String::new(),
            market_model_used: false,
            base_url,
        }
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let market_url = format!("{}/market-prices", self.base_url);
        let health_url = format!("{}/health", self.base_url);
        let latency_url = format!("{}/stats/latency", self.base_url);

        let (market_res, health_res, latency_res) = tokio::join!(
            client.get(&market_url).send(),
            client.get(&health_url).send(),
            client.get(&latency_url).send(),
        );

        let market = match market_res {
            Ok(resp) => resp.json::<MarketPricesResponse>().await,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };
        let market = match market {
            Ok(m) => m,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
                return;
            }
        };

        let predictions = self.fetch_predictions(client, market.market_data.keys()).await;
        self.rows = join_rows(market.market_data, &predictions);
        self.market_timestamp = market.timestamp;
        self.market_model_used = market.model_used;
        self.status = ConnectionStatus::Connected;

        if let Ok(h) = health_res {
            if let Ok(health) = h.json::<HealthResponse>().await {
                self.health = health;
            }
        }
        if let Ok(l) = latency_res {
            if let Ok(latency) = l.json::<LatencyResponse>().await {
                self.latency = latency;
            }
        }
    }

    /// One /batch-predict call for every crop on the board. Empty on failure.
    async fn fetch_predictions<'a>(
        &self,
        client: &reqwest::Client,
        crops: impl Iterator<Item = &'a String>,
    ) -> BTreeMap<String, f64> {
        let body = json!({
            "crops": crops.map(|c| json!({"crop_type": c})).collect::<Vec<_>>()
        });
        let url = format!("{}/batch-predict", self.base_url);
        match client.post(&url).json(&body).send().await {
            Ok(resp) if resp.status().is_success() => resp
                .json::<BatchResponse>()
                .await
                .map(|b| b.predictions)
                .unwrap_or_default(),
            _ => BTreeMap::new(),
        }
    }
}

/// Rows in crop order; predictions are matched case-insensitively.
pub fn join_rows(
    market: BTreeMap<String, SnapshotResponse>,
    predictions: &BTreeMap<String, f64>,
) -> Vec<BoardRow> {
    market
        .into_iter()
        .map(|(crop, snapshot)| {
            let predicted = predictions.get(&crop.to_lowercase()).copied();
            BoardRow {
                crop,
                snapshot,
                predicted,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_price(v: f64) -> String {
    format!("₱{v:.2}")
}

pub fn format_change(pct: f64) -> String {
    if pct > 0.0 {
        format!("+{pct:.1}%")
    } else {
        format!("{pct:.1}%")
    }
}

pub fn trend_arrow(trend: &str) -> &'static str {
    match trend {
        "up" => "▲",
        "down" => "▼",
        "stable" => "▬",
        _ => "?",
    }
}

pub fn format_latency(us: Option<u64>) -> String {
    match us {
        Some(v) if v >= 1000 => format!("{:.1}ms", v as f64 / 1000.0),
        Some(v) => format!("{v}µs"),
        None => "—".to_string(),
    }
}

/// Char-based truncation, ending in `…` when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
