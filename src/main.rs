mod api;
mod config;
mod error;
mod market;
mod model;
mod pipeline;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::model::ModelArtifact;
use crate::pipeline::PricePredictor;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Model artifact (optional) ---
    let artifact = match ModelArtifact::from_json(&cfg.model_path) {
        Ok(a) => {
            info!(
                path = %cfg.model_path,
                model = a.regressor().name(),
                features = a.schema().len(),
                crops = a.crop_classes().map_or(0, |c| c.len()),
                "Model artifact loaded"
            );
            Some(Arc::new(a))
        }
        Err(e) => {
            error!(path = %cfg.model_path, "Could not load model artifact: {e}");
            warn!("Serving fallback prices only");
            None
        }
    };

    let predictor = PricePredictor::new(artifact, cfg.price_floor);
    info!(
        price_floor = predictor.price_floor(),
        filler_mode = ?cfg.filler_mode,
        seeded = cfg.filler_seed.is_some(),
        "Predictor ready"
    );

    // --- HTTP API server ---
    let api_state = ApiState::new(predictor, cfg.filler_mode, cfg.filler_seed);
    info!("Serving {} crops", api_state.crops.len());
    let app = router(api_state);
    let bind_addr = format!("{}:{}", cfg.api_host, cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
