use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::assembler::{assemble, FillerSource};
use super::transform::transform;
use crate::config::{fallback_price, DEFAULT_PRICE_FLOOR};
use crate::error::PipelineError;
use crate::model::ModelArtifact;
use crate::types::{FeatureRecord, PredictionRequest};

/// Why the table price was used instead of the model's.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    ModelUnavailable,
    /// Model output (carried) was under the plausibility floor.
    BelowFloor(f64),
    NonFinite,
    Pipeline(PipelineError),
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::ModelUnavailable => write!(f, "model not loaded"),
            FallbackReason::BelowFloor(raw) => write!(f, "model output {raw:.4} below floor"),
            FallbackReason::NonFinite => write!(f, "model output not finite"),
            FallbackReason::Pipeline(e) => write!(f, "pipeline error: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Model { price: f64 },
    Fallback { price: f64, reason: FallbackReason },
}

impl Prediction {
    pub fn price(&self) -> f64 {
        match self {
            Prediction::Model { price } | Prediction::Fallback { price, .. } => *price,
        }
    }

    pub fn is_model(&self) -> bool {
        matches!(self, Prediction::Model { .. })
    }

    pub fn source(&self) -> &'static str {
        match self {
            Prediction::Model { .. } => "model",
            Prediction::Fallback { .. } => "fallback",
        }
    }
}

/// Runs the feature pipeline against an optional model artifact.
///
/// Never fails: every problem ends in a fallback table price, which is finite
/// and non-negative.
#[derive(Debug, Clone)]
pub struct PricePredictor {
    artifact: Option<Arc<ModelArtifact>>,
    price_floor: f64,
}

impl PricePredictor {
    /// A negative or non-finite floor is replaced by the default.
    pub fn new(artifact: Option<Arc<ModelArtifact>>, price_floor: f64) -> Self {
        let price_floor = if price_floor.is_finite() && price_floor >= 0.0 {
            price_floor
        } else {
            DEFAULT_PRICE_FLOOR
        };
        Self {
            artifact,
            price_floor,
        }
    }

    pub fn artifact(&self) -> Option<&ModelArtifact> {
        self.artifact.as_deref()
    }

    pub fn model_loaded(&self) -> bool {
        self.artifact.is_some()
    }

    pub fn price_floor(&self) -> f64 {
        self.price_floor
    }

    /// assemble → transform → regress.
    pub fn predict(
        &self,
        request: &PredictionRequest,
        today: NaiveDate,
        filler: &mut FillerSource,
    ) -> Prediction {
        let Some(artifact) = self.artifact.as_deref() else {
            return self.fallback(&request.crop_type, FallbackReason::ModelUnavailable);
        };

        let record = assemble(artifact.schema(), request, today, filler);
        match transform(
            artifact.schema(),
            artifact.encoders(),
            artifact.scaler(),
            record,
        ) {
            Ok(transformed) => self.predict_record(&transformed, &request.crop_type),
            Err(e) => self.fallback(&request.crop_type, FallbackReason::Pipeline(e)),
        }
    }

    /// Regress on an already-transformed record, applying the floor.
    pub fn predict_record(&self, record: &FeatureRecord, crop_type: &str) -> Prediction {
        let Some(artifact) = self.artifact.as_deref() else {
            return self.fallback(crop_type, FallbackReason::ModelUnavailable);
        };

        let raw = match record
            .to_vector()
            .and_then(|x| artifact.regressor().predict(&x))
        {
            Ok(v) => v,
            Err(e) => return self.fallback(crop_type, FallbackReason::Pipeline(e)),
        };

        if !raw.is_finite() {
            return self.fallback(crop_type, FallbackReason::NonFinite);
        }
        if raw < self.price_floor {
            return self.fallback(crop_type, FallbackReason::BelowFloor(raw));
        }
        Prediction::Model { price: raw }
    }

    fn fallback(&self, crop_type: &str, reason: FallbackReason) -> Prediction {
        match &reason {
            FallbackReason::Pipeline(_) | FallbackReason::NonFinite => {
                warn!(crop = %crop_type, reason = %reason, "Prediction failed, using fallback price");
            }
            FallbackReason::ModelUnavailable | FallbackReason::BelowFloor(_) => {
                debug!(crop = %crop_type, reason = %reason, "Using fallback price");
            }
        }
        Prediction::Fallback {
            price: fallback_price(crop_type),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::model::{CategoricalEncoder, ModelSchema, NumericalScaler, Regressor};

    /// Returns a fixed value regardless of input.
    #[derive(Debug)]
    struct FixedRegressor {
        value: f64,
        n_features: usize,
    }

    impl Regressor for FixedRegressor {
        fn predict(&self, features: &[f64]) -> Result<f64, PipelineError> {
            if features.len() != self.n_features {
                return Err(PipelineError::FeatureCount {
                    expected: self.n_features,
                    actual: features.len(),
                });
            }
            Ok(self.value)
        }

        fn name(&self) -> &str {
            "Fixed"
        }

        fn n_features(&self) -> usize {
            self.n_features
        }
    }

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    fn artifact_with(value: f64, encoders: HashMap<String, CategoricalEncoder>) -> Arc<ModelArtifact> {
        let schema =
            ModelSchema::new(s(&["crop_type", "quantity"]), s(&["crop_type"]), s(&["quantity"]))
                .unwrap();
        let regressor = Box::new(FixedRegressor {
            value,
            n_features: 2,
        });
        Arc::new(ModelArtifact::new(regressor, schema, encoders, None).unwrap())
    }

    fn crop_encoders() -> HashMap<String, CategoricalEncoder> {
        HashMap::from([(
            "crop_type".to_string(),
            CategoricalEncoder::new(s(&["onion", "rice"])),
        )])
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn run(predictor: &PricePredictor, crop: &str) -> Prediction {
        predictor.predict(&PredictionRequest::new(crop), today(), &mut FillerSource::Midpoint)
    }

    #[test]
    fn no_model_uses_table() {
        let predictor = PricePredictor::new(None, DEFAULT_PRICE_FLOOR);
        let p = run(&predictor, "rice");
        assert_eq!(p.price(), 45.50);
        assert_eq!(
            p,
            Prediction::Fallback {
                price: 45.50,
                reason: FallbackReason::ModelUnavailable
            }
        );
    }

    #[test]
    fn no_model_unknown_crop_uses_default_price() {
        let predictor = PricePredictor::new(None, DEFAULT_PRICE_FLOOR);
        assert_eq!(run(&predictor, "durian").price(), 50.0);
    }

    #[test]
    fn output_below_floor_falls_back() {
        let predictor = PricePredictor::new(Some(artifact_with(2.0, crop_encoders())), 5.0);
        let p = run(&predictor, "onion");
        assert_eq!(p.price(), 120.50);
        assert_eq!(
            p,
            Prediction::Fallback {
                price: 120.50,
                reason: FallbackReason::BelowFloor(2.0)
            }
        );
    }

    #[test]
    fn plausible_output_is_kept() {
        let predictor = PricePredictor::new(Some(artifact_with(61.25, crop_encoders())), 5.0);
        let p = run(&predictor, "rice");
        assert_eq!(p, Prediction::Model { price: 61.25 });
        assert!(p.is_model());
        assert_eq!(p.source(), "model");
    }

    #[test]
    fn floor_is_configurable() {
        let predictor = PricePredictor::new(Some(artifact_with(8.0, crop_encoders())), 10.0);
        assert!(!run(&predictor, "rice").is_model());
        let predictor = PricePredictor::new(Some(artifact_with(8.0, crop_encoders())), 1.0);
        assert!(run(&predictor, "rice").is_model());
    }

    #[test]
    fn invalid_floor_uses_default() {
        assert_eq!(PricePredictor::new(None, f64::NAN).price_floor(), DEFAULT_PRICE_FLOOR);
        assert_eq!(PricePredictor::new(None, -1.0).price_floor(), DEFAULT_PRICE_FLOOR);
    }

    #[test]
    fn non_finite_output_falls_back() {
        let predictor = PricePredictor::new(Some(artifact_with(f64::INFINITY, crop_encoders())), 5.0);
        let p = run(&predictor, "rice");
        assert_eq!(
            p,
            Prediction::Fallback {
                price: 45.50,
                reason: FallbackReason::NonFinite
            }
        );
    }

    #[test]
    fn unencoded_categorical_falls_back() {
        // no crop_type encoder: the raw string cannot reach the model
        let predictor = PricePredictor::new(Some(artifact_with(60.0, HashMap::new())), 5.0);
        let p = run(&predictor, "rice");
        assert_eq!(
            p,
            Prediction::Fallback {
                price: 45.50,
                reason: FallbackReason::Pipeline(PipelineError::Unencoded("crop_type".into()))
            }
        );
    }

    #[test]
    fn record_width_mismatch_falls_back() {
        let predictor = PricePredictor::new(Some(artifact_with(60.0, crop_encoders())), 5.0);
        let mut record = FeatureRecord::default();
        record.push("quantity", crate::types::FeatureValue::Number(1.0));
        let p = predictor.predict_record(&record, "corn");
        assert_eq!(p.price(), 22.30);
        assert!(matches!(
            p,
            Prediction::Fallback {
                reason: FallbackReason::Pipeline(PipelineError::FeatureCount { .. }),
                ..
            }
        ));
    }

    #[test]
    fn scaled_linear_artifact_end_to_end() {
        let json = r#"{
            "feature_names": ["crop_type", "quantity"],
            "categorical_cols": ["crop_type"],
            "numerical_cols": ["quantity"],
            "label_encoders": {"crop_type": {"classes": ["corn", "rice"]}},
            "scaler": {"kind": "standard", "mean": [100.0], "scale": [50.0]},
            "model": {"model_type": "linear_regression", "coefficients": [10.0, 4.0], "intercept": 30.0}
        }"#;
        let artifact = Arc::new(ModelArtifact::from_json_str(json).unwrap());
        let predictor = PricePredictor::new(Some(artifact), 5.0);
        let req = PredictionRequest::new("RICE").with_quantity(200.0);
        let p = predictor.predict(&req, today(), &mut FillerSource::Midpoint);
        // rice → 1, (200 - 100) / 50 → 2: 10*1 + 4*2 + 30
        assert_eq!(p, Prediction::Model { price: 48.0 });
    }

    #[test]
    fn prices_are_always_finite_and_non_negative() {
        let scaler = NumericalScaler::Standard {
            mean: vec![0.0],
            scale: vec![1.0],
        };
        let schema =
            ModelSchema::new(s(&["crop_type", "quantity"]), s(&["crop_type"]), s(&["quantity"]))
                .unwrap();
        let artifact = ModelArtifact::new(
            Box::new(FixedRegressor {
                value: -40.0,
                n_features: 2,
            }),
            schema,
            crop_encoders(),
            Some(scaler),
        )
        .unwrap();
        let predictors = [
            PricePredictor::new(None, 5.0),
            PricePredictor::new(Some(Arc::new(artifact)), 5.0),
        ];
        for predictor in &predictors {
            for crop in ["rice", "corn", "onion", "coffee", "unknown"] {
                let price = run(predictor, crop).price();
                assert!(price.is_finite() && price >= 0.0, "{crop}={price}");
            }
        }
    }
}
