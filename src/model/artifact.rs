use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::regressor::RegressorJson;
use super::{CategoricalEncoder, ModelSchema, NumericalScaler, Regressor};
use crate::error::{AppError, Result};

/// On-disk layout: the JSON export of the pickled training assets.
#[derive(Debug, Deserialize)]
struct ArtifactJson {
    feature_names: Vec<String>,
    categorical_cols: Vec<String>,
    numerical_cols: Vec<String>,
    #[serde(default)]
    label_encoders: HashMap<String, EncoderJson>,
    #[serde(default)]
    scaler: Option<NumericalScaler>,
    model: RegressorJson,
}

#[derive(Debug, Deserialize)]
struct EncoderJson {
    classes: Vec<String>,
}

/// Trained regressor plus everything needed to build its input row.
/// Loaded once at startup and shared read-only.
#[derive(Debug)]
pub struct ModelArtifact {
    regressor: Box<dyn Regressor>,
    schema: ModelSchema,
    encoders: HashMap<String, CategoricalEncoder>,
    scaler: Option<NumericalScaler>,
}

impl ModelArtifact {
    pub fn new(
        regressor: Box<dyn Regressor>,
        schema: ModelSchema,
        encoders: HashMap<String, CategoricalEncoder>,
        scaler: Option<NumericalScaler>,
    ) -> Result<Self> {
        for name in encoders.keys() {
            if !schema.categorical().iter().any(|c| c == name) {
                return Err(AppError::Artifact(format!(
                    "encoder '{name}' does not belong to a categorical feature"
                )));
            }
        }
        if let Some(scaler) = &scaler {
            scaler.validate()?;
            if scaler.width() != schema.numerical().len() {
                return Err(AppError::Artifact(format!(
                    "scaler covers {} columns but schema declares {} numerical features",
                    scaler.width(),
                    schema.numerical().len()
                )));
            }
        }
        if regressor.n_features() != schema.len() {
            return Err(AppError::Artifact(format!(
                "{} expects {} features but schema declares {}",
                regressor.name(),
                regressor.n_features(),
                schema.len()
            )));
        }
        Ok(Self {
            regressor,
            schema,
            encoders,
            scaler,
        })
    }

    /// Load an artifact from a JSON file.
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Artifact(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let parsed: ArtifactJson = serde_json::from_str(json)?;
        let schema = ModelSchema::new(
            parsed.feature_names,
            parsed.categorical_cols,
            parsed.numerical_cols,
        )?;
        let encoders = parsed
            .label_encoders
            .into_iter()
            .map(|(name, enc)| (name, CategoricalEncoder::new(enc.classes)))
            .collect();
        Self::new(parsed.model.build()?, schema, encoders, parsed.scaler)
    }

    pub fn regressor(&self) -> &dyn Regressor {
        self.regressor.as_ref()
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub fn encoders(&self) -> &HashMap<String, CategoricalEncoder> {
        &self.encoders
    }

    pub fn scaler(&self) -> Option<&NumericalScaler> {
        self.scaler.as_ref()
    }

    /// Crops the model was trained on, if it carries a `crop_type` encoder.
    pub fn crop_classes(&self) -> Option<&[String]> {
        self.encoders.get("crop_type").map(|e| e.classes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "feature_names": ["crop_type", "season", "quantity", "month"],
            "categorical_cols": ["crop_type", "season"],
            "numerical_cols": ["quantity", "month"],
            "label_encoders": {
                "crop_type": {"classes": ["corn", "onion", "rice"]},
                "season": {"classes": ["Dry", "Summer", "Wet"]}
            },
            "scaler": {"kind": "standard", "mean": [100.0, 6.0], "scale": [50.0, 3.0]},
            "model": {
                "model_type": "linear_regression",
                "coefficients": [1.0, 0.5, 2.0, 0.0],
                "intercept": 40.0
            }
        }"#
    }

    #[test]
    fn loads_complete_artifact() {
        let artifact = ModelArtifact::from_json_str(sample_json()).unwrap();
        assert_eq!(artifact.schema().len(), 4);
        assert_eq!(artifact.encoders().len(), 2);
        assert_eq!(artifact.scaler().map(|s| s.width()), Some(2));
        assert_eq!(
            artifact.crop_classes().unwrap(),
            &["corn".to_string(), "onion".into(), "rice".into()]
        );
        assert_eq!(artifact.regressor().name(), "LinearRegression");
    }

    #[test]
    fn scaler_and_encoders_are_optional() {
        let json = r#"{
            "feature_names": ["quantity"],
            "categorical_cols": [],
            "numerical_cols": ["quantity"],
            "scaler": null,
            "model": {"model_type": "linear_regression", "coefficients": [0.1], "intercept": 30.0}
        }"#;
        let artifact = ModelArtifact::from_json_str(json).unwrap();
        assert!(artifact.scaler().is_none());
        assert!(artifact.crop_classes().is_none());
    }

    #[test]
    fn scaler_width_must_match_schema() {
        let json = sample_json().replace(r#""mean": [100.0, 6.0], "scale": [50.0, 3.0]"#, r#""mean": [100.0], "scale": [50.0]"#);
        let err = ModelArtifact::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("scaler covers 1"), "{err}");
    }

    #[test]
    fn model_width_must_match_schema() {
        let json = sample_json().replace("[1.0, 0.5, 2.0, 0.0]", "[1.0, 0.5]");
        assert!(ModelArtifact::from_json_str(&json).is_err());
    }

    #[test]
    fn encoder_for_numerical_feature_is_rejected() {
        let json = sample_json().replace(r#""season": {"#, r#""quantity": {"#);
        let err = ModelArtifact::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("encoder 'quantity'"), "{err}");
    }

    #[test]
    fn missing_file_is_artifact_error() {
        let err = ModelArtifact::from_json("/nonexistent/model.json").unwrap_err();
        assert!(matches!(err, AppError::Artifact(_)));
    }

    #[test]
    fn corrupt_json_is_rejected() {
        assert!(matches!(
            ModelArtifact::from_json_str("{not json"),
            Err(AppError::Json(_))
        ));
    }
}
