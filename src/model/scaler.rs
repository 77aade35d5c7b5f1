use serde::Deserialize;

use crate::error::{AppError, PipelineError, Result};

/// Column-wise transform over the numerical features, in schema order.
///
/// Parameters follow sklearn's fitted attributes so an exported scaler can be
/// used unchanged. A zero scale is treated as 1 (constant training column).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NumericalScaler {
    /// `StandardScaler`: `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `MinMaxScaler`: `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl NumericalScaler {
    pub fn width(&self) -> usize {
        match self {
            NumericalScaler::Standard { mean, .. } => mean.len(),
            NumericalScaler::MinMax { min, .. } => min.len(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let (offsets, scale) = match self {
            NumericalScaler::Standard { mean, scale } => (mean, scale),
            NumericalScaler::MinMax { min, scale } => (min, scale),
        };
        if offsets.len() != scale.len() {
            return Err(AppError::Artifact(format!(
                "scaler parameter lengths differ ({} vs {})",
                offsets.len(),
                scale.len()
            )));
        }
        if offsets.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err(AppError::Artifact(
                "scaler parameters must be finite".to_string(),
            ));
        }
        Ok(())
    }

    pub fn transform(&self, values: &[f64]) -> std::result::Result<Vec<f64>, PipelineError> {
        if values.len() != self.width() {
            return Err(PipelineError::ScalerWidth {
                expected: self.width(),
                actual: values.len(),
            });
        }
        let out = match self {
            NumericalScaler::Standard { mean, scale } => values
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / nonzero(*s))
                .collect(),
            NumericalScaler::MinMax { min, scale } => values
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (lo, s))| x * s + lo)
                .collect(),
        };
        Ok(out)
    }
}

#[inline]
fn nonzero(s: f64) -> f64 {
    if s == 0.0 {
        1.0
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_scaler_centers_and_scales() {
        let scaler = NumericalScaler::Standard {
            mean: vec![100.0, 2024.0],
            scale: vec![25.0, 0.0],
        };
        let out = scaler.transform(&[150.0, 2026.0]).unwrap();
        assert!((out[0] - 2.0).abs() < 1e-12);
        // zero scale leaves the centered value untouched
        assert!((out[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn min_max_scaler() {
        let scaler = NumericalScaler::MinMax {
            min: vec![-0.5],
            scale: vec![0.01],
        };
        let out = scaler.transform(&[100.0]).unwrap();
        assert!((out[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn width_mismatch_is_an_error() {
        let scaler = NumericalScaler::Standard {
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 1.0],
        };
        assert_eq!(
            scaler.transform(&[1.0]),
            Err(PipelineError::ScalerWidth { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn deserializes_tagged_kind() {
        let scaler: NumericalScaler =
            serde_json::from_str(r#"{"kind": "standard", "mean": [1.0], "scale": [2.0]}"#)
                .unwrap();
        assert_eq!(scaler.width(), 1);
        assert!(scaler.validate().is_ok());
    }

    #[test]
    fn mismatched_parameters_fail_validation() {
        let scaler = NumericalScaler::MinMax {
            min: vec![0.0, 1.0],
            scale: vec![1.0],
        };
        assert!(scaler.validate().is_err());
    }
}
