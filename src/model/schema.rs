use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::types::FeatureKind;

/// Ordered feature list with its categorical/numerical split.
///
/// Every feature name is in exactly one of the two subsets, and the subsets
/// cover the whole list. `numerical` keeps its declared order: the scaler's
/// columns follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    feature_names: Vec<String>,
    categorical: Vec<String>,
    numerical: Vec<String>,
}

impl ModelSchema {
    pub fn new(
        feature_names: Vec<String>,
        categorical: Vec<String>,
        numerical: Vec<String>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for name in &feature_names {
            if !seen.insert(name.as_str()) {
                return Err(AppError::Artifact(format!("duplicate feature '{name}'")));
            }
        }

        let cat: HashSet<&str> = categorical.iter().map(String::as_str).collect();
        let num: HashSet<&str> = numerical.iter().map(String::as_str).collect();
        if cat.len() != categorical.len() || num.len() != numerical.len() {
            return Err(AppError::Artifact(
                "categorical/numerical column lists contain duplicates".to_string(),
            ));
        }

        for name in cat.iter().chain(num.iter()) {
            if !seen.contains(name) {
                return Err(AppError::Artifact(format!(
                    "column '{name}' is not in feature_names"
                )));
            }
        }
        for name in &feature_names {
            match (cat.contains(name.as_str()), num.contains(name.as_str())) {
                (true, true) => {
                    return Err(AppError::Artifact(format!(
                        "feature '{name}' is both categorical and numerical"
                    )))
                }
                (false, false) => {
                    return Err(AppError::Artifact(format!(
                        "feature '{name}' is neither categorical nor numerical"
                    )))
                }
                _ => {}
            }
        }

        Ok(Self {
            feature_names,
            categorical,
            numerical,
        })
    }

    #[cfg(test)]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    pub fn numerical(&self) -> &[String] {
        &self.numerical
    }

    pub fn len(&self) -> usize {
        self.feature_names.len()
    }

    pub fn kind_of(&self, name: &str) -> Option<FeatureKind> {
        if self.categorical.iter().any(|c| c == name) {
            Some(FeatureKind::Categorical)
        } else if self.numerical.iter().any(|n| n == name) {
            Some(FeatureKind::Numerical)
        } else {
            None
        }
    }

    /// `(name, kind)` in feature order.
    pub fn features(&self) -> impl Iterator<Item = (&str, FeatureKind)> {
        self.feature_names
            .iter()
            .filter_map(|name| self.kind_of(name).map(|kind| (name.as_str(), kind)))
    }
}
