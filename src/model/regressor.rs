//! Price regressors loaded from sklearn JSON exports.
//!
//! # JSON Format (LinearRegression)
//!
//! ```json
//! { "model_type": "linear_regression", "coefficients": [0.4, 1.2], "intercept": 30.0 }
//! ```
//!
//! # JSON Format (RandomForestRegressor)
//!
//! ```json
//! {
//!   "model_type": "random_forest",
//!   "n_features": 2,
//!   "trees": [
//!     { "nodes": [
//!       { "feature": 1, "threshold": 0.5, "left": 1, "right": 2, "value": null },
//!       { "feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": 42.0 },
//!       { "feature": -1, "threshold": 0.0, "left": -1, "right": -1, "value": 55.0 }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Tree traversal: start at node 0; `feature == -1` is a leaf returning
//! `value`; otherwise go left when `x[feature] <= threshold` (or NaN), right
//! otherwise. The forest prediction is the mean over trees.

use serde::Deserialize;

use crate::error::{AppError, PipelineError, Result};

/// A trained model that maps a dense feature row to a price.
///
/// Implementors must be `Send + Sync`: one instance serves every request.
pub trait Regressor: Send + Sync + std::fmt::Debug {
    fn predict(&self, features: &[f64]) -> std::result::Result<f64, PipelineError>;

    /// Model name for logging.
    fn name(&self) -> &str;

    fn n_features(&self) -> usize;
}

#[derive(Debug, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
pub(crate) enum RegressorJson {
    LinearRegression {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    RandomForest {
        n_features: usize,
        trees: Vec<TreeJson>,
    },
}

#[derive(Debug, Deserialize)]
pub(crate) struct TreeJson {
    nodes: Vec<TreeNode>,
}

impl RegressorJson {
    pub(crate) fn build(self) -> Result<Box<dyn Regressor>> {
        match self {
            RegressorJson::LinearRegression {
                coefficients,
                intercept,
            } => Ok(Box::new(LinearRegressor::new(coefficients, intercept)?)),
            RegressorJson::RandomForest { n_features, trees } => Ok(Box::new(
                RandomForestRegressor::new(n_features, trees.into_iter().map(|t| t.nodes).collect())?,
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Linear
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LinearRegressor {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearRegressor {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self> {
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(AppError::Artifact(
                "linear model parameters must be finite".to_string(),
            ));
        }
        Ok(Self {
            coefficients,
            intercept,
        })
    }
}

impl Regressor for LinearRegressor {
    fn predict(&self, features: &[f64]) -> std::result::Result<f64, PipelineError> {
        if features.len() != self.coefficients.len() {
            return Err(PipelineError::FeatureCount {
                expected: self.coefficients.len(),
                actual: features.len(),
            });
        }
        Ok(self
            .coefficients
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept)
    }

    fn name(&self) -> &str {
        "LinearRegression"
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }
}

// ---------------------------------------------------------------------------
// Random forest
// ---------------------------------------------------------------------------

/// A single node of a regression tree.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeNode {
    /// Feature index to split on (-1 for leaf nodes).
    pub feature: i32,
    pub threshold: f64,
    /// Index of left child (-1 for leaf nodes).
    pub left: i32,
    /// Index of right child (-1 for leaf nodes).
    pub right: i32,
    /// Leaf prediction (None for internal nodes).
    pub value: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    n_features: usize,
    trees: Vec<Vec<TreeNode>>,
}

impl RandomForestRegressor {
    pub fn new(n_features: usize, trees: Vec<Vec<TreeNode>>) -> Result<Self> {
        if trees.is_empty() {
            return Err(AppError::Artifact("random forest has no trees".to_string()));
        }
        for (t, nodes) in trees.iter().enumerate() {
            validate_tree(nodes, n_features)
                .map_err(|reason| AppError::Artifact(format!("tree {t}: {reason}")))?;
        }
        Ok(Self { n_features, trees })
    }

    fn traverse(
        tree: usize,
        nodes: &[TreeNode],
        features: &[f64],
    ) -> std::result::Result<f64, PipelineError> {
        let invalid = |reason: &str| PipelineError::InvalidTree {
            tree,
            reason: reason.to_string(),
        };
        let mut idx = 0usize;
        // A path longer than the node count means a cycle.
        for _ in 0..=nodes.len() {
            let node = nodes.get(idx).ok_or_else(|| invalid("child index out of range"))?;
            if node.feature < 0 {
                return node.value.ok_or_else(|| invalid("leaf without value"));
            }
            let x = *features
                .get(node.feature as usize)
                .ok_or_else(|| invalid("split feature out of range"))?;
            let next = if x.is_nan() || x <= node.threshold {
                node.left
            } else {
                node.right
            };
            idx = usize::try_from(next).map_err(|_| invalid("internal node without child"))?;
        }
        Err(invalid("cycle detected"))
    }
}

fn validate_tree(nodes: &[TreeNode], n_features: usize) -> std::result::Result<(), String> {
    if nodes.is_empty() {
        return Err("empty tree".to_string());
    }
    for (i, node) in nodes.iter().enumerate() {
        if node.feature < 0 {
            match node.value {
                Some(v) if v.is_finite() => {}
                _ => return Err(format!("leaf {i} has no finite value")),
            }
            continue;
        }
        if node.feature as usize >= n_features {
            return Err(format!("node {i} splits on feature {} of {n_features}", node.feature));
        }
        for child in [node.left, node.right] {
            if child < 0 || child as usize >= nodes.len() {
                return Err(format!("node {i} has invalid child {child}"));
            }
        }
    }
    Ok(())
}

impl Regressor for RandomForestRegressor {
    fn predict(&self, features: &[f64]) -> std::result::Result<f64, PipelineError> {
        if features.len() != self.n_features {
            return Err(PipelineError::FeatureCount {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        let mut sum = 0.0;
        for (t, nodes) in self.trees.iter().enumerate() {
            sum += Self::traverse(t, nodes, features)?;
        }
        Ok(sum / self.trees.len() as f64)
    }

    fn name(&self) -> &str {
        "RandomForestRegressor"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}
