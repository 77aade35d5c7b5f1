//! Request → feature row → encoded/scaled row → price.

pub mod assembler;
pub mod predictor;
pub mod transform;

pub use assembler::FillerSource;
pub use predictor::{Prediction, PricePredictor};
