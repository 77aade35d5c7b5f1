pub mod artifact;
pub mod encoder;
pub mod regressor;
pub mod scaler;
pub mod schema;

pub use artifact::ModelArtifact;
pub use encoder::CategoricalEncoder;
pub use regressor::Regressor;
pub use scaler::NumericalScaler;
pub use schema::ModelSchema;
