use std::collections::HashMap;

use crate::error::PipelineError;
use crate::model::{CategoricalEncoder, ModelSchema, NumericalScaler};
use crate::types::{FeatureRecord, FeatureValue};

/// Encode categorical values and scale the numerical block of `record`.
///
/// - Categorical features with an encoder become codes; unseen values get
///   [`UNSEEN_CODE`](crate::model::encoder::UNSEEN_CODE). Features without an
///   encoder keep their raw text.
/// - Numerical features are scaled together, in the schema's numerical order.
///   No scaler (or no numerical features) leaves them as they are.
///
/// The only failure is a scaler whose width disagrees with the numerical block.
pub fn transform(
    schema: &ModelSchema,
    encoders: &HashMap<String, CategoricalEncoder>,
    scaler: Option<&NumericalScaler>,
    mut record: FeatureRecord,
) -> Result<FeatureRecord, PipelineError> {
    for name in schema.categorical() {
        let Some(encoder) = encoders.get(name) else {
            continue;
        };
        let Some(slot) = record.get_mut(name) else {
            continue;
        };
        let Some(code) = slot.as_text().map(|raw| encoder.encode(raw)) else {
            continue;
        };
        *slot = FeatureValue::Code(code);
    }

    let numerical = schema.numerical();
    let Some(scaler) = scaler else {
        return Ok(record);
    };
    if numerical.is_empty() {
        return Ok(record);
    }

    let values: Vec<f64> = numerical
        .iter()
        .map(|name| {
            record
                .get(name)
                .and_then(FeatureValue::as_number)
                .unwrap_or(0.0)
        })
        .collect();
    let scaled = scaler.transform(&values)?;
    for (name, v) in numerical.iter().zip(scaled) {
        if let Some(slot) = record.get_mut(name) {
            *slot = FeatureValue::Number(v);
        }
    }

    Ok(record)
}
