use std::collections::HashMap;

/// Code assigned to values the encoder never saw during training.
pub const UNSEEN_CODE: u32 = 0;

/// Label encoder: each known class maps to its index in `classes`.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalEncoder {
    classes: Vec<String>,
    codes: HashMap<String, u32>,
}

impl CategoricalEncoder {
    /// Later duplicates keep the first index.
    pub fn new(classes: Vec<String>) -> Self {
        let mut codes = HashMap::with_capacity(classes.len());
        for (i, class) in classes.iter().enumerate() {
            codes.entry(class.clone()).or_insert(i as u32);
        }
        Self { classes, codes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Code for `value`, or [`UNSEEN_CODE`] if it is not a known class.
    pub fn encode(&self, value: &str) -> u32 {
        self.codes.get(value).copied().unwrap_or(UNSEEN_CODE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values_map_to_their_index() {
        let enc = CategoricalEncoder::new(vec!["corn".into(), "onion".into(), "rice".into()]);
        assert_eq!(enc.encode("corn"), 0);
        assert_eq!(enc.encode("onion"), 1);
        assert_eq!(enc.encode("rice"), 2);
    }

    #[test]
    fn unseen_value_maps_to_zero() {
        let enc = CategoricalEncoder::new(vec!["a".into(), "b".into()]);
        assert_eq!(enc.encode("zzz"), UNSEEN_CODE);
        assert_eq!(enc.encode(""), UNSEEN_CODE);
    }

    #[test]
    fn duplicate_class_keeps_first_index() {
        let enc = CategoricalEncoder::new(vec!["Dry".into(), "Wet".into(), "Dry".into()]);
        assert_eq!(enc.encode("Dry"), 0);
        assert_eq!(enc.classes().len(), 3);
    }
}
