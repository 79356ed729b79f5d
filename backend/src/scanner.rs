use crate::detector::{Prediction, label_matches};

/// True when any prediction carries a class whose name equals `target`, ignoring case.
///
/// Predictions without class names or without boxes are skipped. Scanning stops
/// at the first match.
pub fn contains_label(predictions: &[Prediction], target: &str) -> bool {
    predictions
        .iter()
        .filter(|prediction| !prediction.names.is_empty() && !prediction.boxes.is_empty())
        .any(|prediction| {
            prediction
                .class_labels()
                .any(|name| label_matches(name, target))
        })
}
