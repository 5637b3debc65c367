//! Core type definitions shared across the crate

use serde::{Deserialize, Serialize};

/// Prediction result containing label and decision value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted class label (+1 or -1)
    pub label: f64,
    /// Raw decision function value
    pub decision_value: f64,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(label: f64, decision_value: f64) -> Self {
        Self {
            label,
            decision_value,
        }
    }

    /// Get confidence as absolute value of decision value
    pub fn confidence(&self) -> f64 {
        self.decision_value.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_creation() {
        let pred = Prediction::new(1.0, 2.5);
        assert_eq!(pred.label, 1.0);
        assert_eq!(pred.decision_value, 2.5);
    }

    #[test]
    fn test_prediction_confidence() {
        let pred = Prediction::new(-1.0, -0.75);
        assert_eq!(pred.confidence(), 0.75);

        let pred = Prediction::new(1.0, 3.0);
        assert_eq!(pred.confidence(), 3.0);
    }
}
