use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum FreshnessLabel {
    Fresh,
    Spoiled,
}

/// Score at or above which an item is reported as spoiled.
pub const SPOILED_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: FreshnessLabel,
    /// Percentage in `[50, 100]`.
    pub confidence: f64,
}

impl Prediction {
    /// Maps the classifier's spoiled-probability to a label and confidence.
    pub fn from_score(score: f32) -> Self {
        let score = f64::from(score);
        if score < f64::from(SPOILED_THRESHOLD) {
            Self {
                label: FreshnessLabel::Fresh,
                confidence: (1.0 - score) * 100.0,
            }
        } else {
            Self {
                label: FreshnessLabel::Spoiled,
                confidence: score * 100.0,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryResponse {
    pub extracted_text: String,
    pub expiry_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebcamRequest {
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_scores_are_fresh() {
        let prediction = Prediction::from_score(0.2);
        assert_eq!(prediction.label, FreshnessLabel::Fresh);
        assert!((prediction.confidence - 80.0).abs() < 1e-4);
    }

    #[test]
    fn threshold_is_spoiled() {
        let prediction = Prediction::from_score(0.5);
        assert_eq!(prediction.label, FreshnessLabel::Spoiled);
        assert!((prediction.confidence - 50.0).abs() < 1e-4);
    }

    #[test]
    fn confidence_stays_within_bounds() {
        for step in 0..=100 {
            let score = step as f32 / 100.0;
            let prediction = Prediction::from_score(score);
            assert!(prediction.confidence >= 50.0 - 1e-4, "score {score}");
            assert!(prediction.confidence <= 100.0 + 1e-4, "score {score}");
        }
    }

    #[test]
    fn label_serializes_as_plain_name() {
        let json = serde_json::to_value(Prediction::from_score(0.9)).unwrap();
        assert_eq!(json["label"], "Spoiled");
        assert_eq!(FreshnessLabel::Fresh.to_string(), "Fresh");
    }
}
