use std::sync::Arc;

use shared::Prediction;

use super::Classifier;
use crate::error::PipelineError;
use crate::imaging::{self, ImageSource, Preprocessor};

/// Decode, preprocess, classify and format a single image.
#[derive(Clone)]
pub struct FreshnessAnalyzer {
    classifier: Arc<dyn Classifier>,
    preprocessor: Preprocessor,
}

impl FreshnessAnalyzer {
    pub fn new(classifier: Arc<dyn Classifier>, preprocessor: Preprocessor) -> Self {
        Self {
            classifier,
            preprocessor,
        }
    }

    pub fn predict(&self, source: ImageSource) -> Result<Prediction, PipelineError> {
        let image = imaging::decode(source)?;
        let tensor = self.preprocessor.preprocess(&image)?;
        let score = self.classifier.predict(&tensor)?;
        let prediction = Prediction::from_score(score);
        log::debug!(
            "score {:.4} -> {} ({:.1}%)",
            score,
            prediction.label,
            prediction.confidence
        );
        Ok(prediction)
    }

    pub fn predict_base64(&self, payload: &str) -> Result<Prediction, PipelineError> {
        self.predict(ImageSource::Base64(payload.to_string()))
    }
}
