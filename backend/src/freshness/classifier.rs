use crate::config::ModelConfig;
use crate::error::PipelineError;
use crate::imaging::PreprocessedTensor;

/// Binary freshness model. Returns the probability that the food is spoiled.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &PreprocessedTensor) -> Result<f32, PipelineError>;
}

pub(crate) fn validate_score(score: f32) -> Result<f32, PipelineError> {
    if score.is_finite() && (0.0..=1.0).contains(&score) {
        Ok(score)
    } else {
        Err(PipelineError::Inference(format!(
            "classifier returned out-of-range score {}",
            score
        )))
    }
}

#[cfg(feature = "torch")]
pub use self::torch::TorchClassifier;

#[cfg(feature = "torch")]
mod torch {
    use std::path::Path;
    use std::sync::Mutex;

    use tch::{CModule, Device, Kind, Tensor};

    use super::{validate_score, Classifier};
    use crate::error::PipelineError;
    use crate::imaging::PreprocessedTensor;

    /// TorchScript export of the freshness network.
    pub struct TorchClassifier {
        model: Mutex<CModule>,
        device: Device,
    }

    impl TorchClassifier {
        pub fn load(model_path: &Path) -> Result<Self, PipelineError> {
            let device = Device::cuda_if_available();
            let model = CModule::load_on_device(model_path, device).map_err(|e| {
                PipelineError::Inference(format!(
                    "failed to load model {}: {}",
                    model_path.display(),
                    e
                ))
            })?;
            log::info!("Loaded classifier {} on {:?}", model_path.display(), device);
            Ok(Self {
                model: Mutex::new(model),
                device,
            })
        }
    }

    impl Classifier for TorchClassifier {
        fn predict(&self, input: &PreprocessedTensor) -> Result<f32, PipelineError> {
            let array = input.as_array();
            let shape: Vec<i64> = array.shape().iter().map(|d| *d as i64).collect();
            let values = array
                .as_slice()
                .ok_or_else(|| PipelineError::Inference("tensor is not contiguous".into()))?;
            let tensor = Tensor::from_slice(values).view(shape.as_slice()).to_device(self.device);

            let model = self
                .model
                .lock()
                .map_err(|_| PipelineError::Inference("model lock poisoned".into()))?;
            let output = tch::no_grad(|| model.forward_ts(&[tensor]))
                .map_err(|e| PipelineError::Inference(e.to_string()))?;

            let scores: Vec<f32> = output
                .to_kind(Kind::Float)
                .view([-1])
                .try_into()
                .map_err(|e: tch::TchError| PipelineError::Inference(e.to_string()))?;
            let score = scores
                .first()
                .copied()
                .ok_or_else(|| PipelineError::Inference("model produced no output".into()))?;
            validate_score(score)
        }
    }
}

/// Builds the classifier backend selected at compile time.
pub fn load_classifier(config: &ModelConfig) -> Result<std::sync::Arc<dyn Classifier>, PipelineError> {
    #[cfg(feature = "torch")]
    {
        let classifier = TorchClassifier::load(&config.path)?;
        Ok(std::sync::Arc::new(classifier))
    }
    #[cfg(not(feature = "torch"))]
    {
        Err(PipelineError::Inference(format!(
            "cannot load {}: freshscan was built without the `torch` feature",
            config.path.display()
        )))
    }
}
