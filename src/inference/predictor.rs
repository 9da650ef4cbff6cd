//! Inference Predictor
//!
//! Runs a loaded classifier artifact on a single example. The input can be
//! either a precomputed embedding or a raw canonical image tensor; raw images
//! are routed through the embedding backbone first.

use burn::prelude::*;
use burn::tensor::TensorData;
use serde::{Deserialize, Serialize};

use crate::dataset::decode::ImageTensor;
use crate::model::artifact::ClassifierArtifact;
use crate::model::backbone::ImageEmbedder;
use crate::utils::error::{PipelineError, Result};

/// Result of a single prediction: the top-1 class and its raw probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted label name
    pub label: String,
    /// Predicted class index (one-hot column)
    pub class_index: usize,
    /// Raw top-1 probability, not recalibrated
    pub confidence: f32,
}

/// Predictor binding a classifier artifact to an embedding backbone.
pub struct Predictor<'a, B: Backend> {
    artifact: &'a ClassifierArtifact<B>,
    embedder: &'a dyn ImageEmbedder,
    device: B::Device,
}

impl<'a, B: Backend> Predictor<'a, B> {
    /// Create a predictor over a loaded artifact and its backbone.
    ///
    /// Fails with a config error if the backbone's embedding dimension does
    /// not match the one the classifier was trained on.
    pub fn new(
        artifact: &'a ClassifierArtifact<B>,
        embedder: &'a dyn ImageEmbedder,
        device: B::Device,
    ) -> Result<Self> {
        if embedder.embedding_dim() != artifact.config.embedding_dim {
            return Err(PipelineError::Config(format!(
                "backbone embedding dim {} does not match classifier input dim {}",
                embedder.embedding_dim(),
                artifact.config.embedding_dim
            )));
        }
        Ok(Self {
            artifact,
            embedder,
            device,
        })
    }

    /// Predict from a raw canonical image tensor (embeds it first).
    pub fn predict_image(&self, image: &ImageTensor) -> Result<Prediction> {
        let embedding = self.embedder.embed(image)?;
        self.predict_embedding(&embedding)
    }

    /// Predict from a precomputed embedding vector.
    pub fn predict_embedding(&self, embedding: &[f32]) -> Result<Prediction> {
        let dim = self.artifact.config.embedding_dim;
        if embedding.len() != dim {
            return Err(PipelineError::Config(format!(
                "embedding has {} values, expected {}",
                embedding.len(),
                dim
            )));
        }

        let input = Tensor::<B, 2>::from_data(
            TensorData::new(embedding.to_vec(), [1, dim]),
            &self.device,
        );
        let probs = self.artifact.model.forward_probs(input);
        let probs: Vec<f32> = probs
            .into_data()
            .to_vec()
            .map_err(|e| PipelineError::Training(format!("failed to read probabilities: {:?}", e)))?;

        Ok(top_prediction(&probs, &self.artifact.labels))
    }
}

/// Top-1 class from a probability vector.
pub(crate) fn top_prediction(probs: &[f32], labels: &[String]) -> Prediction {
    let (class_index, &confidence) = probs
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or((0, &0.0));

    Prediction {
        label: labels
            .get(class_index)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string()),
        class_index,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{default_device, DefaultBackend};
    use crate::model::backbone::ConvEmbedderConfig;
    use crate::model::head::ClassifierHeadConfig;

    #[test]
    fn test_top_prediction_argmax() {
        let labels = vec!["cat".to_string(), "dog".to_string(), "bird".to_string()];
        let prediction = top_prediction(&[0.1, 0.7, 0.2], &labels);
        assert_eq!(prediction.label, "dog");
        assert_eq!(prediction.class_index, 1);
        assert!((prediction.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_predict_embedding_dim_checked() {
        let device = default_device();
        let embedder_config = ConvEmbedderConfig::new().with_base_filters(2);
        let embedder = embedder_config.init::<DefaultBackend>(&device);
        let dim = embedder.embedding_dim();

        let head_config = ClassifierHeadConfig::new(dim, 2).with_dense_units(4);
        let artifact = ClassifierArtifact::new(
            head_config.init::<DefaultBackend>(&device),
            vec!["a".to_string(), "b".to_string()],
            head_config,
        )
        .unwrap();

        let predictor = Predictor::new(&artifact, &embedder, device).unwrap();
        assert!(predictor.predict_embedding(&vec![0.0; dim]).is_ok());
        assert!(predictor.predict_embedding(&[0.0, 1.0]).is_err());
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let device = default_device();
        let embedder_config = ConvEmbedderConfig::new().with_base_filters(2);
        let embedder = embedder_config.init::<DefaultBackend>(&device);
        let dim = embedder.embedding_dim();

        let head_config = ClassifierHeadConfig::new(dim, 3).with_dense_units(4);
        let artifact = ClassifierArtifact::new(
            head_config.init::<DefaultBackend>(&device),
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            head_config,
        )
        .unwrap();

        let predictor = Predictor::new(&artifact, &embedder, device).unwrap();
        let embedding: Vec<f32> = (0..dim).map(|i| i as f32 / dim as f32).collect();
        let first = predictor.predict_embedding(&embedding).unwrap();
        let second = predictor.predict_embedding(&embedding).unwrap();
        assert_eq!(first.label, second.label);
        assert_eq!(first.confidence, second.confidence);
        assert!(first.confidence > 0.0 && first.confidence <= 1.0);
    }
}
