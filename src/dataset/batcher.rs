//! Burn batcher for packed embedding rows.
//!
//! Assembles minibatch tensors from embedding items during training: a 2D
//! float tensor of embeddings and a 1D integer tensor of label indices.

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use burn::tensor::{ElementConversion, TensorData};

/// One embedding row ready for batching.
#[derive(Debug, Clone)]
pub struct EmbeddingItem {
    /// Embedding vector (backbone output)
    pub embedding: Vec<f32>,
    /// Label index
    pub label: usize,
}

/// A minibatch of embeddings and targets.
#[derive(Debug, Clone)]
pub struct EmbeddingBatch<B: Backend> {
    /// Embeddings, shape `[batch_size, embedding_dim]`
    pub embeddings: Tensor<B, 2>,
    /// Label indices, shape `[batch_size]`
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher that stacks embedding items into tensors on a fixed device.
#[derive(Debug, Clone)]
pub struct EmbeddingBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> EmbeddingBatcher<B> {
    /// Create a batcher for the given device.
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<EmbeddingItem, EmbeddingBatch<B>> for EmbeddingBatcher<B> {
    fn batch(&self, items: Vec<EmbeddingItem>) -> EmbeddingBatch<B> {
        let embeddings = items
            .iter()
            .map(|item| {
                let dim = item.embedding.len();
                Tensor::<B, 2>::from_data(
                    TensorData::new(item.embedding.clone(), [1, dim]),
                    &self.device,
                )
            })
            .collect();

        let targets = items
            .iter()
            .map(|item| {
                Tensor::<B, 1, Int>::from_data([(item.label as i64).elem::<B::IntElem>()], &self.device)
            })
            .collect();

        EmbeddingBatch {
            embeddings: Tensor::cat(embeddings, 0),
            targets: Tensor::cat(targets, 0),
        }
    }
}
