//! Classifier head
//!
//! The only trainable parameters in the whole system: a two-layer dense
//! network mapping a backbone embedding to per-class probabilities.

use burn::{
    config::Config,
    module::Module,
    nn::{Linear, LinearConfig, Relu},
    tensor::{backend::Backend, Tensor},
};

/// Configuration for the classifier head
#[derive(Config, Debug)]
pub struct ClassifierHeadConfig {
    /// Backbone embedding dimension (input width)
    pub embedding_dim: usize,

    /// Hidden layer width
    #[config(default = "100")]
    pub dense_units: usize,

    /// Number of output classes
    pub num_classes: usize,
}

impl ClassifierHeadConfig {
    /// Initialize the head on the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ClassifierHead<B> {
        ClassifierHead {
            fc1: LinearConfig::new(self.embedding_dim, self.dense_units).init(device),
            fc2: LinearConfig::new(self.dense_units, self.num_classes)
                .with_bias(false)
                .init(device),
            num_classes: self.num_classes,
        }
    }
}

/// Two-layer classifier head: Linear + ReLU + Linear.
///
/// `forward` yields logits for the loss; `forward_probs` applies softmax for
/// inference.
#[derive(Module, Debug)]
pub struct ClassifierHead<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    num_classes: usize,
}

impl<B: Backend> ClassifierHead<B> {
    /// Forward pass producing logits of shape `[batch_size, num_classes]`.
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.fc1.forward(x);
        let x = Relu::new().forward(x);
        self.fc2.forward(x)
    }

    /// Forward pass with softmax for inference.
    pub fn forward_probs(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Number of output classes (the one-hot width this head was built for).
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}
