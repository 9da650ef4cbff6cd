//! Embedding backbone
//!
//! The backbone is a frozen convolutional feature extractor: it turns a
//! canonical 224x224 image tensor into a fixed-length embedding vector and is
//! never updated by training. The pipeline only depends on the
//! [`ImageEmbedder`] trait; [`ConvEmbedder`] is the production implementation.
//!
//! The backbone's weights are initialized from a fixed seed so that
//! embeddings are identical across processes. A classifier head trained
//! against these embeddings in one run must keep predicting correctly after
//! being reloaded in another.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor, TensorData},
};

use crate::dataset::decode::ImageTensor;
use crate::utils::error::PipelineError;
use crate::{CHANNELS, IMAGE_SIZE};

/// Fixed seed for backbone weight initialization.
pub const BACKBONE_SEED: u64 = 0x5eed_f00d;

/// Capability boundary for embedding extraction.
///
/// `embedding_dim` is fixed for the lifetime of an embedder and is queried
/// once, at startup, to size the packing buffers. `embed` must not accumulate
/// state across calls; each invocation's temporaries are scoped and released
/// before it returns.
pub trait ImageEmbedder {
    /// Length of the embedding vector this backbone produces.
    fn embedding_dim(&self) -> usize;

    /// Compute the embedding for one canonical image tensor.
    fn embed(&self, image: &ImageTensor) -> crate::utils::error::Result<Vec<f32>>;
}

/// Configuration for the convolutional embedding backbone
#[derive(Config, Debug)]
pub struct ConvEmbedderConfig {
    /// Base number of convolutional filters; the embedding dimension is
    /// `base_filters * 8`
    #[config(default = "16")]
    pub base_filters: usize,
}

impl ConvEmbedderConfig {
    /// Embedding dimension this configuration produces.
    pub fn embedding_dim(&self) -> usize {
        self.base_filters * 8
    }

    /// Initialize a frozen backbone on the given device.
    ///
    /// Seeds the backend RNG with [`BACKBONE_SEED`] first, so every process
    /// builds the same weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvEmbedder<B> {
        B::seed(BACKBONE_SEED);
        let base = self.base_filters;

        ConvEmbedder {
            conv1: EmbedBlock::new(CHANNELS, base, device),
            conv2: EmbedBlock::new(base, base * 2, device),
            conv3: EmbedBlock::new(base * 2, base * 4, device),
            conv4: EmbedBlock::new(base * 4, base * 8, device),
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dim: base * 8,
        }
    }
}

/// A conv block: Conv2d, ReLU, 2x2 MaxPool.
#[derive(Module, Debug)]
pub struct EmbedBlock<B: Backend> {
    conv: Conv2d<B>,
    relu: Relu,
    pool: MaxPool2d,
}

impl<B: Backend> EmbedBlock<B> {
    fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Self {
            conv,
            relu: Relu::new(),
            pool,
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Frozen convolutional backbone
///
/// Architecture: four conv blocks with doubling filter counts, then global
/// average pooling down to a `base_filters * 8` vector. Only the forward pass
/// is ever used; no gradients flow through it.
#[derive(Module, Debug)]
pub struct ConvEmbedder<B: Backend> {
    conv1: EmbedBlock<B>,
    conv2: EmbedBlock<B>,
    conv3: EmbedBlock<B>,
    conv4: EmbedBlock<B>,
    global_pool: AdaptiveAvgPool2d,
    dim: usize,
}

impl<B: Backend> ConvEmbedder<B> {
    /// Forward pass: `[batch, 3, H, W]` images to `[batch, dim]` embeddings.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);

        // [B, C, H, W] -> [B, C, 1, 1] -> [B, C]
        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        x.reshape([batch_size, channels])
    }
}

impl<B: Backend> ImageEmbedder for ConvEmbedder<B> {
    fn embedding_dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, image: &ImageTensor) -> crate::utils::error::Result<Vec<f32>> {
        let device = self
            .devices()
            .into_iter()
            .next()
            .unwrap_or_else(Default::default);

        // All intermediate tensors live only within this call.
        let input = Tensor::<B, 4>::from_data(
            TensorData::new(image.data.clone(), [1, CHANNELS, IMAGE_SIZE, IMAGE_SIZE]),
            &device,
        );
        let output = self.forward(input);

        output
            .into_data()
            .to_vec()
            .map_err(|e| PipelineError::Training(format!("failed to read embedding: {:?}", e)))
    }
}
