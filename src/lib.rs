//! # retrain
//!
//! A command-line transfer-learning pipeline for image classification.
//! Images are organized on disk as `images_dir/<label>/*.jpg`; each image is
//! pushed through a frozen convolutional backbone once, and the resulting
//! embedding vectors are packed into a contiguous dataset on which a small
//! classifier head is trained.
//!
//! ## Modules
//!
//! - `dataset`: directory enumeration, image decoding, and embedding packing
//! - `model`: the frozen embedding backbone, the classifier head, and the
//!   persisted artifact (weights + label list)
//! - `training`: minibatch training loop over a packed dataset
//! - `inference`: single-example prediction and per-class evaluation
//! - `utils`: error types and logging helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use retrain::backend::{default_device, DefaultBackend};
//! use retrain::dataset::{pack_dataset, scan_image_sources};
//! use retrain::model::ConvEmbedderConfig;
//!
//! let groups = scan_image_sources("data/images", &[])?;
//! let embedder = ConvEmbedderConfig::new().init::<DefaultBackend>(&default_device());
//! let packed = pack_dataset(&groups, &embedder)?;
//! // ... training and inference
//! ```

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::batcher::{EmbeddingBatch, EmbeddingBatcher, EmbeddingItem};
pub use dataset::decode::{decode_image, ImageTensor};
pub use dataset::packer::{pack_dataset, PackFailure, PackedDataset};
pub use dataset::sources::{scan_image_sources, LabelGroup};
pub use inference::evaluate::{evaluate_files, evaluate_packed, EvaluationReport};
pub use inference::predictor::{Prediction, Predictor};
pub use model::artifact::ClassifierArtifact;
pub use model::backbone::{ConvEmbedder, ConvEmbedderConfig, ImageEmbedder};
pub use model::head::{ClassifierHead, ClassifierHeadConfig};
pub use training::trainer::{train_classifier, BatchStatus, TrainingHistory};
pub use training::TrainingConfig;
pub use utils::error::{PipelineError, Result};

/// Input resolution required by the embedding backbone (square images).
pub const IMAGE_SIZE: usize = 224;

/// Number of input channels (RGB).
pub const CHANNELS: usize = 3;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
