//! Model module: the frozen embedding backbone, the trainable classifier
//! head, and the persisted artifact tying weights to their label list.

pub mod artifact;
pub mod backbone;
pub mod head;

// Re-export main types for convenience
pub use artifact::ClassifierArtifact;
pub use backbone::{ConvEmbedder, ConvEmbedderConfig, ImageEmbedder, BACKBONE_SEED};
pub use head::{ClassifierHead, ClassifierHeadConfig};
