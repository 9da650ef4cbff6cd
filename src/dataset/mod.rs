//! Dataset module: enumeration, decoding, and embedding packing.
//!
//! The pipeline discovers labeled images on disk (one immediate subdirectory
//! per class label), decodes each image to a canonical tensor, runs it through
//! the frozen backbone, and packs the resulting embedding vectors into one
//! contiguous matrix with a parallel label array.

pub mod batcher;
pub mod decode;
pub mod packer;
pub mod sources;

// Re-export main types for convenience
pub use batcher::{EmbeddingBatch, EmbeddingBatcher, EmbeddingItem};
pub use decode::{decode_image, ImageTensor};
pub use packer::{pack_dataset, PackFailure, PackedDataset};
pub use sources::{scan_image_sources, LabelGroup};

/// File extensions accepted as images.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Check whether a path has an accepted image extension (case-insensitive).
pub fn is_image_file(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("a/b/photo.jpg")));
        assert!(is_image_file(Path::new("a/b/PHOTO.JPG")));
        assert!(is_image_file(Path::new("a/b/photo.png")));
        assert!(!is_image_file(Path::new("a/b/notes.txt")));
        assert!(!is_image_file(Path::new("a/b/no_extension")));
    }
}
