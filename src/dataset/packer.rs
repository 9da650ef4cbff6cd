//! Dataset Packer
//!
//! Streams every (label, image) pair through the frozen backbone exactly once
//! and packs the resulting fixed-length embeddings into one contiguous f32
//! matrix with a parallel label-index array. Both buffers are preallocated
//! from the image count and the backbone's embedding dimension before the
//! pass, and filled by offset-indexed writes; nothing grows or reallocates
//! mid-pass.
//!
//! Images are processed strictly sequentially: each decode + embed + write
//! cycle completes before the next begins, so the backbone's per-call
//! temporaries bound peak memory regardless of dataset size.
//!
//! Unreadable images do not abort the pass: each failure is recorded with its
//! path, the row is skipped, and the final row count shrinks accordingly. No
//! row in the finished dataset is ever left uninitialized.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::dataset::batcher::EmbeddingItem;
use crate::dataset::decode::decode_image;
use crate::dataset::sources::LabelGroup;
use crate::model::backbone::ImageEmbedder;
use crate::utils::error::{PipelineError, Result};
use crate::utils::logging::ProgressLogger;

/// A per-file packing failure, attributable to its source image.
#[derive(Debug, Clone)]
pub struct PackFailure {
    /// Path of the image that could not be processed
    pub path: PathBuf,
    /// Human-readable reason
    pub reason: String,
}

/// The packed training dataset: a contiguous embedding matrix and aligned
/// label data.
///
/// Row `i` of the embedding matrix, `label_indices[i]`, row `i` of the
/// one-hot matrix, and `sources[i]` all refer to the same image. Row order is
/// the flattened traversal order of the label groups and their files.
#[derive(Debug, Clone)]
pub struct PackedDataset {
    /// Row-major embedding matrix, `len * embedding_dim` values
    pub embeddings: Vec<f32>,
    /// Label index per row
    pub label_indices: Vec<usize>,
    /// Row-major one-hot label matrix, `len * num_classes` values
    pub one_hot: Vec<f32>,
    /// Source image path per row
    pub sources: Vec<PathBuf>,
    /// Ordered label names; position = label index = one-hot column
    pub labels: Vec<String>,
    /// Embedding vector length (backbone output size)
    pub embedding_dim: usize,
    /// Images that failed to decode and were skipped
    pub failures: Vec<PackFailure>,
}

impl PackedDataset {
    /// Number of packed rows.
    pub fn len(&self) -> usize {
        self.label_indices.len()
    }

    /// Check if the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.label_indices.is_empty()
    }

    /// Number of classes (one-hot width).
    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    /// Embedding row `i` as a slice.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.embeddings[i * self.embedding_dim..(i + 1) * self.embedding_dim]
    }

    /// One-hot row `i` as a slice.
    pub fn one_hot_row(&self, i: usize) -> &[f32] {
        let k = self.num_classes();
        &self.one_hot[i * k..(i + 1) * k]
    }

    /// Row `i` as a batcher item (copies the embedding row).
    pub fn item(&self, i: usize) -> EmbeddingItem {
        EmbeddingItem {
            embedding: self.row(i).to_vec(),
            label: self.label_indices[i],
        }
    }

    /// Build a dataset from precomputed embedding rows.
    ///
    /// `embeddings` is row-major with `embedding_dim` values per row and must
    /// align with `label_indices`. Source paths are left empty.
    pub fn from_parts(
        embeddings: Vec<f32>,
        label_indices: Vec<usize>,
        labels: Vec<String>,
        embedding_dim: usize,
    ) -> Result<Self> {
        if embedding_dim == 0 || embeddings.len() != label_indices.len() * embedding_dim {
            return Err(PipelineError::Config(format!(
                "embedding buffer of {} values does not match {} rows of dim {}",
                embeddings.len(),
                label_indices.len(),
                embedding_dim
            )));
        }
        let num_classes = labels.len();
        if num_classes == 0 || label_indices.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "precomputed dataset has no rows or no classes".to_string(),
            ));
        }
        if let Some(&bad) = label_indices.iter().find(|&&l| l >= num_classes) {
            return Err(PipelineError::Config(format!(
                "label index {} out of range for {} classes",
                bad, num_classes
            )));
        }

        let one_hot = build_one_hot(&label_indices, num_classes);
        let sources = vec![PathBuf::new(); label_indices.len()];
        Ok(Self {
            embeddings,
            label_indices,
            one_hot,
            sources,
            labels,
            embedding_dim,
            failures: Vec::new(),
        })
    }
}

/// Pack all images under `groups` into a [`PackedDataset`] using `embedder`.
///
/// Fails with [`PipelineError::EmptyDataset`] when there are zero groups,
/// zero images, or every image fails to decode.
pub fn pack_dataset(groups: &[LabelGroup], embedder: &dyn ImageEmbedder) -> Result<PackedDataset> {
    let num_classes = groups.len();
    let total_images: usize = groups.iter().map(|g| g.len()).sum();
    if num_classes == 0 || total_images == 0 {
        return Err(PipelineError::EmptyDataset(format!(
            "{} classes, {} images",
            num_classes, total_images
        )));
    }

    // The embedding dimension is queried once, before allocation; the buffers
    // never grow during the pass.
    let dim = embedder.embedding_dim();
    let mut embeddings = vec![0.0f32; total_images * dim];
    let mut label_indices = vec![0usize; total_images];
    let mut sources = Vec::with_capacity(total_images);
    let mut failures = Vec::new();

    info!(
        "Packing {} images across {} classes (embedding dim {})",
        total_images, num_classes, dim
    );
    let mut progress = ProgressLogger::new("Packing embeddings", total_images);

    let mut offset = 0usize;
    for (label_index, group) in groups.iter().enumerate() {
        for path in &group.image_files {
            progress.step();
            let tensor = match decode_image(path) {
                Ok(t) => t,
                Err(e) => {
                    warn!("Skipping unreadable image {:?}: {}", path, e);
                    failures.push(PackFailure {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            // The embedding tensor and any backbone temporaries are dropped
            // before the next image is decoded.
            let embedding = embedder.embed(&tensor)?;
            if embedding.len() != dim {
                return Err(PipelineError::Config(format!(
                    "backbone returned {} values, expected embedding dim {}",
                    embedding.len(),
                    dim
                )));
            }

            embeddings[offset * dim..(offset + 1) * dim].copy_from_slice(&embedding);
            label_indices[offset] = label_index;
            sources.push(path.clone());
            offset += 1;
        }
    }
    progress.finish();

    if offset == 0 {
        return Err(PipelineError::EmptyDataset(format!(
            "all {} images failed to decode",
            total_images
        )));
    }

    // Shrink to the rows actually written; every remaining row is initialized.
    embeddings.truncate(offset * dim);
    label_indices.truncate(offset);

    if !failures.is_empty() {
        warn!(
            "Packed {}/{} images; {} skipped",
            offset,
            total_images,
            failures.len()
        );
    }

    let one_hot = build_one_hot(&label_indices, num_classes);
    let labels = groups.iter().map(|g| g.label.clone()).collect();

    Ok(PackedDataset {
        embeddings,
        label_indices,
        one_hot,
        sources,
        labels,
        embedding_dim: dim,
        failures,
    })
}

/// Convert a label-index array into a row-major one-hot matrix.
fn build_one_hot(label_indices: &[usize], num_classes: usize) -> Vec<f32> {
    let mut one_hot = vec![0.0f32; label_indices.len() * num_classes];
    for (row, &label) in label_indices.iter().enumerate() {
        one_hot[row * num_classes + label] = 1.0;
    }
    one_hot
}
