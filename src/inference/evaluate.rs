//! Dataset Evaluation
//!
//! Scores a trained classifier against labeled data and reports per-class
//! accuracy plus the individual examples the model got wrong. Two entry
//! points: one over an already packed embedding dataset (cheap, reuses the
//! training-time embeddings) and one over raw image files on disk.

use std::path::PathBuf;

use burn::prelude::*;
use burn::tensor::TensorData;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dataset::decode::decode_image;
use crate::dataset::packer::PackedDataset;
use crate::dataset::sources::LabelGroup;
use crate::inference::predictor::top_prediction;
use crate::model::artifact::ClassifierArtifact;
use crate::model::backbone::ImageEmbedder;
use crate::utils::error::{PipelineError, Result};

/// Accuracy counts for a single class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassReport {
    pub label: String,
    pub total: usize,
    pub correct: usize,
}

impl ClassReport {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// A single misclassified example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mislabeled {
    pub path: PathBuf,
    pub actual: String,
    pub predicted: String,
    pub confidence: f32,
}

/// Per-class accuracy table plus the full list of misclassified examples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub classes: Vec<ClassReport>,
    pub mislabeled: Vec<Mislabeled>,
    /// Files that could not be decoded and were left out of the counts
    pub skipped: usize,
}

impl EvaluationReport {
    pub fn total(&self) -> usize {
        self.classes.iter().map(|c| c.total).sum()
    }

    pub fn correct(&self) -> usize {
        self.classes.iter().map(|c| c.correct).sum()
    }

    /// Overall accuracy across every evaluated example.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.correct() as f64 / total as f64
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print(&self) {
        println!("\n{}", "=== Evaluation Report ===".cyan().bold());
        for class in &self.classes {
            let line = format!(
                "  {:<24} {:>4}/{:<4} ({:.1}%)",
                class.label,
                class.correct,
                class.total,
                class.accuracy() * 100.0
            );
            if class.correct == class.total {
                println!("{}", line.green());
            } else {
                println!("{}", line.yellow());
            }
        }
        println!(
            "  {:<24} {:>4}/{:<4} ({:.1}%)",
            "overall".bold(),
            self.correct(),
            self.total(),
            self.accuracy() * 100.0
        );
        if self.skipped > 0 {
            println!("  {} unreadable files skipped", self.skipped);
        }
        if !self.mislabeled.is_empty() {
            println!("\n{}", "Mislabeled examples:".red().bold());
            for miss in &self.mislabeled {
                println!(
                    "  {} actual={} predicted={} ({:.1}%)",
                    miss.path.display(),
                    miss.actual,
                    miss.predicted,
                    miss.confidence * 100.0
                );
            }
        }
    }
}

/// Evaluate a classifier over an already packed embedding dataset.
///
/// Runs every row through the head in a single forward pass.
pub fn evaluate_packed<B: Backend>(
    artifact: &ClassifierArtifact<B>,
    dataset: &PackedDataset,
    device: &B::Device,
) -> Result<EvaluationReport> {
    if dataset.is_empty() {
        return Err(PipelineError::EmptyDataset(
            "cannot evaluate an empty dataset".to_string(),
        ));
    }
    if dataset.embedding_dim != artifact.config.embedding_dim {
        return Err(PipelineError::Config(format!(
            "dataset embedding dim {} does not match classifier input dim {}",
            dataset.embedding_dim, artifact.config.embedding_dim
        )));
    }
    if dataset.labels != artifact.labels {
        return Err(PipelineError::Config(format!(
            "dataset labels {:?} do not match classifier labels {:?}",
            dataset.labels, artifact.labels
        )));
    }

    let rows = dataset.len();
    let input = Tensor::<B, 2>::from_data(
        TensorData::new(
            dataset.embeddings.clone(),
            [rows, dataset.embedding_dim],
        ),
        device,
    );
    let probs: Vec<f32> = artifact
        .model
        .forward_probs(input)
        .into_data()
        .to_vec()
        .map_err(|e| PipelineError::Training(format!("failed to read probabilities: {:?}", e)))?;

    let num_classes = artifact.labels.len();
    let mut classes: Vec<ClassReport> = artifact
        .labels
        .iter()
        .map(|label| ClassReport {
            label: label.clone(),
            total: 0,
            correct: 0,
        })
        .collect();
    let mut mislabeled = Vec::new();

    for (row, row_probs) in probs.chunks(num_classes).enumerate() {
        let actual = dataset.label_indices[row];
        let prediction = top_prediction(row_probs, &artifact.labels);
        classes[actual].total += 1;
        if prediction.class_index == actual {
            classes[actual].correct += 1;
        } else {
            mislabeled.push(Mislabeled {
                path: dataset.sources[row].clone(),
                actual: artifact.labels[actual].clone(),
                predicted: prediction.label,
                confidence: prediction.confidence,
            });
        }
    }

    Ok(EvaluationReport {
        classes,
        mislabeled,
        skipped: 0,
    })
}

/// Evaluate a classifier over raw image files, one group per label.
///
/// Files that fail to decode are skipped with a warning and excluded from
/// the accuracy counts. Groups whose label the classifier does not know are
/// skipped entirely.
pub fn evaluate_files<B: Backend>(
    artifact: &ClassifierArtifact<B>,
    embedder: &dyn ImageEmbedder,
    groups: &[LabelGroup],
    device: &B::Device,
) -> Result<EvaluationReport> {
    use crate::inference::predictor::Predictor;

    let predictor = Predictor::new(artifact, embedder, device.clone())?;

    let mut classes = Vec::new();
    let mut mislabeled = Vec::new();
    let mut skipped = 0;

    for group in groups {
        if !artifact.labels.contains(&group.label) {
            warn!(label = %group.label, "label unknown to classifier, skipping group");
            continue;
        }

        let mut report = ClassReport {
            label: group.label.clone(),
            total: 0,
            correct: 0,
        };

        for path in &group.image_files {
            let image = match decode_image(path) {
                Ok(image) => image,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable image");
                    skipped += 1;
                    continue;
                }
            };
            let prediction = predictor.predict_image(&image)?;
            report.total += 1;
            if prediction.label == group.label {
                report.correct += 1;
            } else {
                mislabeled.push(Mislabeled {
                    path: path.clone(),
                    actual: group.label.clone(),
                    predicted: prediction.label,
                    confidence: prediction.confidence,
                });
            }
        }

        classes.push(report);
    }

    if classes.iter().all(|c| c.total == 0) {
        return Err(PipelineError::EmptyDataset(
            "no readable images found for evaluation".to_string(),
        ));
    }

    Ok(EvaluationReport {
        classes,
        mislabeled,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{default_device, DefaultBackend};
    use crate::model::head::ClassifierHeadConfig;

    fn make_artifact(dim: usize, labels: &[&str]) -> ClassifierArtifact<DefaultBackend> {
        let device = default_device();
        let config = ClassifierHeadConfig::new(dim, labels.len()).with_dense_units(4);
        ClassifierArtifact::new(
            config.init::<DefaultBackend>(&device),
            labels.iter().map(|s| s.to_string()).collect(),
            config,
        )
        .unwrap()
    }

    fn make_packed(dim: usize, labels: &[&str], rows_per_class: usize) -> PackedDataset {
        let mut embeddings = Vec::new();
        let mut label_indices = Vec::new();
        for (class, _) in labels.iter().enumerate() {
            for row in 0..rows_per_class {
                embeddings.extend((0..dim).map(|i| (class * 10 + row + i) as f32 * 0.01));
                label_indices.push(class);
            }
        }
        PackedDataset::from_parts(
            embeddings,
            label_indices,
            labels.iter().map(|s| s.to_string()).collect(),
            dim,
        )
        .unwrap()
    }

    #[test]
    fn test_class_report_accuracy() {
        let report = ClassReport {
            label: "cat".to_string(),
            total: 4,
            correct: 3,
        };
        assert!((report.accuracy() - 0.75).abs() < 1e-9);

        let empty = ClassReport {
            label: "dog".to_string(),
            total: 0,
            correct: 0,
        };
        assert_eq!(empty.accuracy(), 0.0);
    }

    #[test]
    fn test_evaluate_packed_counts_every_row() {
        let device = default_device();
        let artifact = make_artifact(8, &["cat", "dog"]);
        let dataset = make_packed(8, &["cat", "dog"], 3);

        let report = evaluate_packed(&artifact, &dataset, &device).unwrap();
        assert_eq!(report.total(), 6);
        assert_eq!(report.classes.len(), 2);
        assert_eq!(report.classes[0].total, 3);
        assert_eq!(report.classes[1].total, 3);
        assert_eq!(
            report.correct() + report.mislabeled.len(),
            report.total()
        );
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn test_evaluate_packed_rejects_dim_mismatch() {
        let device = default_device();
        let artifact = make_artifact(8, &["cat", "dog"]);
        let dataset = make_packed(4, &["cat", "dog"], 2);

        let result = evaluate_packed(&artifact, &dataset, &device);
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_evaluate_packed_rejects_label_mismatch() {
        let device = default_device();
        let artifact = make_artifact(8, &["cat", "dog"]);
        let dataset = make_packed(8, &["dog", "cat"], 2);

        let result = evaluate_packed(&artifact, &dataset, &device);
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
