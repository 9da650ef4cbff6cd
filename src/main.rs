//! Command-line entry point for the transfer-learning pipeline.
//!
//! Training mode scans a labeled image directory, packs every image into an
//! embedding dataset, trains a classifier head on it, saves the resulting
//! artifact, and reports per-class accuracy over the training set. With
//! `--skip_training` the saved artifact is loaded and evaluated against the
//! images on disk instead.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::module::AutodiffModule;
use clap::Parser;
use colored::Colorize;
use tracing::info;

use retrain::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use retrain::dataset::packer::pack_dataset;
use retrain::dataset::sources::{scan_image_sources, total_images};
use retrain::inference::evaluate::{evaluate_files, evaluate_packed};
use retrain::model::artifact::ClassifierArtifact;
use retrain::model::backbone::{ConvEmbedderConfig, ImageEmbedder};
use retrain::model::head::ClassifierHeadConfig;
use retrain::training::trainer::train_classifier;
use retrain::training::TrainingConfig;
use retrain::utils::logging::{init_logging, LogConfig};

#[derive(Parser, Debug)]
#[command(
    name = "retrain",
    version,
    about = "Train an image classifier head on top of a frozen embedding backbone"
)]
struct Cli {
    /// Directory with one subdirectory of images per label
    #[arg(long = "images_dir")]
    images_dir: PathBuf,

    /// Directory to write (or read) the saved classifier artifact
    #[arg(long = "model_dir")]
    model_dir: PathBuf,

    /// Load a previously saved classifier and evaluate it instead of training
    #[arg(long = "skip_training", default_value_t = false)]
    skip_training: bool,

    /// Batch size as a fraction of the whole dataset
    #[arg(long = "batch_size_fraction", default_value_t = 0.4)]
    batch_size_fraction: f64,

    /// Hidden layer width of the classifier head
    #[arg(long = "dense_units", default_value_t = 100)]
    dense_units: usize,

    /// Number of training epochs
    #[arg(long = "epochs", default_value_t = 50)]
    epochs: usize,

    /// Adam learning rate
    #[arg(long = "learning_rate", default_value_t = 0.0001)]
    learning_rate: f64,

    /// Fraction of rows withheld from gradient updates for validation
    #[arg(long = "validation_split", default_value_t = 0.15)]
    validation_split: f64,

    /// Random seed for shuffling and head initialization
    #[arg(long = "seed", default_value_t = 42)]
    seed: u64,

    /// Semicolon-separated label names to leave out of the dataset
    #[arg(long = "labels_to_skip", default_value = "")]
    labels_to_skip: String,

    /// Enable debug-level logging
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn skip_labels(&self) -> Vec<String> {
        self.labels_to_skip
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            batch_size_fraction: self.batch_size_fraction,
            dense_units: self.dense_units,
            epochs: self.epochs,
            learning_rate: self.learning_rate,
            validation_split: self.validation_split,
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    init_logging(&log_config).map_err(|e| anyhow::anyhow!("failed to set up logging: {e}"))?;

    println!("{}", "=== Image Classifier Retraining ===".cyan().bold());
    println!("Backend: {}", backend_name().green());
    println!("Images:  {}", cli.images_dir.display());
    println!("Model:   {}", cli.model_dir.display());

    if cli.skip_training {
        evaluate_saved(&cli)
    } else {
        train_and_save(&cli)
    }
}

fn train_and_save(cli: &Cli) -> Result<()> {
    let device = default_device();
    let config = cli.training_config();

    let skip = cli.skip_labels();
    let groups = scan_image_sources(&cli.images_dir, &skip)
        .context("failed to scan image directory")?;
    info!(
        classes = groups.len(),
        images = total_images(&groups),
        "scanned image sources"
    );

    let embedder = ConvEmbedderConfig::new().init::<DefaultBackend>(&device);
    let packed = pack_dataset(&groups, &embedder).context("failed to pack embedding dataset")?;
    println!(
        "Packed {} embeddings across {} classes",
        packed.len(),
        packed.num_classes()
    );

    println!("\n{}", "Training classifier head...".cyan());
    let (model, history) = train_classifier::<TrainingBackend, _>(
        &packed,
        &config,
        &device,
        |status| {
            if status.batch + 1 == status.num_batches {
                println!(
                    "Epoch {:>3}/{} Loss: {:.5}",
                    status.epoch + 1,
                    config.epochs,
                    status.loss
                );
            }
        },
    )
    .context("training failed")?;

    if let Some(loss) = history.final_loss() {
        println!("{} final loss {:.5}", "Training complete,".green(), loss);
    }

    let head_config = ClassifierHeadConfig::new(packed.embedding_dim, packed.num_classes())
        .with_dense_units(config.dense_units);
    let artifact = ClassifierArtifact::new(model.valid(), packed.labels.clone(), head_config)
        .context("failed to assemble classifier artifact")?;
    artifact
        .save(&cli.model_dir)
        .context("failed to save classifier artifact")?;
    println!("Saved model to {}", cli.model_dir.display());

    let report = evaluate_packed(&artifact, &packed, &device)
        .context("failed to evaluate on the training set")?;
    report.print();

    Ok(())
}

fn evaluate_saved(cli: &Cli) -> Result<()> {
    let device = default_device();

    let artifact = ClassifierArtifact::<DefaultBackend>::load(&cli.model_dir, &device)
        .context("failed to load classifier artifact")?;
    println!(
        "Loaded classifier with {} labels: {}",
        artifact.labels.len(),
        artifact.labels.join(", ")
    );

    let skip = cli.skip_labels();
    let groups = scan_image_sources(&cli.images_dir, &skip)
        .context("failed to scan image directory")?;

    let embedder = ConvEmbedderConfig::new().init::<DefaultBackend>(&device);
    if embedder.embedding_dim() != artifact.config.embedding_dim {
        anyhow::bail!(
            "saved classifier expects embedding dim {} but backbone produces {}",
            artifact.config.embedding_dim,
            embedder.embedding_dim()
        );
    }

    let report = evaluate_files(&artifact, &embedder, &groups, &device)
        .context("evaluation failed")?;
    report.print();

    Ok(())
}
