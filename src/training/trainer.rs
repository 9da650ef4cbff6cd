//! Minibatch training loop
//!
//! Fits a classifier head on a packed dataset: a seeded uniform permutation
//! decouples minibatch composition from the directory-traversal order (which
//! clusters each class together), a validation fraction of the shuffled rows
//! is withheld from gradient updates, and Adam drives cross-entropy descent
//! over the rest. Per-batch loss is surfaced through a caller-supplied
//! callback; per-epoch losses are returned as the training history.

use burn::{
    data::dataloader::batcher::Batcher,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::dataset::batcher::{EmbeddingBatch, EmbeddingBatcher};
use crate::dataset::packer::PackedDataset;
use crate::model::head::{ClassifierHead, ClassifierHeadConfig};
use crate::training::TrainingConfig;
use crate::utils::error::{PipelineError, Result};

/// Progress of one training batch, handed to the status callback.
#[derive(Debug, Clone)]
pub struct BatchStatus {
    /// Epoch index (0-based)
    pub epoch: usize,
    /// Batch index within the epoch (0-based)
    pub batch: usize,
    /// Number of batches per epoch
    pub num_batches: usize,
    /// Cross-entropy loss of this batch
    pub loss: f64,
}

/// Per-epoch loss history of one training run.
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    /// Average training loss per epoch
    pub train_losses: Vec<f64>,
    /// Average validation loss per epoch (empty when validation_split is 0)
    pub val_losses: Vec<f64>,
}

impl TrainingHistory {
    /// Final training loss, if any epochs ran.
    pub fn final_loss(&self) -> Option<f64> {
        self.train_losses.last().copied()
    }
}

/// Train a classifier head on `dataset` with the given configuration.
///
/// Returns the trained head together with its loss history. Fails with
/// [`PipelineError::Config`] on a degenerate batch size and
/// [`PipelineError::Training`] when the loss goes non-finite.
pub fn train_classifier<B, F>(
    dataset: &PackedDataset,
    config: &TrainingConfig,
    device: &B::Device,
    mut on_batch: F,
) -> Result<(ClassifierHead<B>, TrainingHistory)>
where
    B: AutodiffBackend,
    F: FnMut(&BatchStatus),
{
    config.validate()?;
    if dataset.is_empty() {
        return Err(PipelineError::EmptyDataset(
            "cannot train on an empty dataset".to_string(),
        ));
    }

    let total_rows = dataset.len();
    let batch_size = config.batch_size(total_rows)?;

    // Seeded head initialization keeps runs reproducible end to end.
    B::seed(config.seed);
    let head_config = ClassifierHeadConfig::new(dataset.embedding_dim, dataset.num_classes())
        .with_dense_units(config.dense_units);
    let mut model = head_config.init::<B>(device);
    let mut optimizer = AdamConfig::new().init();

    // One uniformly-random permutation over all rows; the validation holdout
    // is the tail of this permutation, so it is class-mixed too.
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut permutation: Vec<usize> = (0..total_rows).collect();
    permutation.shuffle(&mut rng);

    let val_count = (total_rows as f64 * config.validation_split).floor() as usize;
    let split = total_rows - val_count;
    let (train_rows, val_rows) = permutation.split_at(split);
    let mut train_rows = train_rows.to_vec();

    info!(
        "Training on {} rows ({} validation), batch size {}, {} epochs",
        train_rows.len(),
        val_count,
        batch_size,
        config.epochs
    );

    let batcher = EmbeddingBatcher::<B>::new(device.clone());
    let inner_batcher = EmbeddingBatcher::<B::InnerBackend>::new(device.clone());
    let mut history = TrainingHistory::default();

    for epoch in 0..config.epochs {
        // Fresh batch composition every epoch
        train_rows.shuffle(&mut rng);
        let num_batches = (train_rows.len() + batch_size - 1) / batch_size;

        let mut epoch_loss = 0.0f64;
        for (batch_idx, chunk) in train_rows.chunks(batch_size).enumerate() {
            let items = chunk.iter().map(|&row| dataset.item(row)).collect();
            let batch: EmbeddingBatch<B> = batcher.batch(items);

            let output = model.forward(batch.embeddings);
            let loss = CrossEntropyLossConfig::new()
                .init(&output.device())
                .forward(output, batch.targets);

            let loss_value: f64 = loss.clone().into_scalar().elem();
            if !loss_value.is_finite() {
                return Err(PipelineError::Training(format!(
                    "non-finite loss {} at epoch {}, batch {}",
                    loss_value,
                    epoch + 1,
                    batch_idx + 1
                )));
            }
            epoch_loss += loss_value;

            on_batch(&BatchStatus {
                epoch,
                batch: batch_idx,
                num_batches,
                loss: loss_value,
            });

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(config.learning_rate, model, grads);
        }

        let avg_loss = epoch_loss / num_batches.max(1) as f64;
        history.train_losses.push(avg_loss);

        if val_count > 0 {
            let val_loss =
                validation_loss::<B>(&model, dataset, val_rows, &inner_batcher, batch_size);
            history.val_losses.push(val_loss);
            debug!(
                "Epoch {}/{}: loss = {:.5}, val_loss = {:.5}",
                epoch + 1,
                config.epochs,
                avg_loss,
                val_loss
            );
        } else {
            debug!("Epoch {}/{}: loss = {:.5}", epoch + 1, config.epochs, avg_loss);
        }
    }

    Ok((model, history))
}

/// Average cross-entropy loss over the withheld rows, without gradients.
fn validation_loss<B: AutodiffBackend>(
    model: &ClassifierHead<B>,
    dataset: &PackedDataset,
    val_rows: &[usize],
    batcher: &EmbeddingBatcher<B::InnerBackend>,
    batch_size: usize,
) -> f64 {
    let inner_model = model.valid();
    let mut total = 0.0f64;
    let mut batches = 0usize;

    for chunk in val_rows.chunks(batch_size) {
        let items = chunk.iter().map(|&row| dataset.item(row)).collect();
        let batch: EmbeddingBatch<B::InnerBackend> = batcher.batch(items);

        let output = inner_model.forward(batch.embeddings);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output, batch.targets);

        let loss_value: f64 = loss.into_scalar().elem();
        total += loss_value;
        batches += 1;
    }

    total / batches.max(1) as f64
}
