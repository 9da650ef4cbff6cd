//! Model Persistence
//!
//! A trained classifier is only meaningful together with its ordered label
//! list: `labels[i]` names one-hot column `i` from training time. The two are
//! saved and loaded as a unit, with the head configuration alongside so the
//! module can be rebuilt before its weights are restored.
//!
//! On-disk layout inside the artifact directory:
//! - `classifier.mpk`: head weights (burn `CompactRecorder`)
//! - `classifier.json`: head configuration
//! - `labels.json`: `{ "Labels": ["label0", "label1", ...] }`

use std::path::Path;

use burn::config::Config;
use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::head::{ClassifierHead, ClassifierHeadConfig};
use crate::utils::error::{PipelineError, Result};

const WEIGHTS_FILE: &str = "classifier";
const CONFIG_FILE: &str = "classifier.json";
const LABELS_FILE: &str = "labels.json";

/// `labels.json` wire format.
#[derive(Debug, Serialize, Deserialize)]
struct LabelManifest {
    #[serde(rename = "Labels")]
    labels: Vec<String>,
}

/// A trained classifier head plus the label mapping it was trained against.
#[derive(Debug)]
pub struct ClassifierArtifact<B: Backend> {
    /// The trained head
    pub model: ClassifierHead<B>,
    /// Ordered label names; position = one-hot column index
    pub labels: Vec<String>,
    /// Configuration the head was built from
    pub config: ClassifierHeadConfig,
}

impl<B: Backend> ClassifierArtifact<B> {
    /// Bundle a trained head with its labels.
    ///
    /// Fails with [`PipelineError::CorruptArtifact`] if the label count does
    /// not match the head's output width.
    pub fn new(
        model: ClassifierHead<B>,
        labels: Vec<String>,
        config: ClassifierHeadConfig,
    ) -> Result<Self> {
        if labels.len() != model.num_classes() || labels.len() != config.num_classes {
            return Err(PipelineError::CorruptArtifact(format!(
                "{} labels for a classifier with {} outputs",
                labels.len(),
                model.num_classes()
            )));
        }
        Ok(Self {
            model,
            labels,
            config,
        })
    }

    /// Save weights, head config, and label list into `dir`.
    ///
    /// The directory is created if needed; existing artifacts are overwritten
    /// (the write is idempotent).
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        self.model
            .clone()
            .save_file(dir.join(WEIGHTS_FILE), &CompactRecorder::new())
            .map_err(|e| PipelineError::Serialization(format!("failed to save weights: {:?}", e)))?;

        self.config.save(dir.join(CONFIG_FILE))?;

        let manifest = LabelManifest {
            labels: self.labels.clone(),
        };
        std::fs::write(dir.join(LABELS_FILE), serde_json::to_string_pretty(&manifest)?)?;

        info!("Saved classifier artifact to {:?}", dir);
        Ok(())
    }

    /// Load an artifact previously written by [`save`](Self::save).
    ///
    /// Fails with [`PipelineError::NotFound`] if the weights, config, or
    /// label list is missing, and [`PipelineError::CorruptArtifact`] if the
    /// label count disagrees with the classifier output width.
    pub fn load<P: AsRef<Path>>(dir: P, device: &B::Device) -> Result<Self> {
        let dir = dir.as_ref();

        let weights_path = dir.join(format!("{}.mpk", WEIGHTS_FILE));
        if !weights_path.exists() {
            return Err(PipelineError::NotFound(weights_path));
        }
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(PipelineError::NotFound(config_path));
        }
        let labels_path = dir.join(LABELS_FILE);
        if !labels_path.exists() {
            return Err(PipelineError::NotFound(labels_path));
        }

        let config = ClassifierHeadConfig::load(&config_path).map_err(|e| {
            PipelineError::CorruptArtifact(format!("unreadable head config: {:?}", e))
        })?;

        let manifest: LabelManifest = serde_json::from_str(&std::fs::read_to_string(&labels_path)?)?;
        if manifest.labels.len() != config.num_classes {
            return Err(PipelineError::CorruptArtifact(format!(
                "label list has {} entries but classifier outputs {} classes",
                manifest.labels.len(),
                config.num_classes
            )));
        }

        let model = config
            .init::<B>(device)
            .load_file(dir.join(WEIGHTS_FILE), &CompactRecorder::new(), device)
            .map_err(|e| {
                PipelineError::CorruptArtifact(format!("failed to load weights: {:?}", e))
            })?;

        info!("Loaded classifier artifact from {:?}", dir);
        Self::new(model, manifest.labels, config)
    }
}
