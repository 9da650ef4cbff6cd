//! End-to-end pipeline test: scan, pack, train, save, reload, predict.

use std::path::Path;

use burn::module::AutodiffModule;
use image::{Rgb, RgbImage};
use serde_json::Value;
use tempfile::TempDir;

use retrain::backend::{default_device, DefaultBackend, TrainingBackend};
use retrain::dataset::packer::pack_dataset;
use retrain::dataset::sources::scan_image_sources;
use retrain::inference::evaluate::evaluate_packed;
use retrain::inference::predictor::Predictor;
use retrain::model::artifact::ClassifierArtifact;
use retrain::model::backbone::ConvEmbedderConfig;
use retrain::model::head::ClassifierHeadConfig;
use retrain::training::trainer::train_classifier;
use retrain::training::TrainingConfig;

/// Write `count` solid-color JPEGs under `dir/label/`.
fn write_class_images(dir: &Path, label: &str, color: Rgb<u8>, count: usize) {
    let class_dir = dir.join(label);
    std::fs::create_dir_all(&class_dir).unwrap();
    for i in 0..count {
        let mut image = RgbImage::new(32, 32);
        for pixel in image.pixels_mut() {
            // Small per-image offset so the files are not byte-identical.
            *pixel = Rgb([
                color[0].saturating_add(i as u8),
                color[1].saturating_add(i as u8),
                color[2],
            ]);
        }
        image.save(class_dir.join(format!("img_{i}.jpg"))).unwrap();
    }
}

#[test]
fn test_full_pipeline_train_save_reload_predict() {
    let images = TempDir::new().unwrap();
    let model_dir = TempDir::new().unwrap();
    write_class_images(images.path(), "cats", Rgb([200, 40, 40]), 5);
    write_class_images(images.path(), "dogs", Rgb([40, 40, 200]), 5);

    let device = default_device();

    // Scan and pack through a small backbone.
    let groups = scan_image_sources(images.path(), &[]).unwrap();
    assert_eq!(groups.len(), 2);
    let embedder = ConvEmbedderConfig::new()
        .with_base_filters(2)
        .init::<DefaultBackend>(&device);
    let packed = pack_dataset(&groups, &embedder).unwrap();
    assert_eq!(packed.len(), 10);
    assert_eq!(packed.num_classes(), 2);
    assert_eq!(packed.one_hot.len(), 10 * 2);
    assert!(packed.failures.is_empty());

    // Train: 10 rows at fraction 0.4 gives batches of 4.
    let config = TrainingConfig {
        batch_size_fraction: 0.4,
        dense_units: 8,
        epochs: 3,
        learning_rate: 0.01,
        validation_split: 0.15,
        seed: 42,
    };
    let mut batches_seen = 0usize;
    let (model, history) =
        train_classifier::<TrainingBackend, _>(&packed, &config, &device, |_| {
            batches_seen += 1;
        })
        .unwrap();
    assert_eq!(history.train_losses.len(), 3);
    assert!(batches_seen > 0);
    assert!(history.final_loss().unwrap().is_finite());

    // Save the artifact and check the on-disk label manifest.
    let head_config = ClassifierHeadConfig::new(packed.embedding_dim, packed.num_classes())
        .with_dense_units(config.dense_units);
    let artifact =
        ClassifierArtifact::new(model.valid(), packed.labels.clone(), head_config).unwrap();
    artifact.save(model_dir.path()).unwrap();

    assert!(model_dir.path().join("classifier.mpk").exists());
    assert!(model_dir.path().join("classifier.json").exists());
    let manifest: Value = serde_json::from_str(
        &std::fs::read_to_string(model_dir.path().join("labels.json")).unwrap(),
    )
    .unwrap();
    let saved_labels: Vec<String> = manifest["Labels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert_eq!(saved_labels, packed.labels);

    // Evaluation over the packed rows covers every example.
    let report = evaluate_packed(&artifact, &packed, &device).unwrap();
    assert_eq!(report.total(), 10);
    assert_eq!(report.correct() + report.mislabeled.len(), 10);

    // Reload and check predictions survive the round trip.
    let reloaded =
        ClassifierArtifact::<DefaultBackend>::load(model_dir.path(), &device).unwrap();
    assert_eq!(reloaded.labels, packed.labels);

    let before = Predictor::new(&artifact, &embedder, device.clone()).unwrap();
    let after = Predictor::new(&reloaded, &embedder, device.clone()).unwrap();
    for row in [0usize, 5] {
        let a = before.predict_embedding(packed.row(row)).unwrap();
        let b = after.predict_embedding(packed.row(row)).unwrap();
        assert_eq!(a.label, b.label);
        assert!((a.confidence - b.confidence).abs() < 1e-5);
    }
}

#[test]
fn test_degenerate_batch_size_is_rejected() {
    let images = TempDir::new().unwrap();
    write_class_images(images.path(), "cats", Rgb([200, 40, 40]), 1);
    write_class_images(images.path(), "dogs", Rgb([40, 40, 200]), 1);

    let device = default_device();
    let groups = scan_image_sources(images.path(), &[]).unwrap();
    let embedder = ConvEmbedderConfig::new()
        .with_base_filters(2)
        .init::<DefaultBackend>(&device);
    let packed = pack_dataset(&groups, &embedder).unwrap();

    // floor(2 * 0.1) = 0, which is not a usable batch size.
    let config = TrainingConfig {
        batch_size_fraction: 0.1,
        epochs: 1,
        ..Default::default()
    };
    let result = train_classifier::<TrainingBackend, _>(&packed, &config, &device, |_| {});
    assert!(result.is_err());
}
