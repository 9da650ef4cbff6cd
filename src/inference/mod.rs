//! Inference module: single-example prediction and dataset evaluation.

pub mod evaluate;
pub mod predictor;

pub use evaluate::{evaluate_files, evaluate_packed, EvaluationReport};
pub use predictor::{Prediction, Predictor};
