//! Backend abstraction - CPU ndarray backend
//!
//! The embedding pass and training both run on the same single-threaded CPU
//! backend; training additionally wraps it in autodiff.

use burn::backend::ndarray::{NdArray, NdArrayDevice};
use burn::backend::Autodiff;

/// The default inference backend.
pub type DefaultBackend = NdArray<f32>;

/// The default autodiff backend for training.
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Get the default device.
pub fn default_device() -> NdArrayDevice {
    NdArrayDevice::Cpu
}

/// Get a human-readable name for the current backend.
pub fn backend_name() -> &'static str {
    "ndarray (CPU)"
}
