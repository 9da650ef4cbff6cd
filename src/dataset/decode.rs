//! Tensor Decoder
//!
//! Converts one image file into the canonical fixed-size tensor the backbone
//! expects: 224x224 RGB, CHW layout, values scaled to roughly [-1, 1] with
//! `v / 127 - 1` (the backbone's training distribution).

use std::path::Path;

use image::{imageops::FilterType, ImageReader};

use crate::utils::error::{PipelineError, Result};
use crate::{CHANNELS, IMAGE_SIZE};

/// A decoded, normalized image: CHW f32 data of fixed size.
#[derive(Debug, Clone)]
pub struct ImageTensor {
    /// Flattened CHW pixel data, `CHANNELS * IMAGE_SIZE * IMAGE_SIZE` values
    pub data: Vec<f32>,
}

impl ImageTensor {
    /// Number of values in a canonical image tensor.
    pub const LEN: usize = CHANNELS * IMAGE_SIZE * IMAGE_SIZE;

    /// Wrap raw CHW data, checking the length.
    pub fn from_data(data: Vec<f32>) -> Result<Self> {
        if data.len() != Self::LEN {
            return Err(PipelineError::Config(format!(
                "image tensor must have {} values, got {}",
                Self::LEN,
                data.len()
            )));
        }
        Ok(Self { data })
    }
}

/// Decode an image file into the canonical tensor.
///
/// Resizes to `IMAGE_SIZE` x `IMAGE_SIZE` and normalizes each channel value
/// with `v / 127 - 1`. Fails with an attributable [`PipelineError::Decode`]
/// on unreadable or malformed bytes.
pub fn decode_image<P: AsRef<Path>>(path: P) -> Result<ImageTensor> {
    let path = path.as_ref();

    let img = ImageReader::open(path)
        .map_err(|e| PipelineError::decode(path, e))?
        .decode()
        .map_err(|e| PipelineError::decode(path, e))?;

    let resized = img.resize_exact(IMAGE_SIZE as u32, IMAGE_SIZE as u32, FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let (width, height) = (IMAGE_SIZE, IMAGE_SIZE);
    let mut data = vec![0.0f32; CHANNELS * height * width];

    // CHW layout, normalized to [-1, 1]
    for y in 0..height {
        for x in 0..width {
            let pixel = rgb.get_pixel(x as u32, y as u32);
            for c in 0..CHANNELS {
                data[c * height * width + y * width + x] = pixel[c] as f32 / 127.0 - 1.0;
            }
        }
    }

    Ok(ImageTensor { data })
}
