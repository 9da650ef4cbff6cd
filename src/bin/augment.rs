//! Offline dataset augmentation.
//!
//! Writes mirrored and brightness-shifted copies of every labeled image into
//! `flipped/` and `brightness/` subdirectories next to the originals, where
//! the training scan picks them up as extra examples of the same label.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use image::{imageops, DynamicImage, ImageReader, Rgb, RgbImage};
use tracing::{info, warn};

use retrain::dataset::sources::scan_image_sources;
use retrain::utils::logging::{init_logging, LogConfig};

#[derive(Parser, Debug)]
#[command(
    name = "augment",
    version,
    about = "Write flipped and brightness-adjusted copies of a labeled image set"
)]
struct Cli {
    /// Directory with one subdirectory of images per label
    #[arg(long = "images_dir")]
    images_dir: PathBuf,

    /// Semicolon-separated label names to leave untouched
    #[arg(long = "labels_to_skip", default_value = "")]
    labels_to_skip: String,

    /// Write horizontally, vertically, and doubly mirrored copies
    #[arg(long = "flip_images", default_value_t = false)]
    flip_images: bool,

    /// Write brightened and darkened copies
    #[arg(long = "adjust_brightness", default_value_t = false)]
    adjust_brightness: bool,

    /// Brightness scale delta: copies are scaled by (1 + delta) and (1 - delta)
    #[arg(long = "brightness_delta", default_value_t = 0.2)]
    brightness_delta: f32,

    /// Enable debug-level logging
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    init_logging(&log_config).map_err(|e| anyhow::anyhow!("failed to set up logging: {e}"))?;

    if !cli.flip_images && !cli.adjust_brightness {
        anyhow::bail!("nothing to do: pass --flip_images and/or --adjust_brightness");
    }
    if !(cli.brightness_delta > 0.0 && cli.brightness_delta < 1.0) {
        anyhow::bail!(
            "brightness_delta must be in (0, 1), got {}",
            cli.brightness_delta
        );
    }

    let skip: Vec<String> = cli
        .labels_to_skip
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let groups = scan_image_sources(&cli.images_dir, &skip)
        .context("failed to scan image directory")?;

    let mut written = 0usize;
    for group in &groups {
        let label_dir = cli.images_dir.join(&group.label);
        // Only augment originals, not previously generated copies.
        let originals: Vec<&PathBuf> = group
            .image_files
            .iter()
            .filter(|p| p.parent() == Some(label_dir.as_path()))
            .collect();
        info!(label = %group.label, images = originals.len(), "augmenting");

        for path in originals {
            let image = match ImageReader::open(path).and_then(|r| {
                r.decode()
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            }) {
                Ok(image) => image.to_rgb8(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable image");
                    continue;
                }
            };
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("image");

            if cli.flip_images {
                written += write_flips(&image, &label_dir, stem)?;
            }
            if cli.adjust_brightness {
                written += write_brightness(&image, &label_dir, stem, cli.brightness_delta)?;
            }
        }
    }

    println!("{} {} augmented images written", "Done:".green().bold(), written);
    Ok(())
}

/// Mirror horizontally, vertically, and both ways.
fn write_flips(image: &RgbImage, label_dir: &Path, stem: &str) -> Result<usize> {
    let out_dir = label_dir.join("flipped");
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let variants = [
        (imageops::flip_horizontal(image), format!("{stem}_m_x.jpg")),
        (imageops::flip_vertical(image), format!("{stem}_m_y.jpg")),
        (
            imageops::flip_vertical(&imageops::flip_horizontal(image)),
            format!("{stem}_m_xy.jpg"),
        ),
    ];
    for (flipped, name) in variants {
        save_jpeg(flipped, &out_dir.join(name))?;
    }
    Ok(3)
}

/// Scale pixel values by (1 + delta) and (1 - delta), clamped to [0, 255].
fn write_brightness(image: &RgbImage, label_dir: &Path, stem: &str, delta: f32) -> Result<usize> {
    let out_dir = label_dir.join("brightness");
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let variants = [
        (1.0 + delta, format!("{stem}_b.jpg")),
        (1.0 - delta, format!("{stem}_d.jpg")),
    ];
    for (scale, name) in variants {
        save_jpeg(scale_brightness(image, scale), &out_dir.join(name))?;
    }
    Ok(2)
}

fn scale_brightness(image: &RgbImage, scale: f32) -> RgbImage {
    let mut out = RgbImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let scaled = Rgb([
            (pixel[0] as f32 * scale).clamp(0.0, 255.0) as u8,
            (pixel[1] as f32 * scale).clamp(0.0, 255.0) as u8,
            (pixel[2] as f32 * scale).clamp(0.0, 255.0) as u8,
        ]);
        out.put_pixel(x, y, scaled);
    }
    out
}

fn save_jpeg(image: RgbImage, path: &Path) -> Result<()> {
    DynamicImage::ImageRgb8(image)
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_brightness_clamps() {
        let mut image = RgbImage::new(1, 1);
        image.put_pixel(0, 0, Rgb([200, 100, 0]));

        let brighter = scale_brightness(&image, 1.5);
        assert_eq!(brighter.get_pixel(0, 0), &Rgb([255, 150, 0]));

        let darker = scale_brightness(&image, 0.5);
        assert_eq!(darker.get_pixel(0, 0), &Rgb([100, 50, 0]));
    }
}
