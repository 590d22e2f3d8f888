//! Page image normalization before recognition.

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, Luma};
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::PreprocessConfig;

/// Turns raw page bytes into the image bytes handed to a recognizer.
pub trait PagePreprocessor: Send + Sync {
    /// Normalize one page image.
    fn preprocess(&self, image_bytes: &[u8]) -> Result<Vec<u8>, OcrError>;
}

/// Resize, grayscale, contrast and binarize a scanned page.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    /// Width every page is resized to.
    target_width: u32,
    /// Contrast multiplier.
    contrast: f32,
    /// Brightness offset.
    brightness: f32,
    /// Binarization cutoff.
    threshold: u8,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self::from_config(&PreprocessConfig::default())
    }

    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self {
            target_width: config.target_width.max(1),
            contrast: config.contrast,
            brightness: config.brightness,
            threshold: config.threshold,
        }
    }

    /// Set the target width.
    pub fn with_target_width(mut self, width: u32) -> Self {
        self.target_width = width.max(1);
        self
    }

    /// Set the binarization cutoff.
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Normalize a decoded image into a black-and-white page.
    pub fn normalize(&self, image: &DynamicImage) -> GrayImage {
        let (width, height) = image.dimensions();
        let (new_width, new_height) = self.calculate_resize_dimensions(width, height);
        debug!(
            "Normalizing page {}x{} -> {}x{}",
            width, height, new_width, new_height
        );

        let resized = image.resize_exact(
            new_width,
            new_height,
            image::imageops::FilterType::Lanczos3,
        );
        let mut gray = resized.to_luma8();

        for pixel in gray.pixels_mut() {
            let adjusted = pixel[0] as f32 * self.contrast + self.brightness;
            let clamped = adjusted.clamp(0.0, 255.0) as u8;
            let output = if clamped >= self.threshold { 255 } else { 0 };
            *pixel = Luma([output]);
        }

        gray
    }

    fn calculate_resize_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        if width == 0 || height == 0 {
            return (self.target_width, 1);
        }

        let scale = self.target_width as f32 / width as f32;
        let new_height = (height as f32 * scale).round() as u32;

        (self.target_width, new_height.max(1))
    }
}

impl PagePreprocessor for ImagePreprocessor {
    fn preprocess(&self, image_bytes: &[u8]) -> Result<Vec<u8>, OcrError> {
        let image = image::load_from_memory(image_bytes)?;
        let normalized = self.normalize(&image);

        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(normalized).write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}
