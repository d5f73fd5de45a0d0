use std::fs;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::DynamicImage;
use ndarray::Array4;

use super::error::ClassifierError;

/// Side length of the square input the network was fine-tuned on.
pub const INPUT_SIZE: usize = 224;

/// Normalization constants and target resolution for the network input.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub height: usize,
    pub width: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            height: INPUT_SIZE,
            width: INPUT_SIZE,
        }
    }
}

impl PreprocessConfig {
    /// Rejects settings that would turn every tensor into inf/NaN or an empty
    /// array.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.height == 0 || self.width == 0 {
            return Err(ClassifierError::ValidationError(format!(
                "Input size must be nonzero, got {}x{}",
                self.width, self.height
            )));
        }
        for c in 0..3 {
            if !self.mean[c].is_finite() {
                return Err(ClassifierError::ValidationError(format!(
                    "Channel {} mean is not finite: {}",
                    c, self.mean[c]
                )));
            }
            if !self.std[c].is_finite() || self.std[c] <= 0.0 {
                return Err(ClassifierError::ValidationError(format!(
                    "Channel {} std must be positive and finite, got {}",
                    c, self.std[c]
                )));
            }
        }
        Ok(())
    }
}

/// Turns decoded images into `[1, 3, height, width]` NCHW tensors.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    pub config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Decodes an in-memory image, guessing the format from its contents.
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ClassifierError> {
        if bytes.is_empty() {
            return Err(ClassifierError::ImageError("Image data is empty".into()));
        }
        Ok(image::load_from_memory(bytes)?)
    }

    /// Reads and decodes an image file. A missing or unreadable file is
    /// reported the same way as undecodable data.
    pub fn open(&self, path: &Path) -> Result<DynamicImage, ClassifierError> {
        let bytes = fs::read(path).map_err(|e| {
            ClassifierError::ImageError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.decode(&bytes)
    }

    /// Converts an image into the normalized network input.
    ///
    /// The image is forced to 8-bit RGB (alpha is dropped, grayscale and
    /// palette sources are expanded), stretched to the configured size
    /// without preserving aspect ratio, scaled to `[0, 1]` and normalized
    /// per channel with `(x - mean) / std`.
    pub fn preprocess(&self, image: &DynamicImage) -> Array4<f32> {
        let (width, height) = (self.config.width, self.config.height);
        let rgb = image.to_rgb8();
        let resized = if rgb.dimensions() == (width as u32, height as u32) {
            rgb
        } else {
            imageops::resize(&rgb, width as u32, height as u32, FilterType::Triangle)
        };

        let mut tensor = Array4::<f32>::zeros((1, 3, height, width));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                let scaled = pixel[c] as f32 / 255.0;
                tensor[[0, c, y, x]] = (scaled - self.config.mean[c]) / self.config.std[c];
            }
        }
        tensor
    }

    /// Decodes and preprocesses in one step.
    pub fn preprocess_bytes(&self, bytes: &[u8]) -> Result<Array4<f32>, ClassifierError> {
        let image = self.decode(bytes)?;
        Ok(self.preprocess(&image))
    }
}
