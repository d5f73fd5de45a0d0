#![allow(dead_code)]

use std::io::Cursor;

use foodlens::{
    ClassifierError, FoodClassifier, LabelVocabulary, PreprocessConfig, ScoringBackend,
    FOOD101_CLASSES,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::{Array1, ArrayView4, Axis};

/// Scores classes by the average red level of the input: a uniform image
/// with red value `r` peaks at class `round(r / 255 * (num_classes - 1))`.
#[derive(Debug)]
pub struct RedLevelBackend {
    pub num_classes: usize,
}

impl ScoringBackend for RedLevelBackend {
    fn scores(&self, input: ArrayView4<'_, f32>) -> Result<Array1<f32>, ClassifierError> {
        let config = PreprocessConfig::default();
        let normalized = input.index_axis(Axis(1), 0).mean().unwrap_or(0.0);
        let level = normalized * config.std[0] + config.mean[0];
        let peak = (level * (self.num_classes - 1) as f32).round();
        Ok((0..self.num_classes)
            .map(|i| -(i as f32 - peak).abs())
            .collect())
    }
}

/// Red value whose uniform image the `RedLevelBackend` assigns to `index`.
pub fn red_level_for(index: usize, num_classes: usize) -> u8 {
    (index as f32 * 255.0 / (num_classes - 1) as f32).round() as u8
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn solid_png(red: u8, width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([red, 40, 90])));
    encode(&image, ImageFormat::Png)
}

/// Classifier over the Food-101 labels with the `RedLevelBackend`.
pub fn red_level_classifier() -> FoodClassifier {
    FoodClassifier::builder()
        .with_builtin_labels()
        .unwrap()
        .with_backend(RedLevelBackend { num_classes: FOOD101_CLASSES })
        .unwrap()
        .build()
        .expect("Failed to create classifier")
}

pub fn food101() -> LabelVocabulary {
    LabelVocabulary::food101()
}

pub fn label_png(label: &str) -> Vec<u8> {
    let index = food101().index_of(label).unwrap();
    solid_png(red_level_for(index, FOOD101_CLASSES), 300, 200)
}
