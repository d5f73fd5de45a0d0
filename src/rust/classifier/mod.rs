mod error;
mod backend;
mod classifier;
pub mod builder;
pub mod preprocess;
mod utils;

pub use error::ClassifierError;
pub use backend::{OnnxBackend, ScoringBackend};
pub use classifier::{FoodClassifier, FoodPrediction};
pub use builder::FoodClassifierBuilder;
pub use preprocess::{PreprocessConfig, Preprocessor, INPUT_SIZE};

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierInfo {
    /// Path to the ONNX weights file, if loaded from disk
    pub model_path: Option<String>,
    /// Path to the label list, if loaded from disk
    pub labels_path: Option<String>,
    /// Number of classes the model distinguishes
    pub num_classes: usize,
    /// Network input resolution as (height, width)
    pub input_size: (usize, usize),
    /// Number of labels with their own nutrient entry
    pub nutrient_entries: usize,
}
