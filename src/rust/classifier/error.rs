use ort::Error as OrtError;
use std::fmt;

/// Represents the different types of errors that can occur in the food classifier.
///
/// `BuildError`, `ModelError` and `VocabularyError` are raised while the
/// classifier is being constructed and mean the service cannot start.
/// `ImageError` and `PredictionError` are raised per call and leave the
/// classifier usable for subsequent calls.
#[derive(Debug)]
pub enum ClassifierError {
    /// Error occurred while loading or validating the ONNX model
    ModelError(String),
    /// Error occurred while loading the label vocabulary
    VocabularyError(String),
    /// Error occurred during the build phase
    BuildError(String),
    /// The input could not be read or decoded as an image
    ImageError(String),
    /// Error occurred while making predictions
    PredictionError(String),
    /// Error occurred due to invalid input parameters
    ValidationError(String),
}

impl ClassifierError {
    /// Returns true when the error was caused by the caller's image rather
    /// than by the classifier itself.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::ImageError(_))
    }

    /// Returns true for errors that can only happen before the classifier is built.
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::ModelError(_) | Self::VocabularyError(_) | Self::BuildError(_)
        )
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
            Self::VocabularyError(msg) => write!(f, "Vocabulary error: {}", msg),
            Self::BuildError(msg) => write!(f, "Build error: {}", msg),
            Self::ImageError(msg) => write!(f, "Invalid image: {}", msg),
            Self::PredictionError(msg) => write!(f, "Prediction error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::BuildError(err.to_string())
    }
}

impl From<image::ImageError> for ClassifierError {
    fn from(err: image::ImageError) -> Self {
        ClassifierError::ImageError(err.to_string())
    }
}
