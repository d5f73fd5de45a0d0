use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use ndarray::ArrayView4;
use serde::{Deserialize, Serialize};

use super::backend::ScoringBackend;
use super::error::ClassifierError;
use super::preprocess::Preprocessor;
use super::utils::argmax;
use crate::{LabelVocabulary, NutrientFacts, NutrientTable};

/// Serializable form of a classification result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodPrediction {
    pub food: String,
    pub nutrients: NutrientFacts,
}

impl From<(String, NutrientFacts)> for FoodPrediction {
    fn from((food, nutrients): (String, NutrientFacts)) -> Self {
        Self { food, nutrients }
    }
}

/// A thread-safe food image classifier with nutrient lookup.
///
/// # Thread Safety
///
/// This type is `Send + Sync`: the backend, vocabulary and nutrient table are
/// immutable after construction and shared through `Arc`. Wrap the classifier
/// in an `Arc` to serve concurrent requests; no call takes a lock.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use foodlens::FoodClassifier;
/// use std::sync::Arc;
/// use std::thread;
///
/// let classifier = Arc::new(FoodClassifier::initialize(
///     "model/model.onnx",
///     "food-101/meta/classes.txt",
/// )?);
///
/// let classifier_clone = Arc::clone(&classifier);
/// thread::spawn(move || {
///     let (food, nutrients) = classifier_clone.classify_path("lunch.jpg").unwrap();
///     println!("{}: {}", food, nutrients.calories);
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FoodClassifier {
    pub model_path: Option<String>,
    pub labels_path: Option<String>,
    pub(crate) backend: Arc<dyn ScoringBackend>,
    pub(crate) vocabulary: LabelVocabulary,
    pub(crate) nutrients: Arc<NutrientTable>,
    pub(crate) preprocessor: Preprocessor,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<FoodClassifier>();
    }
};

impl FoodClassifier {
    /// Creates a new FoodClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::FoodClassifierBuilder {
        super::builder::FoodClassifierBuilder::new()
    }

    /// Loads the weights and label list and returns a classifier ready to serve.
    ///
    /// Any error here is a startup failure; the classifier is never returned
    /// in a partially loaded state.
    pub fn initialize<P: AsRef<Path>, Q: AsRef<Path>>(
        weights_path: P,
        labels_path: Q,
    ) -> Result<Self, ClassifierError> {
        Self::builder()
            .with_labels(labels_path)?
            .with_model(weights_path)?
            .build()
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> super::ClassifierInfo {
        super::ClassifierInfo {
            model_path: self.model_path.clone(),
            labels_path: self.labels_path.clone(),
            num_classes: self.vocabulary.len(),
            input_size: (self.preprocessor.config.height, self.preprocessor.config.width),
            nutrient_entries: self.nutrients.len(),
        }
    }

    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    pub fn nutrient_table(&self) -> &NutrientTable {
        &self.nutrients
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Classifies encoded image bytes (JPEG, PNG, GIF, ...).
    ///
    /// # Errors
    /// - `ImageError` if the bytes cannot be decoded
    /// - `PredictionError` if the model fails or returns the wrong number of scores
    ///
    /// # Example
    /// ```no_run
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let classifier = foodlens::FoodClassifier::initialize("model/model.onnx", "classes.txt")?;
    /// let bytes = std::fs::read("upload.png")?;
    /// match classifier.classify_bytes(&bytes) {
    ///     Ok((food, nutrients)) => println!("{}: {:?}", food, nutrients),
    ///     Err(e) if e.is_invalid_input() => println!("Please upload a valid image"),
    ///     Err(e) => return Err(e.into()),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<(String, NutrientFacts), ClassifierError> {
        let image = self.preprocessor.decode(bytes)?;
        self.classify_image(&image)
    }

    /// Reads and classifies an image file. An unreadable file is an `ImageError`.
    pub fn classify_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(String, NutrientFacts), ClassifierError> {
        let image = self.preprocessor.open(path.as_ref())?;
        self.classify_image(&image)
    }

    /// Classifies an already decoded image.
    pub fn classify_image(
        &self,
        image: &DynamicImage,
    ) -> Result<(String, NutrientFacts), ClassifierError> {
        let tensor = self.preprocessor.preprocess(image);
        let label = self.predict_label(tensor.view())?;
        let nutrients = self.nutrients.lookup(&label).clone();
        log::debug!("Classified image as '{}'", label);
        Ok((label, nutrients))
    }

    /// Runs the model on a preprocessed `[1, 3, H, W]` tensor and returns the
    /// highest-scoring label. NaN scores are ignored unless every score is NaN,
    /// in which case the first label is returned.
    pub fn predict_label(&self, input: ArrayView4<'_, f32>) -> Result<String, ClassifierError> {
        let (batch, channels, h, w) = input.dim();
        let expected = (self.preprocessor.config.height, self.preprocessor.config.width);
        if batch != 1 || channels != 3 || (h, w) != expected {
            return Err(ClassifierError::ValidationError(format!(
                "Input tensor has shape {:?}, expected [1, 3, {}, {}]",
                input.shape(),
                expected.0,
                expected.1
            )));
        }

        let scores = self.backend.scores(input)?;
        if scores.len() != self.vocabulary.len() {
            return Err(ClassifierError::PredictionError(format!(
                "Model returned {} scores for {} labels",
                scores.len(),
                self.vocabulary.len()
            )));
        }

        // Every score is NaN: the first class wins, as a plain max over the row would.
        let index = match argmax(&scores.to_vec()) {
            Some((index, _)) => index,
            None => {
                log::warn!("Model returned only NaN scores, falling back to the first class");
                0
            }
        };
        self.vocabulary
            .get(index)
            .map(str::to_string)
            .ok_or_else(|| ClassifierError::PredictionError(format!("Class index {} out of range", index)))
    }

    /// Same as [`classify_bytes`](Self::classify_bytes) but returns the serializable form.
    pub fn predict(&self, bytes: &[u8]) -> Result<FoodPrediction, ClassifierError> {
        self.classify_bytes(bytes).map(FoodPrediction::from)
    }
}
