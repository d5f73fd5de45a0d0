use std::path::Path;
use std::sync::Arc;

use log::{error, info};
use ndarray::Array4;

use super::backend::{OnnxBackend, ScoringBackend};
use super::classifier::FoodClassifier;
use super::error::ClassifierError;
use super::preprocess::{PreprocessConfig, Preprocessor};
use crate::runtime::RuntimeConfig;
use crate::vocabulary::FOOD101_CLASSES;
use crate::{LabelVocabulary, ModelManager, NutrientTable};

/// A builder for constructing a FoodClassifier with a fluent interface.
///
/// Settings that affect how the model is loaded (`with_runtime_config`,
/// `with_preprocess_config`) must be applied before `with_model`.
#[derive(Debug)]
pub struct FoodClassifierBuilder {
    model_path: Option<String>,
    labels_path: Option<String>,
    backend: Option<Arc<dyn ScoringBackend>>,
    vocabulary: Option<LabelVocabulary>,
    nutrients: NutrientTable,
    num_classes: usize,
    preprocess_config: PreprocessConfig,
    runtime_config: RuntimeConfig,
}

impl Default for FoodClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FoodClassifierBuilder {
    /// Creates a builder expecting the 101 Food-101 classes and the built-in
    /// nutrient table.
    ///
    /// # Example
    /// ```
    /// use foodlens::FoodClassifierBuilder;
    ///
    /// let builder = FoodClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            model_path: None,
            labels_path: None,
            backend: None,
            vocabulary: None,
            nutrients: NutrientTable::builtin(),
            num_classes: FOOD101_CLASSES,
            preprocess_config: PreprocessConfig::default(),
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Sets the runtime configuration for ONNX model execution
    ///
    /// # Example
    /// ```
    /// use foodlens::{FoodClassifierBuilder, RuntimeConfig};
    ///
    /// let builder = FoodClassifierBuilder::new()
    ///     .with_runtime_config(RuntimeConfig::default().with_intra_threads(2));
    /// ```
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    pub fn with_preprocess_config(mut self, config: PreprocessConfig) -> Self {
        self.preprocess_config = config;
        self
    }

    /// Sets the number of classes the model and label list must both have.
    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = num_classes;
        self
    }

    /// Loads the label list from a file with one class name per line.
    ///
    /// # Errors
    /// - `BuildError` if labels were already set
    /// - `VocabularyError` if the file cannot be read or contains empty or duplicate labels
    pub fn with_labels<P: AsRef<Path>>(mut self, labels_path: P) -> Result<Self, ClassifierError> {
        if self.vocabulary.is_some() {
            return Err(ClassifierError::BuildError("Labels already set".to_string()));
        }
        let labels_path = labels_path.as_ref();
        let vocabulary = LabelVocabulary::from_file(labels_path)?;
        self.labels_path = Some(labels_path.to_string_lossy().to_string());
        self.vocabulary = Some(vocabulary);
        Ok(self)
    }

    /// Uses an already loaded vocabulary.
    pub fn with_vocabulary(mut self, vocabulary: LabelVocabulary) -> Result<Self, ClassifierError> {
        if self.vocabulary.is_some() {
            return Err(ClassifierError::BuildError("Labels already set".to_string()));
        }
        self.vocabulary = Some(vocabulary);
        Ok(self)
    }

    /// Uses the Food-101 class list bundled with the crate.
    pub fn with_builtin_labels(self) -> Result<Self, ClassifierError> {
        self.with_vocabulary(LabelVocabulary::food101())
    }

    /// Loads the ONNX weights file.
    ///
    /// # Errors
    /// - `BuildError` if a model was already set or the file does not exist
    /// - `ModelError` if the file is corrupt or its input signature is not `[N, 3, H, W]`
    ///
    /// # Example
    /// ```no_run
    /// use foodlens::FoodClassifierBuilder;
    ///
    /// let builder = FoodClassifierBuilder::new()
    ///     .with_model("model/model.onnx");
    /// ```
    pub fn with_model<P: AsRef<Path>>(mut self, model_path: P) -> Result<Self, ClassifierError> {
        if self.backend.is_some() {
            return Err(ClassifierError::BuildError("Model already set".to_string()));
        }
        self.preprocess_config.validate()?;
        let model_path = model_path.as_ref();
        let backend = OnnxBackend::load(
            model_path,
            &self.runtime_config,
            self.preprocess_config.height,
            self.preprocess_config.width,
        )?;
        info!("Model structure validated successfully");

        self.model_path = Some(model_path.to_string_lossy().to_string());
        self.backend = Some(Arc::new(backend));
        Ok(self)
    }

    /// Loads weights and labels from the locations managed by `manager`.
    pub fn with_model_manager(self, manager: &ModelManager) -> Result<Self, ClassifierError> {
        self.with_labels(manager.get_labels_path())?
            .with_model(manager.get_weights_path())
    }

    /// Uses a custom scoring backend instead of an ONNX file.
    pub fn with_backend<B: ScoringBackend + 'static>(mut self, backend: B) -> Result<Self, ClassifierError> {
        if self.backend.is_some() {
            return Err(ClassifierError::BuildError("Model already set".to_string()));
        }
        self.backend = Some(Arc::new(backend));
        Ok(self)
    }

    /// Replaces the nutrient table.
    pub fn with_nutrients(mut self, table: NutrientTable) -> Self {
        self.nutrients = table;
        self
    }

    /// Loads a nutrient table from JSON. See [`NutrientTable::from_json`].
    pub fn with_nutrients_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ClassifierError> {
        self.nutrients = NutrientTable::from_file(path)?;
        Ok(self)
    }

    /// Builds and returns the final FoodClassifier instance
    ///
    /// # Returns
    /// * `Result<FoodClassifier, ClassifierError>` - The constructed classifier, or an error if:
    ///   - No model or no labels have been set
    ///   - The label count differs from the configured class count
    ///   - The model's output width differs from the label count
    ///   - The class count is zero or the preprocessing config is unusable
    pub fn build(self) -> Result<FoodClassifier, ClassifierError> {
        if self.num_classes == 0 {
            return Err(ClassifierError::ValidationError(
                "Class count must be at least 1".to_string(),
            ));
        }
        self.preprocess_config.validate()?;

        let backend = self
            .backend
            .ok_or_else(|| ClassifierError::BuildError("Model must be set".to_string()))?;
        let vocabulary = self
            .vocabulary
            .ok_or_else(|| ClassifierError::BuildError("Labels must be set".to_string()))?;

        if vocabulary.len() != self.num_classes {
            return Err(ClassifierError::BuildError(format!(
                "Label list has {} entries, expected {}",
                vocabulary.len(),
                self.num_classes
            )));
        }

        if let Some(declared) = backend.declared_output_size() {
            if declared != vocabulary.len() {
                return Err(ClassifierError::ModelError(format!(
                    "Model output has {} classes but the label list has {}",
                    declared,
                    vocabulary.len()
                )));
            }
        }

        Self::probe_output_size(backend.as_ref(), &self.preprocess_config, vocabulary.len())?;

        info!(
            "Food classifier ready: {} classes, {} nutrient entries",
            vocabulary.len(),
            self.nutrients.len()
        );

        Ok(FoodClassifier {
            model_path: self.model_path,
            labels_path: self.labels_path,
            backend,
            vocabulary,
            nutrients: Arc::new(self.nutrients),
            preprocessor: Preprocessor::new(self.preprocess_config),
        })
    }

    /// Runs a blank input through the backend to confirm the output width,
    /// covering models whose output shape is symbolic.
    fn probe_output_size(
        backend: &dyn ScoringBackend,
        config: &PreprocessConfig,
        expected: usize,
    ) -> Result<(), ClassifierError> {
        let blank = Array4::<f32>::zeros((1, 3, config.height, config.width));
        let scores = backend.scores(blank.view()).map_err(|e| {
            error!("Model failed on a blank input: {}", e);
            ClassifierError::ModelError(format!("Model failed on a blank input: {}", e))
        })?;
        if scores.len() != expected {
            return Err(ClassifierError::ModelError(format!(
                "Model produced {} scores but the label list has {}",
                scores.len(),
                expected
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, ArrayView4};

    #[derive(Debug)]
    struct Constant {
        width: usize,
        declared: Option<usize>,
    }

    impl ScoringBackend for Constant {
        fn scores(&self, _input: ArrayView4<'_, f32>) -> Result<Array1<f32>, ClassifierError> {
            Ok(Array1::zeros(self.width))
        }

        fn declared_output_size(&self) -> Option<usize> {
            self.declared
        }
    }

    #[test]
    fn test_build_requires_model_and_labels() {
        let err = FoodClassifierBuilder::new().build().unwrap_err();
        assert!(matches!(err, ClassifierError::BuildError(_)));

        let err = FoodClassifierBuilder::new()
            .with_backend(Constant { width: 101, declared: None })
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, ClassifierError::BuildError(_)));
    }

    #[test]
    fn test_label_count_must_match_class_count() {
        let err = FoodClassifierBuilder::new()
            .with_vocabulary(LabelVocabulary::from_labels(vec!["pizza", "sushi"]).unwrap())
            .unwrap()
            .with_backend(Constant { width: 2, declared: None })
            .unwrap()
            .build()
            .unwrap_err();
        assert!(err.is_startup_failure());
    }

    #[test]
    fn test_declared_output_mismatch() {
        let err = FoodClassifierBuilder::new()
            .with_builtin_labels()
            .unwrap()
            .with_backend(Constant { width: 101, declared: Some(1000) })
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, ClassifierError::ModelError(_)));
    }

    #[test]
    fn test_probed_output_mismatch() {
        let err = FoodClassifierBuilder::new()
            .with_builtin_labels()
            .unwrap()
            .with_backend(Constant { width: 1000, declared: None })
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, ClassifierError::ModelError(_)));
    }

    #[test]
    fn test_duplicate_setters_rejected() {
        let builder = FoodClassifierBuilder::new().with_builtin_labels().unwrap();
        assert!(builder.with_builtin_labels().is_err());

        let builder = FoodClassifierBuilder::new()
            .with_backend(Constant { width: 101, declared: None })
            .unwrap();
        assert!(builder.with_backend(Constant { width: 101, declared: None }).is_err());
    }

    #[test]
    fn test_build_success() {
        let classifier = FoodClassifierBuilder::new()
            .with_builtin_labels()
            .unwrap()
            .with_backend(Constant { width: 101, declared: Some(101) })
            .unwrap()
            .build()
            .unwrap();
        let info = classifier.info();
        assert_eq!(info.num_classes, 101);
        assert_eq!(info.input_size, (224, 224));
        assert_eq!(info.model_path, None);
    }

    fn build_with_config(config: PreprocessConfig) -> Result<FoodClassifier, ClassifierError> {
        FoodClassifierBuilder::new()
            .with_preprocess_config(config)
            .with_builtin_labels()?
            .with_backend(Constant { width: 101, declared: None })?
            .build()
    }

    #[test]
    fn test_zero_std_rejected() {
        let mut config = PreprocessConfig::default();
        config.std[1] = 0.0;
        let err = build_with_config(config).unwrap_err();
        assert!(matches!(err, ClassifierError::ValidationError(_)));

        let mut config = PreprocessConfig::default();
        config.std[2] = -0.2;
        assert!(matches!(build_with_config(config), Err(ClassifierError::ValidationError(_))));
    }

    #[test]
    fn test_non_finite_constants_rejected() {
        let mut config = PreprocessConfig::default();
        config.mean[0] = f32::NAN;
        assert!(matches!(build_with_config(config), Err(ClassifierError::ValidationError(_))));

        let mut config = PreprocessConfig::default();
        config.std[0] = f32::INFINITY;
        assert!(matches!(build_with_config(config), Err(ClassifierError::ValidationError(_))));
    }

    #[test]
    fn test_zero_input_size_rejected() {
        let config = PreprocessConfig { height: 0, width: 0, ..PreprocessConfig::default() };
        let err = build_with_config(config).unwrap_err();
        assert!(matches!(err, ClassifierError::ValidationError(_)));

        let config = PreprocessConfig { width: 0, ..PreprocessConfig::default() };
        assert!(matches!(build_with_config(config), Err(ClassifierError::ValidationError(_))));
    }

    #[test]
    fn test_zero_classes_rejected() {
        let err = FoodClassifierBuilder::new()
            .with_num_classes(0)
            .with_builtin_labels()
            .unwrap()
            .with_backend(Constant { width: 101, declared: None })
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, ClassifierError::ValidationError(_)));
    }

    #[test]
    fn test_custom_valid_config_builds() {
        let config = PreprocessConfig { height: 32, width: 48, ..PreprocessConfig::default() };
        let classifier = build_with_config(config).unwrap();
        assert_eq!(classifier.info().input_size, (32, 48));
        assert_eq!(classifier.preprocessor().config.width, 48);
    }

    #[test]
    fn test_missing_model_is_build_error() {
        let err = FoodClassifierBuilder::new()
            .with_model("/nonexistent/foodlens/model.onnx")
            .unwrap_err();
        assert!(matches!(err, ClassifierError::BuildError(_)));
    }
}
