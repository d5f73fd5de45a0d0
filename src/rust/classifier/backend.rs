use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use ndarray::{Array1, ArrayView4};
use ort::session::Session;
use ort::value::{Tensor, ValueType};

use super::error::ClassifierError;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Produces raw class scores for a preprocessed image.
///
/// Implementations must be usable from many threads at once through a shared
/// reference; a call never changes the model.
pub trait ScoringBackend: Send + Sync + fmt::Debug {
    /// Raw (unnormalized) scores for a single `[1, 3, height, width]` input,
    /// one per class.
    fn scores(&self, input: ArrayView4<'_, f32>) -> Result<Array1<f32>, ClassifierError>;

    /// Number of scores per image if the model declares it statically.
    fn declared_output_size(&self) -> Option<usize> {
        None
    }
}

/// ONNX Runtime session holding the fine-tuned network.
///
/// The graph is expected to be an export of the classifier in evaluation
/// mode:
/// - One float input of shape `[batch, 3, height, width]` (batch may be dynamic)
/// - One output of shape `[batch, num_classes]` holding raw logits
pub struct OnnxBackend {
    session: Session,
    input_name: String,
    output_size: Option<usize>,
}

impl fmt::Debug for OnnxBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxBackend")
            .field("input_name", &self.input_name)
            .field("output_size", &self.output_size)
            .finish()
    }
}

impl OnnxBackend {
    /// Loads and validates a model for `height` x `width` inputs.
    ///
    /// # Errors
    /// - `BuildError` if the file does not exist
    /// - `ModelError` if the file cannot be parsed as a model
    /// - `ModelError` if the input or output signature does not fit an image classifier
    pub fn load(
        model_path: &Path,
        config: &RuntimeConfig,
        height: usize,
        width: usize,
    ) -> Result<Self, ClassifierError> {
        if !model_path.exists() {
            return Err(ClassifierError::BuildError(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let session = create_session_builder(config)?
            .commit_from_file(model_path)
            .map_err(|e| {
                log::error!("Failed to load model from {:?}: {}", model_path, e);
                ClassifierError::ModelError(format!(
                    "Failed to load model {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        let (input_name, output_size) = Self::validate_model(&session, height, width)?;
        log::info!(
            "Model loaded from {:?} (input '{}', declared classes: {:?})",
            model_path,
            input_name,
            output_size
        );

        Ok(Self {
            session,
            input_name,
            output_size,
        })
    }

    /// Checks the graph signature and returns the input name and the declared
    /// output width, if static.
    fn validate_model(
        session: &Session,
        height: usize,
        width: usize,
    ) -> Result<(String, Option<usize>), ClassifierError> {
        let input = session.inputs.first().ok_or_else(|| {
            ClassifierError::ModelError("Model must have an image input, found none".to_string())
        })?;
        if session.outputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Model must have at least 1 output for class scores".to_string(),
            ));
        }

        let dims = match &input.input_type {
            ValueType::Tensor { dimensions, .. } => dimensions,
            other => {
                return Err(ClassifierError::ModelError(format!(
                    "Model input '{}' must be a tensor, found {:?}",
                    input.name, other
                )))
            }
        };
        // Negative dimensions are symbolic and accept any size.
        let fits = |dim: i64, expected: usize| dim < 0 || dim as usize == expected;
        if dims.len() != 4 || !fits(dims[1], 3) || !fits(dims[2], height) || !fits(dims[3], width) {
            return Err(ClassifierError::ModelError(format!(
                "Model input '{}' has shape {:?}, expected [N, 3, {}, {}]",
                input.name, dims, height, width
            )));
        }

        let output_size = match &session.outputs[0].output_type {
            ValueType::Tensor { dimensions, .. } => dimensions
                .last()
                .filter(|&&d| d > 0)
                .map(|&d| d as usize),
            _ => None,
        };

        Ok((input.name.clone(), output_size))
    }
}

impl ScoringBackend for OnnxBackend {
    fn scores(&self, input: ArrayView4<'_, f32>) -> Result<Array1<f32>, ClassifierError> {
        let input = input.as_standard_layout().into_owned();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(input).map_err(|e| {
                ClassifierError::PredictionError(format!("Failed to create input tensor: {}", e))
            })?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| ClassifierError::PredictionError(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0].try_extract_tensor::<f32>().map_err(|e| {
            ClassifierError::PredictionError(format!("Failed to extract output tensor: {}", e))
        })?;

        Ok(output_tensor.iter().copied().collect())
    }

    fn declared_output_size(&self) -> Option<usize> {
        self.output_size
    }
}
