//! A thread-safe food photo classifier with nutrient lookup, backed by an
//! ONNX export of a ResNet fine-tuned on Food-101.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use foodlens::FoodClassifier;
//!
//! let classifier = FoodClassifier::initialize(
//!     "model/model.onnx",
//!     "food-101/meta/classes.txt",
//! )?;
//!
//! let (food, nutrients) = classifier.classify_path("dinner.jpg")?;
//! println!("{}: {} ({} protein)", food, nutrients.calories, nutrients.protein);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! The classifier is immutable once built and can be shared across threads
//! using `Arc`:
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use foodlens::{FoodClassifier, ModelManager};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let manager = ModelManager::new_default();
//! let classifier = Arc::new(
//!     FoodClassifier::builder()
//!         .with_model_manager(&manager)?
//!         .build()?,
//! );
//!
//! let mut handles = vec![];
//! for path in ["a.jpg", "b.png", "c.gif"] {
//!     let classifier = Arc::clone(&classifier);
//!     handles.push(thread::spawn(move || classifier.classify_path(path)));
//! }
//!
//! for handle in handles {
//!     println!("{:?}", handle.join().unwrap());
//! }
//! # Ok(())
//! # }
//! ```

pub mod classifier;
mod runtime;
pub mod model_manager;
pub mod nutrients;
pub mod vocabulary;

pub use classifier::{
    ClassifierError, ClassifierInfo, FoodClassifier, FoodClassifierBuilder, FoodPrediction,
    OnnxBackend, PreprocessConfig, Preprocessor, ScoringBackend,
};
pub use runtime::{RuntimeConfig, create_session_builder};
pub use model_manager::{ModelManager, ModelError, WeightsSource};
pub use nutrients::{NutrientFacts, NutrientTable};
pub use vocabulary::{LabelVocabulary, FOOD101_CLASSES};

pub fn init_logger() {
    env_logger::init();
}
