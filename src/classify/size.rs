//! Byte-count size classification.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::ClassificationConfig;

/// Header carrying the body length in bytes.
pub const PROMPT_LENGTH_HEADER: &str = "x-prompt-length";
/// Header carrying the size class label.
pub const PROMPT_SIZE_CLASS_HEADER: &str = "x-prompt-size-class";

/// Size bucket of a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    /// Label sent in the `x-prompt-size-class` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeClass::Small => "small",
            SizeClass::Medium => "medium",
            SizeClass::Large => "large",
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one body fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Number of bytes in the body.
    pub length: u64,
    /// Bucket the length falls into.
    pub size_class: SizeClass,
}

/// Errors from classification.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The body length does not fit in a `u64`.
    #[error("body length {0} does not fit in 64 bits")]
    LengthOverflow(usize),
}

/// Classify a body by its byte count.
///
/// Ranges are half-open and ascending: `[0, small)` is small,
/// `[small, medium)` is medium, and everything from `medium` up is large.
/// `large_threshold` does not participate.
pub fn classify(body: &[u8], config: &ClassificationConfig) -> Result<Classification, ClassifyError> {
    let length = u64::try_from(body.len()).map_err(|_| ClassifyError::LengthOverflow(body.len()))?;

    let size_class = if length < config.small_threshold {
        SizeClass::Small
    } else if length < config.medium_threshold {
        SizeClass::Medium
    } else {
        SizeClass::Large
    };

    Ok(Classification { length, size_class })
}

/// Something that can label a request body.
pub trait Classifier: Send + Sync + 'static {
    fn classify(&self, body: &[u8]) -> Result<Classification, ClassifyError>;
}

/// Threshold classifier backed by the shared startup configuration.
#[derive(Debug, Clone)]
pub struct SizeClassifier {
    config: Arc<ClassificationConfig>,
}

impl SizeClassifier {
    pub fn new(config: Arc<ClassificationConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassificationConfig {
        &self.config
    }
}

impl Classifier for SizeClassifier {
    fn classify(&self, body: &[u8]) -> Result<Classification, ClassifyError> {
        classify(body, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_of(len: usize, small: u64, medium: u64) -> SizeClass {
        let config = ClassificationConfig::new(small, medium, medium);
        classify(&vec![b'a'; len], &config).unwrap().size_class
    }

    #[test]
    fn default_boundaries() {
        let config = ClassificationConfig::default();
        let cases = [
            (0, SizeClass::Small),
            (500, SizeClass::Small),
            (1023, SizeClass::Small),
            (1024, SizeClass::Medium),
            (2047, SizeClass::Medium),
            (2048, SizeClass::Large),
            (10_000, SizeClass::Large),
        ];
        for (len, expected) in cases {
            let result = classify(&vec![0u8; len], &config).unwrap();
            assert_eq!(result.length, len as u64);
            assert_eq!(result.size_class, expected, "length {}", len);
        }
    }

    #[test]
    fn boundary_lands_in_upper_bucket() {
        assert_eq!(class_of(10, 10, 20), SizeClass::Medium);
        assert_eq!(class_of(20, 10, 20), SizeClass::Large);
        assert_eq!(class_of(9, 10, 20), SizeClass::Small);
        assert_eq!(class_of(19, 10, 20), SizeClass::Medium);
    }

    #[test]
    fn large_threshold_is_not_a_decision_point() {
        let config = ClassificationConfig::new(10, 20, 1_000_000);
        let result = classify(&[0u8; 25], &config).unwrap();
        assert_eq!(result.size_class, SizeClass::Large);
    }

    #[test]
    fn equal_thresholds_skip_medium() {
        assert_eq!(class_of(99, 100, 100), SizeClass::Small);
        assert_eq!(class_of(100, 100, 100), SizeClass::Large);
    }

    #[test]
    fn misordered_thresholds_still_compare() {
        // small > medium: nothing is medium, bodies below small are small.
        assert_eq!(class_of(50, 100, 20), SizeClass::Small);
        assert_eq!(class_of(150, 100, 20), SizeClass::Large);
    }

    #[test]
    fn zero_thresholds_make_everything_large() {
        assert_eq!(class_of(0, 0, 0), SizeClass::Large);
    }

    #[test]
    fn counts_bytes_not_characters() {
        let config = ClassificationConfig::default();
        let body = "héllo wörld".as_bytes();
        assert_eq!(classify(body, &config).unwrap().length, 13);
    }

    #[test]
    fn labels() {
        assert_eq!(SizeClass::Small.to_string(), "small");
        assert_eq!(SizeClass::Medium.as_str(), "medium");
        assert_eq!(SizeClass::Large.as_str(), "large");
    }

    #[test]
    fn size_classifier_uses_shared_config() {
        let classifier = SizeClassifier::new(Arc::new(ClassificationConfig::new(1, 2, 2)));
        assert_eq!(classifier.classify(b"ab").unwrap().size_class, SizeClass::Large);
        assert_eq!(classifier.config().small_threshold, 1);
    }
}
