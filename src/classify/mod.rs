//! Request body classification.
//!
//! # Data Flow
//! ```text
//! request body bytes
//!     → size.rs (count bytes, compare against thresholds)
//!     → Classification { length, size_class }
//!     → x-prompt-length / x-prompt-size-class header values
//! ```
//!
//! # Design Decisions
//! - Pure: no I/O, no state beyond the immutable thresholds
//! - Content is never decoded; only the byte count matters
//! - The `Classifier` trait is the seam the stream handler is generic over

pub mod size;

pub use size::{
    classify, Classification, Classifier, ClassifyError, SizeClass, SizeClassifier,
    PROMPT_LENGTH_HEADER, PROMPT_SIZE_CLASS_HEADER,
};
