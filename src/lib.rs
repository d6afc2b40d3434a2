//! Prompt length external processor library.
//!
//! Implements the proxy's external-processing gRPC stream: every request
//! phase is answered with CONTINUE, and non-empty request bodies are annotated
//! with `x-prompt-length` and `x-prompt-size-class` headers.

pub mod classify;
pub mod config;
pub mod ext_proc;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use classify::{Classifier, SizeClass, SizeClassifier};
pub use config::ProcessorConfig;
pub use ext_proc::{ProcessorServer, StreamHandler};
pub use lifecycle::Shutdown;
