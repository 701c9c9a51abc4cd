//! Alignment hints for camera shots.
//!
//! Given a freshly captured photo and a reference photo, decide whether the
//! shot matches the reference framing and, if not, which way the subject
//! has to move.

pub mod algorithms;
pub mod analyzer;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod visualization;

pub use algorithms::{compute_offset, VerdictClassifier};
pub use analyzer::{AlignmentAnalyzer, SharedDetector};
pub use config::Config;
pub use error::{AlignError, AlignResult};
pub use pipeline::{
    AlignmentVerdict, AnalysisResult, ExtractorFactory, ImageHandle, Landmark, Offset,
    SignalExtractor, Tip,
};

pub type Result<T> = anyhow::Result<T>;
