//! Scoring pipeline: intake queue → worker → scorer → alert sink.

mod detector;
mod scorer;

pub use detector::{Detector, PipelineStats};
pub use scorer::Scorer;
