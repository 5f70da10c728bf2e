//! Detector adapter seam and implementations

mod stub;
mod yolo;

pub use stub::StubDetector;
pub use yolo::YoloDetector;

use liftwatch_core::Detection;
use opencv::core::Mat;

use crate::error::PipelineError;

/// Class names of the shipped elevator-cabin model, in output order.
pub const DEFAULT_CLASSES: &[&str] = &["person", "EMT", "EMTLOGO"];

/// Batched object detector.
///
/// One detection list per input frame, in input order; a single-frame call
/// is a batch of one. Returns raw detections; confidence policy belongs to
/// the callers, not the adapter.
pub trait Detector: Send + Sync {
    fn detect(&self, frames: &[Mat]) -> Result<Vec<Vec<Detection>>, PipelineError>;
}
