//! Batch throughput/quality presets

use serde::{Deserialize, Serialize};

/// Concrete batch-pipeline tuning values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchTuning {
    /// Frames skipped between processed frames; 0 processes every frame.
    pub frame_skip: u32,
    /// Frames accumulated per detector invocation.
    pub batch_size: usize,
    /// Frame rate of the encoded output stream.
    pub target_fps: f64,
}

/// Named throughput/quality trade-offs for the batch pipeline.
///
/// Selected once before a run starts; immutable during the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceProfile {
    /// Aggressive skipping and large batches for quick passes.
    Fast,
    #[default]
    Balanced,
    /// Minimal skipping for the most complete output video.
    Quality,
}

impl PerformanceProfile {
    pub fn tuning(&self) -> BatchTuning {
        match self {
            PerformanceProfile::Fast => BatchTuning {
                frame_skip: 4,
                batch_size: 8,
                target_fps: 10.0,
            },
            PerformanceProfile::Balanced => BatchTuning {
                frame_skip: 2,
                batch_size: 4,
                target_fps: 15.0,
            },
            PerformanceProfile::Quality => BatchTuning {
                frame_skip: 1,
                batch_size: 2,
                target_fps: 20.0,
            },
        }
    }
}
