//! Externally observable pipeline status
//!
//! One `PipelineState` record is shared by the realtime pacer and the batch
//! pipeline; whichever is active owns its mutation, and polling clients read
//! snapshots. The JPEG preview blob is deliberately kept out of
//! serialization; frame bytes travel through [`FrameResult`].

use serde::{Deserialize, Serialize};

/// Final metrics of a finished or stopped run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub elapsed_secs: f64,
    pub average_fps: f64,
    pub frames_processed: u64,
    pub events_detected: usize,
}

impl PerformanceSummary {
    pub fn from_run(elapsed_secs: f64, frames_processed: u64, events_detected: usize) -> Self {
        let average_fps = if elapsed_secs > 0.0 {
            frames_processed as f64 / elapsed_secs
        } else {
            0.0
        };
        Self {
            elapsed_secs,
            average_fps,
            frames_processed,
            events_detected,
        }
    }
}

/// Shared status record mutated by the active pipeline and read by pollers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineState {
    /// Integer percent, 0..=100.
    pub progress: u32,
    pub running: bool,
    pub completed: bool,
    pub error: Option<String>,
    pub current_frame: u64,
    pub total_frames: u64,
    pub fps: f64,
    /// Most recent transport-encoded frame, for preview polling.
    #[serde(skip)]
    pub last_frame_jpeg: Option<Vec<u8>>,
    pub performance: Option<PerformanceSummary>,
}

impl PipelineState {
    /// Reset to the beginning of a fresh run over a known source.
    pub fn begin_run(&mut self, total_frames: u64, fps: f64) {
        self.progress = 0;
        self.running = true;
        self.completed = false;
        self.error = None;
        self.current_frame = 0;
        self.total_frames = total_frames;
        self.fps = fps;
        self.last_frame_jpeg = None;
        self.performance = None;
    }

    /// Record a fatal pipeline error and stop.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.running = false;
    }

    /// Mark normal completion.
    pub fn complete(&mut self, performance: PerformanceSummary) {
        self.progress = 100;
        self.running = false;
        self.completed = true;
        self.performance = Some(performance);
    }

    /// Progress percent for `current` of `total` frames, clamped to 100.
    pub fn percent(current: u64, total: u64) -> u32 {
        if total == 0 {
            return 0;
        }
        ((current * 100) / total).min(100) as u32
    }
}

/// Reply to a successful realtime start.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeStarted {
    pub total_frames: u64,
    pub fps: f64,
    pub floor: String,
}

/// One poll step's worth of output from either pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct FrameResult {
    pub progress: u32,
    /// Transport-encoded frame; absent on the completion step.
    #[serde(skip)]
    pub frame: Option<Vec<u8>>,
    pub current_frame: u64,
    pub total_frames: u64,
    pub fps: f64,
    pub completed: bool,
    pub performance: Option<PerformanceSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_rounds_down_and_clamps() {
        assert_eq!(PipelineState::percent(0, 90), 0);
        assert_eq!(PipelineState::percent(45, 90), 50);
        assert_eq!(PipelineState::percent(89, 90), 98);
        assert_eq!(PipelineState::percent(90, 90), 100);
        assert_eq!(PipelineState::percent(120, 90), 100);
        assert_eq!(PipelineState::percent(10, 0), 0);
    }

    #[test]
    fn test_begin_run_clears_previous_outcome() {
        let mut state = PipelineState::default();
        state.fail("source missing");
        state.begin_run(90, 30.0);
        assert!(state.running);
        assert!(!state.completed);
        assert!(state.error.is_none());
        assert_eq!(state.total_frames, 90);
    }

    #[test]
    fn test_complete_pins_progress_to_100() {
        let mut state = PipelineState::default();
        state.begin_run(90, 30.0);
        state.complete(PerformanceSummary::from_run(3.0, 30, 1));
        assert_eq!(state.progress, 100);
        assert!(state.completed);
        assert!(!state.running);
    }

    #[test]
    fn test_summary_average_fps() {
        let summary = PerformanceSummary::from_run(2.0, 60, 3);
        assert_eq!(summary.average_fps, 30.0);
        let empty = PerformanceSummary::from_run(0.0, 0, 0);
        assert_eq!(empty.average_fps, 0.0);
    }

    #[test]
    fn test_state_snapshot_serializes_without_frame_blob() {
        let mut state = PipelineState::default();
        state.begin_run(10, 30.0);
        state.last_frame_jpeg = Some(vec![0xff, 0xd8]);
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("last_frame_jpeg").is_none());
        assert_eq!(json["total_frames"], 10);
    }
}
