//! Wall-clock-paced realtime playback and detection
//!
//! The pacer maps elapsed wall-clock time to a target frame index instead
//! of stepping a fixed-rate timer, so playback stays synchronized to real
//! time even when polls arrive late; frames are silently dropped under load
//! (smoothness over completeness). All decode/detect/encode work happens
//! synchronously inside `poll`, so one call costs at most one frame's
//! detection latency, and a poll that lands inside the current frame
//! interval returns the cached frame without touching the decoder.

use liftwatch_core::{
    Detection, EventRecorder, FrameResult, LabelMap, PerformanceSummary, PipelineState,
    RealtimeStarted,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::{SharedEvents, SharedState};
use crate::annotate::{annotate, encode_jpeg};
use crate::error::PipelineError;
use crate::models::Detector;
use crate::video::{FrameSource, SourceProvider};

/// Pacer lifecycle. `poll` is the only mutator while `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacerPhase {
    Idle,
    Starting,
    Running,
    Completed,
    Stopped,
    Failed,
}

pub struct RealtimePacer {
    provider: Arc<dyn SourceProvider>,
    detector: Arc<dyn Detector>,
    labels: LabelMap,
    confidence_threshold: f32,
    state: SharedState,
    events: SharedEvents,

    phase: PacerPhase,
    source: Option<Box<dyn FrameSource>>,
    recorder: EventRecorder,
    floor: String,
    t0: Option<Instant>,
    current_frame: u64,
    total_frames: u64,
    fps: f64,
    cached_frame: Option<Vec<u8>>,
    frames_processed: u64,
}

impl RealtimePacer {
    pub fn new(
        provider: Arc<dyn SourceProvider>,
        detector: Arc<dyn Detector>,
        labels: LabelMap,
        confidence_threshold: f32,
        cooldown_secs: f64,
        state: SharedState,
        events: SharedEvents,
    ) -> Self {
        Self {
            provider,
            detector,
            labels,
            confidence_threshold,
            state,
            events,
            phase: PacerPhase::Idle,
            source: None,
            recorder: EventRecorder::new(cooldown_secs),
            floor: String::new(),
            t0: None,
            current_frame: 0,
            total_frames: 0,
            fps: 0.0,
            cached_frame: None,
            frames_processed: 0,
        }
    }

    pub fn phase(&self) -> PacerPhase {
        self.phase
    }

    /// Open the source and arm the pacer. The pacing clock starts on the
    /// first `poll`, not here.
    pub fn start(&mut self, floor: String) -> Result<RealtimeStarted, PipelineError> {
        if matches!(self.phase, PacerPhase::Starting | PacerPhase::Running) {
            return Err(PipelineError::PipelineBusy(
                "realtime analysis already running".to_string(),
            ));
        }

        self.phase = PacerPhase::Starting;
        let source = match self.provider.open() {
            Ok(source) => source,
            Err(e) => {
                self.phase = PacerPhase::Failed;
                self.state.write().fail(e.to_string());
                return Err(e);
            }
        };

        let mut fps = source.fps();
        if fps <= 0.0 || !fps.is_finite() {
            warn!(fps, "source reports no usable frame rate, assuming 30");
            fps = 30.0;
        }
        self.total_frames = source.frame_count();
        self.fps = fps;
        self.source = Some(source);
        self.current_frame = 0;
        self.frames_processed = 0;
        self.cached_frame = None;
        self.t0 = None;
        // New run reopens every cooldown window; the event log is untouched.
        self.recorder.reset();
        self.floor = floor;

        self.state.write().begin_run(self.total_frames, self.fps);
        info!(
            total_frames = self.total_frames,
            fps = self.fps,
            floor = %self.floor,
            "realtime analysis started"
        );

        self.phase = PacerPhase::Running;
        Ok(RealtimeStarted {
            total_frames: self.total_frames,
            fps: self.fps,
            floor: self.floor.clone(),
        })
    }

    /// Deliver the frame the wall clock currently calls for.
    pub fn poll(&mut self) -> Result<FrameResult, PipelineError> {
        if self.phase != PacerPhase::Running {
            return Err(PipelineError::NotRunning(
                "realtime analysis is not running".to_string(),
            ));
        }

        let t0 = *self.t0.get_or_insert_with(Instant::now);
        let elapsed = t0.elapsed().as_secs_f64();
        let target = (elapsed * self.fps).floor() as u64;

        // Nothing new inside the current frame interval: hand back the
        // cached frame, advance nothing.
        if target == self.current_frame {
            if let Some(jpeg) = &self.cached_frame {
                return Ok(self.frame_result(Some(jpeg.clone())));
            }
        }

        if target >= self.total_frames {
            return Ok(self.finish_completed());
        }

        let source = self
            .source
            .as_mut()
            .ok_or_else(|| PipelineError::NotRunning("source already released".to_string()))?;

        // Absolute seek: a slow poller skips frames rather than falling
        // behind the wall clock.
        let frame = match source.seek(target).and_then(|_| source.decode_next()) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                if target + 1 < self.total_frames {
                    warn!(
                        frame = target,
                        total = self.total_frames,
                        "decode ended early, treating as end of stream"
                    );
                }
                return Ok(self.finish_completed());
            }
            Err(e) => {
                warn!(frame = target, error = %e, "decode failed, treating as end of stream");
                return Ok(self.finish_completed());
            }
        };

        let raw = self.detector.detect(std::slice::from_ref(&frame))?;
        let detections = raw.into_iter().next().unwrap_or_default();

        // Video time, so the cooldown window means the same thing no matter
        // how jittery the polling client is.
        let reference_time = target as f64 / self.fps;
        let kept = filter_and_normalize(detections, self.confidence_threshold, &self.labels);
        for det in &kept {
            if let Some(event) =
                self.recorder
                    .maybe_record(&det.label, det.confidence, reference_time, &self.floor)
            {
                info!(label = %event.label, confidence = event.confidence, floor = %event.floor, "event recorded");
                self.events.write().push(event);
            }
        }

        let mut frame = frame;
        annotate(&mut frame, &kept)?;
        let jpeg = encode_jpeg(&frame)?;

        self.current_frame = target;
        self.frames_processed += 1;
        self.cached_frame = Some(jpeg.clone());

        {
            let mut state = self.state.write();
            state.current_frame = target;
            state.progress = PipelineState::percent(target, self.total_frames);
            state.last_frame_jpeg = Some(jpeg.clone());
        }

        Ok(self.frame_result(Some(jpeg)))
    }

    /// Stop a run in flight. Releases the source before returning.
    pub fn stop(&mut self) -> Option<PerformanceSummary> {
        if !matches!(self.phase, PacerPhase::Starting | PacerPhase::Running) {
            return None;
        }

        let summary = self.summary();
        self.release_source();
        self.phase = PacerPhase::Stopped;

        {
            let mut state = self.state.write();
            state.running = false;
            state.performance = Some(summary);
        }
        info!(
            frames = summary.frames_processed,
            elapsed = summary.elapsed_secs,
            "realtime analysis stopped"
        );
        Some(summary)
    }

    fn finish_completed(&mut self) -> FrameResult {
        let summary = self.summary();
        self.release_source();
        self.phase = PacerPhase::Completed;
        self.state.write().complete(summary);
        info!(
            frames = summary.frames_processed,
            elapsed = summary.elapsed_secs,
            "realtime playback completed"
        );

        FrameResult {
            progress: 100,
            frame: None,
            current_frame: self.current_frame,
            total_frames: self.total_frames,
            fps: self.fps,
            completed: true,
            performance: Some(summary),
        }
    }

    fn frame_result(&self, frame: Option<Vec<u8>>) -> FrameResult {
        FrameResult {
            progress: PipelineState::percent(self.current_frame, self.total_frames),
            frame,
            current_frame: self.current_frame,
            total_frames: self.total_frames,
            fps: self.fps,
            completed: false,
            performance: None,
        }
    }

    fn summary(&self) -> PerformanceSummary {
        let elapsed = self.t0.map(|t0| t0.elapsed().as_secs_f64()).unwrap_or(0.0);
        PerformanceSummary::from_run(elapsed, self.frames_processed, self.events.read().len())
    }

    fn release_source(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.release();
        }
    }
}

/// Apply the confidence gate and label normalization the pipelines share.
pub(crate) fn filter_and_normalize(
    detections: Vec<Detection>,
    confidence_threshold: f32,
    labels: &LabelMap,
) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|d| d.confidence >= confidence_threshold)
        .map(|d| Detection {
            label: labels.canonical(&d.label),
            ..d
        })
        .collect()
}
