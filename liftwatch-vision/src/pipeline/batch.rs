//! Offline one-pass batch processing
//!
//! Walks the whole source once: skip frames per the selected profile,
//! accumulate survivors into fixed-size detector batches, record events on
//! the video-time clock, and append annotated frames to the output encoder.
//! Progress tracks decoded frames, not surviving ones, so it moves on every
//! frame regardless of skip/batch state.

use liftwatch_core::{BatchTuning, EventRecorder, LabelMap, PerformanceSummary, PipelineState};
use opencv::core::Mat;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::realtime::filter_and_normalize;
use super::{SharedEvents, SharedState};
use crate::annotate::{annotate, encode_jpeg};
use crate::error::PipelineError;
use crate::models::Detector;
use crate::video::{FrameSink, SinkFactory, SourceProvider};

pub struct BatchPipeline {
    provider: Arc<dyn SourceProvider>,
    detector: Arc<dyn Detector>,
    sink_factory: Arc<dyn SinkFactory>,
    labels: LabelMap,
    confidence_threshold: f32,
    cooldown_secs: f64,
    tuning: BatchTuning,
    floor: String,
    state: SharedState,
    events: SharedEvents,
    stop_flag: Arc<RwLock<bool>>,
}

impl BatchPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn SourceProvider>,
        detector: Arc<dyn Detector>,
        sink_factory: Arc<dyn SinkFactory>,
        labels: LabelMap,
        confidence_threshold: f32,
        cooldown_secs: f64,
        tuning: BatchTuning,
        floor: String,
        state: SharedState,
        events: SharedEvents,
        stop_flag: Arc<RwLock<bool>>,
    ) -> Self {
        Self {
            provider,
            detector,
            sink_factory,
            labels,
            confidence_threshold,
            cooldown_secs,
            tuning,
            floor,
            state,
            events,
            stop_flag,
        }
    }

    /// Run to completion (or stop/abort). Blocking; callers put it on a
    /// dedicated worker. On error the shared state keeps the message and any
    /// partial output stays on disk for diagnosis.
    pub fn run(&self) -> Result<PerformanceSummary, PipelineError> {
        let started = Instant::now();

        let mut source = self.provider.open()?;
        let mut fps = source.fps();
        if fps <= 0.0 || !fps.is_finite() {
            warn!(fps, "source reports no usable frame rate, assuming 30");
            fps = 30.0;
        }
        let total_frames = source.frame_count();
        let frame_size = source.frame_size();

        self.state.write().begin_run(total_frames, fps);

        // Output runs at the profile's target rate, decoupled from source
        // fps; one encoded frame per surviving input frame.
        let mut sink = self.sink_factory.open(self.tuning.target_fps, frame_size)?;
        let mut recorder = EventRecorder::new(self.cooldown_secs);

        let stride = self.tuning.frame_skip as u64 + 1;
        let mut batch_frames: Vec<Mat> = Vec::with_capacity(self.tuning.batch_size);
        let mut batch_indices: Vec<u64> = Vec::with_capacity(self.tuning.batch_size);
        let mut counter: u64 = 0;
        let mut frames_processed: u64 = 0;

        info!(
            total_frames,
            fps,
            frame_skip = self.tuning.frame_skip,
            batch_size = self.tuning.batch_size,
            target_fps = self.tuning.target_fps,
            floor = %self.floor,
            "batch processing started"
        );

        loop {
            if *self.stop_flag.read() {
                info!(frame = counter, "batch processing stopped");
                break;
            }

            let frame = match source.decode_next() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    if counter < total_frames {
                        warn!(
                            frame = counter,
                            total = total_frames,
                            "decode ended early, treating as end of stream"
                        );
                    }
                    break;
                }
                Err(e) => {
                    warn!(frame = counter, error = %e, "decode failed, treating as end of stream");
                    break;
                }
            };

            counter += 1;
            {
                let mut state = self.state.write();
                state.current_frame = counter;
                state.progress = PipelineState::percent(counter, total_frames);
            }
            if counter % 30 == 0 {
                debug!(
                    frame = counter,
                    total = total_frames,
                    progress = PipelineState::percent(counter, total_frames),
                    "batch progress"
                );
            }

            if counter % stride != 0 {
                continue;
            }

            batch_frames.push(frame);
            batch_indices.push(counter);
            if batch_frames.len() >= self.tuning.batch_size {
                frames_processed += self.process_batch(
                    &mut batch_frames,
                    &mut batch_indices,
                    fps,
                    &mut recorder,
                    sink.as_mut(),
                )?;
            }
        }

        let stopped = *self.stop_flag.read();
        if !stopped && !batch_frames.is_empty() {
            frames_processed += self.process_batch(
                &mut batch_frames,
                &mut batch_indices,
                fps,
                &mut recorder,
                sink.as_mut(),
            )?;
        }

        sink.close()?;
        source.release();

        let summary = PerformanceSummary::from_run(
            started.elapsed().as_secs_f64(),
            frames_processed,
            self.events.read().len(),
        );

        if stopped {
            let mut state = self.state.write();
            state.running = false;
            state.performance = Some(summary);
        } else {
            self.state.write().complete(summary);
            info!(
                frames = frames_processed,
                elapsed = summary.elapsed_secs,
                average_fps = summary.average_fps,
                "batch processing completed"
            );
        }

        Ok(summary)
    }

    /// Detect one accumulated batch and drain it through annotate/encode,
    /// preserving original frame order.
    fn process_batch(
        &self,
        batch_frames: &mut Vec<Mat>,
        batch_indices: &mut Vec<u64>,
        fps: f64,
        recorder: &mut EventRecorder,
        sink: &mut dyn FrameSink,
    ) -> Result<u64, PipelineError> {
        let results = self.detector.detect(batch_frames)?;
        if results.len() != batch_frames.len() {
            return Err(PipelineError::Detection(format!(
                "detector returned {} results for {} frames",
                results.len(),
                batch_frames.len()
            )));
        }

        for ((frame, frame_index), detections) in batch_frames
            .iter_mut()
            .zip(batch_indices.iter())
            .zip(results)
        {
            let reference_time = *frame_index as f64 / fps;
            let kept = filter_and_normalize(detections, self.confidence_threshold, &self.labels);

            for det in &kept {
                if let Some(event) = recorder.maybe_record(
                    &det.label,
                    det.confidence,
                    reference_time,
                    &self.floor,
                ) {
                    info!(label = %event.label, confidence = event.confidence, floor = %event.floor, "event recorded");
                    self.events.write().push(event);
                }
            }

            // One malformed detection must not abort the job; drop the
            // overlay for this frame only.
            if let Err(e) = annotate(frame, &kept) {
                warn!(frame = frame_index, error = %e, "annotation failed, writing frame without overlay");
            }

            sink.write(frame)?;

            match encode_jpeg(frame) {
                Ok(jpeg) => self.state.write().last_frame_jpeg = Some(jpeg),
                Err(e) => warn!(frame = frame_index, error = %e, "preview encode failed"),
            }
        }

        let processed = batch_frames.len() as u64;
        batch_frames.clear();
        batch_indices.clear();
        Ok(processed)
    }

    /// Worker entry point: run, and translate the outcome into shared state.
    pub fn run_to_state(&self) {
        if let Err(e) = self.run() {
            error!(error = %e, kind = e.kind(), "batch processing failed");
            self.state.write().fail(e.to_string());
        }
    }
}
