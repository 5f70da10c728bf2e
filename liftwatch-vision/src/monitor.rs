//! Monitor service facade
//!
//! Owns the shared pipeline state, the process-lifetime event log and the
//! mutual exclusion between the realtime pacer and the batch pipeline.
//! External collaborators (the web layer) talk only to this type.

use liftwatch_core::{
    Event, FrameResult, LabelMap, PerformanceProfile, PerformanceSummary, PipelineState,
    RealtimeStarted,
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::MonitorConfig;
use crate::error::PipelineError;
use crate::models::{Detector, YoloDetector};
use crate::pipeline::{
    ActivePipeline, BatchPipeline, RealtimePacer, SharedEvents, SharedState,
};
use crate::video::{OutputDirectory, SinkFactory, SourceProvider, VideoFile};

pub struct MonitorService {
    config: MonitorConfig,
    provider: Arc<dyn SourceProvider>,
    sink_factory: Arc<dyn SinkFactory>,
    detector: Option<Arc<dyn Detector>>,
    labels: LabelMap,

    state: SharedState,
    events: SharedEvents,
    // Lock order: `active` before `pacer`; never hold either across an await.
    active: Arc<Mutex<ActivePipeline>>,
    pacer: Mutex<Option<RealtimePacer>>,
    batch_stop: Arc<RwLock<bool>>,
    batch_handle: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorService {
    /// Build with explicit collaborators. `detector: None` models a detector
    /// that failed to load at process init: construction succeeds, but every
    /// pipeline start fails with `DetectorUnavailable`.
    pub fn with_components(
        config: MonitorConfig,
        provider: Arc<dyn SourceProvider>,
        sink_factory: Arc<dyn SinkFactory>,
        detector: Option<Arc<dyn Detector>>,
    ) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;

        Ok(Self {
            labels: LabelMap::default(),
            state: Arc::new(RwLock::new(PipelineState::default())),
            events: Arc::new(RwLock::new(Default::default())),
            active: Arc::new(Mutex::new(ActivePipeline::Idle)),
            pacer: Mutex::new(None),
            batch_stop: Arc::new(RwLock::new(false)),
            batch_handle: Mutex::new(None),
            config,
            provider,
            sink_factory,
            detector,
        })
    }

    /// Build the production wiring: file source, timestamped output
    /// directory, YOLO detector.
    pub fn from_config(config: MonitorConfig) -> Result<Self, PipelineError> {
        let provider = Arc::new(VideoFile::new(&config.video_path));
        let sink_factory = Arc::new(OutputDirectory::new(&config.output_dir));

        let detector = match YoloDetector::new(
            &config.model_path,
            config.input_size,
            config.class_names.clone(),
        ) {
            Ok(detector) => Some(Arc::new(detector) as Arc<dyn Detector>),
            Err(e) => {
                error!(error = %e, "detector failed to load; pipelines will refuse to start");
                None
            }
        };

        Self::with_components(config, provider, sink_factory, detector)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn require_detector(&self) -> Result<Arc<dyn Detector>, PipelineError> {
        self.detector.clone().ok_or_else(|| {
            PipelineError::DetectorUnavailable("detector model is not loaded".to_string())
        })
    }

    fn floor_or_default(&self, floor: Option<String>) -> String {
        floor.unwrap_or_else(|| self.config.default_floor.clone())
    }

    /// Start the realtime pacer. Fails with `PipelineBusy`, mutating
    /// nothing, while either pipeline is running.
    pub fn start_realtime(
        &self,
        floor: Option<String>,
    ) -> Result<RealtimeStarted, PipelineError> {
        let mut active = self.active.lock();
        match *active {
            ActivePipeline::Idle => {}
            ActivePipeline::Batch => {
                return Err(PipelineError::PipelineBusy(
                    "batch processing is running".to_string(),
                ))
            }
            ActivePipeline::Realtime => {
                return Err(PipelineError::PipelineBusy(
                    "realtime analysis already running".to_string(),
                ))
            }
        }

        let detector = self.require_detector()?;

        // A fresh pacer per run: restart reinitializes decode position
        // instead of resuming.
        let mut pacer = RealtimePacer::new(
            self.provider.clone(),
            detector,
            self.labels.clone(),
            self.config.confidence_threshold,
            self.config.cooldown_secs,
            self.state.clone(),
            self.events.clone(),
        );
        let started = pacer.start(self.floor_or_default(floor))?;

        *self.pacer.lock() = Some(pacer);
        *active = ActivePipeline::Realtime;
        Ok(started)
    }

    /// Advance realtime playback. The pacing contract lives in
    /// [`RealtimePacer::poll`]; this adds only the active-pipeline handoff.
    pub fn poll_frame(&self) -> Result<FrameResult, PipelineError> {
        let mut active = self.active.lock();
        let mut pacer_slot = self.pacer.lock();
        let pacer = pacer_slot.as_mut().ok_or_else(|| {
            PipelineError::NotRunning("realtime analysis has not been started".to_string())
        })?;

        let result = pacer.poll();
        if let Ok(r) = &result {
            if r.completed {
                *active = ActivePipeline::Idle;
            }
        }
        result
    }

    /// Launch a batch run on a dedicated blocking worker and return
    /// immediately; progress is observed through [`MonitorService::state`].
    pub async fn start_batch(
        &self,
        profile: PerformanceProfile,
        floor: Option<String>,
    ) -> Result<(), PipelineError> {
        let mut active = self.active.lock();
        match *active {
            ActivePipeline::Idle => {}
            ActivePipeline::Realtime => {
                return Err(PipelineError::PipelineBusy(
                    "realtime analysis is running".to_string(),
                ))
            }
            ActivePipeline::Batch => {
                return Err(PipelineError::PipelineBusy(
                    "batch processing already running".to_string(),
                ))
            }
        }

        let detector = self.require_detector()?;
        *self.batch_stop.write() = false;

        let pipeline = BatchPipeline::new(
            self.provider.clone(),
            detector,
            self.sink_factory.clone(),
            self.labels.clone(),
            self.config.confidence_threshold,
            self.config.cooldown_secs,
            profile.tuning(),
            self.floor_or_default(floor),
            self.state.clone(),
            self.events.clone(),
            self.batch_stop.clone(),
        );

        *active = ActivePipeline::Batch;
        let active_marker = self.active.clone();
        let handle = tokio::task::spawn_blocking(move || {
            pipeline.run_to_state();
            *active_marker.lock() = ActivePipeline::Idle;
        });
        *self.batch_handle.lock() = Some(handle);

        info!(?profile, "batch processing dispatched");
        Ok(())
    }

    /// Stop whichever pipeline is active. Safe to call at any time; the
    /// source handle is released before this returns.
    pub async fn stop(&self) -> Option<PerformanceSummary> {
        let mode = *self.active.lock();
        match mode {
            ActivePipeline::Idle => None,
            ActivePipeline::Realtime => {
                let mut active = self.active.lock();
                let mut pacer_slot = self.pacer.lock();
                let summary = pacer_slot.as_mut().and_then(|pacer| pacer.stop());
                *active = ActivePipeline::Idle;
                summary
            }
            ActivePipeline::Batch => {
                *self.batch_stop.write() = true;
                let handle = self.batch_handle.lock().take();
                if let Some(handle) = handle {
                    if let Err(e) = handle.await {
                        error!(error = %e, "batch worker did not shut down cleanly");
                    }
                }
                self.state.read().performance
            }
        }
    }

    /// Ordered snapshot of every recorded event since process start (or the
    /// last explicit clear).
    pub fn events(&self) -> Vec<Event> {
        self.events.read().snapshot()
    }

    pub fn clear_events(&self) {
        let cleared = {
            let mut events = self.events.write();
            let n = events.len();
            events.clear();
            n
        };
        info!(cleared, "event log cleared");
    }

    /// Immutable snapshot of the shared pipeline state.
    pub fn state(&self) -> PipelineState {
        self.state.read().clone()
    }

    /// Clear the previous run's outcome (progress, error, preview) while no
    /// pipeline is running. Events are kept.
    pub fn reset(&self) -> Result<(), PipelineError> {
        let active = self.active.lock();
        if *active != ActivePipeline::Idle {
            return Err(PipelineError::PipelineBusy(
                "cannot reset while a pipeline is running".to_string(),
            ));
        }

        let mut state = self.state.write();
        if state.running {
            warn!("state marked running with no active pipeline; clearing");
        }
        state.progress = 0;
        state.running = false;
        state.completed = false;
        state.error = None;
        state.current_frame = 0;
        state.last_frame_jpeg = None;
        state.performance = None;
        Ok(())
    }
}
