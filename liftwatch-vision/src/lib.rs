//! liftwatch-vision: detection pipelines for the LiftWatch monitor
//!
//! A fixed video source, a frame-level object detector, and two mutually
//! exclusive ways of running it: wall-clock-paced realtime playback driven
//! by client polls, and an offline batch pass with frame-skipping and an
//! annotated output encode. Both feed one deduplicated event log and one
//! polled progress record, owned by [`MonitorService`].

pub mod annotate;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod pipeline;
pub mod video;
mod utils;

pub use config::MonitorConfig;
pub use error::PipelineError;
pub use models::{Detector, StubDetector, YoloDetector};
pub use monitor::MonitorService;
pub use pipeline::{BatchPipeline, PacerPhase, RealtimePacer};
