//! liftwatch-core: data model and event logic for the LiftWatch monitor
//!
//! Pure types shared by both processing pipelines: detections, the
//! deduplicated event log, pipeline status snapshots, and the batch
//! performance presets. No I/O lives here.

pub mod events;
pub mod labels;
pub mod profile;
pub mod state;
pub mod types;

pub use events::{Event, EventLog, EventRecorder, DEFAULT_COOLDOWN_SECS};
pub use labels::LabelMap;
pub use profile::{BatchTuning, PerformanceProfile};
pub use state::{FrameResult, PerformanceSummary, PipelineState, RealtimeStarted};
pub use types::{BoundingBox, Detection};
