//! Processing pipelines
//!
//! Two mutually exclusive consumers of the shared video source: the
//! realtime pacer, progressed only by explicit polls, and the batch
//! pipeline, which runs to completion on a dedicated worker. Both publish
//! into one shared [`PipelineState`] and one shared [`EventLog`].

pub mod batch;
pub mod realtime;

pub use batch::BatchPipeline;
pub use realtime::{PacerPhase, RealtimePacer};

use liftwatch_core::{EventLog, PipelineState};
use parking_lot::RwLock;
use std::sync::Arc;

pub type SharedState = Arc<RwLock<PipelineState>>;
pub type SharedEvents = Arc<RwLock<EventLog>>;

/// Which pipeline currently owns the shared source and state record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePipeline {
    Idle,
    Realtime,
    Batch,
}
