//! Video source and sink seams
//!
//! Container decode/encode is consumed as an opaque service behind these
//! traits. The file-backed implementations wrap OpenCV; the synthetic
//! implementations exist for tests and demos and never touch disk.

mod file;
mod synthetic;

pub use file::{OutputDirectory, VideoFile, VideoFileSink, VideoFileSource};
pub use synthetic::{NullSink, NullSinkFactory, SyntheticProvider, SyntheticSource};

use opencv::core::Mat;

use crate::error::PipelineError;

/// An opened, seekable frame stream.
///
/// `decode_next` returning `Ok(None)` means the stream is exhausted, which
/// is a normal terminal state, not an error.
pub trait FrameSource: Send {
    fn fps(&self) -> f64;
    fn frame_count(&self) -> u64;
    /// (width, height) of decoded frames.
    fn frame_size(&self) -> (i32, i32);
    /// Absolute reposition; the next `decode_next` call decodes `frame_index`.
    fn seek(&mut self, frame_index: u64) -> Result<(), PipelineError>;
    fn decode_next(&mut self) -> Result<Option<Mat>, PipelineError>;
    /// Release the underlying handle. Further reads return end-of-stream.
    fn release(&mut self);
}

/// Something that can open the shared video source from scratch.
///
/// Every run opens its own source so a restart fully reinitializes decode
/// position instead of resuming.
pub trait SourceProvider: Send + Sync {
    fn open(&self) -> Result<Box<dyn FrameSource>, PipelineError>;
}

/// An open output stream for annotated frames.
pub trait FrameSink: Send {
    fn write(&mut self, frame: &Mat) -> Result<(), PipelineError>;
    fn close(&mut self) -> Result<(), PipelineError>;
}

/// Opens an output stream for a batch run at the given rate and frame size.
pub trait SinkFactory: Send + Sync {
    fn open(&self, fps: f64, frame_size: (i32, i32)) -> Result<Box<dyn FrameSink>, PipelineError>;
}
