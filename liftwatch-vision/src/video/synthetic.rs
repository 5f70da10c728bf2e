//! In-memory source and sink used by tests and demos

use opencv::core::{Mat, Scalar, CV_8UC3};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{FrameSink, FrameSource, SinkFactory, SourceProvider};
use crate::error::PipelineError;

/// Provider for a generated clip with a known frame count and rate.
///
/// Every produced frame is filled with its own frame index (modulo 256), so
/// downstream code can tell frames apart without a real decoder.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    fps: f64,
    frames: u64,
    width: i32,
    height: i32,
    decodes: Arc<AtomicUsize>,
}

impl SyntheticProvider {
    pub fn new(fps: f64, frames: u64) -> Self {
        Self {
            fps,
            frames,
            width: 64,
            height: 48,
            decodes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_size(mut self, width: i32, height: i32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Total `decode_next` calls across every source this provider opened.
    pub fn decode_calls(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

impl SourceProvider for SyntheticProvider {
    fn open(&self) -> Result<Box<dyn FrameSource>, PipelineError> {
        Ok(Box::new(SyntheticSource {
            fps: self.fps,
            frames: self.frames,
            width: self.width,
            height: self.height,
            pos: 0,
            released: false,
            decodes: self.decodes.clone(),
        }))
    }
}

/// Generated frame stream; see [`SyntheticProvider`].
pub struct SyntheticSource {
    fps: f64,
    frames: u64,
    width: i32,
    height: i32,
    pos: u64,
    released: bool,
    decodes: Arc<AtomicUsize>,
}

impl FrameSource for SyntheticSource {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> u64 {
        self.frames
    }

    fn frame_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn seek(&mut self, frame_index: u64) -> Result<(), PipelineError> {
        self.pos = frame_index;
        Ok(())
    }

    fn decode_next(&mut self) -> Result<Option<Mat>, PipelineError> {
        if self.released || self.pos >= self.frames {
            return Ok(None);
        }
        self.decodes.fetch_add(1, Ordering::SeqCst);
        let value = (self.pos % 256) as f64;
        let frame =
            Mat::new_rows_cols_with_default(self.height, self.width, CV_8UC3, Scalar::all(value))?;
        self.pos += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.released = true;
    }
}

/// Sink that discards frames and counts writes.
pub struct NullSink {
    written: Arc<AtomicUsize>,
    closed: bool,
}

impl FrameSink for NullSink {
    fn write(&mut self, _frame: &Mat) -> Result<(), PipelineError> {
        if self.closed {
            return Err(PipelineError::EncodeFailure(
                "output sink is closed".to_string(),
            ));
        }
        self.written.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<(), PipelineError> {
        self.closed = true;
        Ok(())
    }
}

/// Factory for [`NullSink`]; can simulate an encoder that refuses to open.
#[derive(Debug, Clone, Default)]
pub struct NullSinkFactory {
    written: Arc<AtomicUsize>,
    fail_on_open: bool,
}

impl NullSinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose `open` always fails with `EncodeFailure`.
    pub fn failing() -> Self {
        Self {
            written: Arc::new(AtomicUsize::new(0)),
            fail_on_open: true,
        }
    }

    /// Frames written across every sink this factory opened.
    pub fn frames_written(&self) -> usize {
        self.written.load(Ordering::SeqCst)
    }
}

impl SinkFactory for NullSinkFactory {
    fn open(&self, _fps: f64, _frame_size: (i32, i32)) -> Result<Box<dyn FrameSink>, PipelineError> {
        if self.fail_on_open {
            return Err(PipelineError::EncodeFailure(
                "simulated encoder open failure".to_string(),
            ));
        }
        Ok(Box::new(NullSink {
            written: self.written.clone(),
            closed: false,
        }))
    }
}
