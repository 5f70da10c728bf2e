//! Scripted detector for tests and detector-less demos

use liftwatch_core::Detection;
use opencv::core::Mat;
use opencv::prelude::*;
use parking_lot::Mutex;
use std::time::Duration;

use super::Detector;
use crate::error::PipelineError;

/// Detector returning a fixed detection list for every frame.
///
/// Records the first pixel byte of each frame it sees (the synthetic source
/// writes the frame index there), so tests can assert exactly which frames
/// reached the detector and in what order.
pub struct StubDetector {
    response: Vec<Detection>,
    delay: Option<Duration>,
    fail: bool,
    seen: Mutex<Vec<u8>>,
    batch_sizes: Mutex<Vec<usize>>,
}

impl StubDetector {
    pub fn new(response: Vec<Detection>) -> Self {
        Self {
            response,
            delay: None,
            fail: false,
            seen: Mutex::new(Vec::new()),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    /// Detector that never detects anything.
    pub fn silent() -> Self {
        Self::new(Vec::new())
    }

    /// Detector whose every call fails.
    pub fn failing() -> Self {
        let mut stub = Self::silent();
        stub.fail = true;
        stub
    }

    /// Sleep this long per call, to widen the window a run stays busy.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// First pixel byte of every frame seen, in call order.
    pub fn observed_frames(&self) -> Vec<u8> {
        self.seen.lock().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().clone()
    }
}

impl Detector for StubDetector {
    fn detect(&self, frames: &[Mat]) -> Result<Vec<Vec<Detection>>, PipelineError> {
        if self.fail {
            return Err(PipelineError::Detection(
                "simulated detector failure".to_string(),
            ));
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        self.batch_sizes.lock().push(frames.len());
        let mut seen = self.seen.lock();
        for frame in frames {
            let first = frame
                .data_bytes()
                .map_err(|e| PipelineError::OpenCv(e.message.clone()))?
                .first()
                .copied()
                .unwrap_or(0);
            seen.push(first);
        }

        Ok(frames.iter().map(|_| self.response.clone()).collect())
    }
}
