//! OpenCV-backed video file source and sink

use chrono::Local;
use opencv::core::{Mat, Size};
use opencv::prelude::*;
use opencv::videoio::{
    VideoCapture, VideoWriter, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT,
    CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH, CAP_PROP_POS_FRAMES,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{FrameSink, FrameSource, SinkFactory, SourceProvider};
use crate::error::PipelineError;

/// Provider for the fixed on-disk video source.
#[derive(Debug, Clone)]
pub struct VideoFile {
    path: PathBuf,
}

impl VideoFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceProvider for VideoFile {
    fn open(&self) -> Result<Box<dyn FrameSource>, PipelineError> {
        VideoFileSource::open(&self.path).map(|source| Box::new(source) as Box<dyn FrameSource>)
    }
}

/// Seekable decoder over one video file.
pub struct VideoFileSource {
    capture: Option<VideoCapture>,
    fps: f64,
    frame_count: u64,
    frame_size: (i32, i32),
}

impl VideoFileSource {
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::SourceUnavailable(format!(
                "video file does not exist: {}",
                path.display()
            )));
        }

        let path_str = path.to_string_lossy();
        let capture = VideoCapture::from_file(&path_str, CAP_ANY).map_err(|e| {
            PipelineError::SourceUnavailable(format!("failed to open {}: {}", path_str, e.message))
        })?;

        let opened = capture
            .is_opened()
            .map_err(|e| PipelineError::SourceUnavailable(e.message))?;
        if !opened {
            return Err(PipelineError::SourceUnavailable(format!(
                "cannot open video file: {}",
                path_str
            )));
        }

        let mut fps = capture.get(CAP_PROP_FPS)?;
        if fps <= 0.0 || !fps.is_finite() {
            warn!(fps, "source reports no usable frame rate, assuming 30");
            fps = 30.0;
        }
        let frame_count = capture.get(CAP_PROP_FRAME_COUNT)?.max(0.0) as u64;
        let width = capture.get(CAP_PROP_FRAME_WIDTH)? as i32;
        let height = capture.get(CAP_PROP_FRAME_HEIGHT)? as i32;

        info!(
            path = %path.display(),
            frame_count,
            fps,
            "video source opened"
        );

        Ok(Self {
            capture: Some(capture),
            fps,
            frame_count,
            frame_size: (width, height),
        })
    }
}

impl FrameSource for VideoFileSource {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn frame_size(&self) -> (i32, i32) {
        self.frame_size
    }

    fn seek(&mut self, frame_index: u64) -> Result<(), PipelineError> {
        if let Some(capture) = self.capture.as_mut() {
            capture.set(CAP_PROP_POS_FRAMES, frame_index as f64)?;
        }
        Ok(())
    }

    fn decode_next(&mut self) -> Result<Option<Mat>, PipelineError> {
        let capture = match self.capture.as_mut() {
            Some(capture) => capture,
            None => return Ok(None),
        };

        let mut frame = Mat::default();
        let got = capture.read(&mut frame)?;
        if !got || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                warn!(error = %e.message, "failed to release video capture");
            }
        }
    }
}

impl Drop for VideoFileSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// Sink factory writing timestamped output files into one directory.
#[derive(Debug, Clone)]
pub struct OutputDirectory {
    dir: PathBuf,
}

impl OutputDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn next_output_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        self.dir.join(format!("processed_{}.mp4", stamp))
    }
}

impl SinkFactory for OutputDirectory {
    fn open(&self, fps: f64, frame_size: (i32, i32)) -> Result<Box<dyn FrameSink>, PipelineError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.next_output_path();
        VideoFileSink::open(&path, fps, frame_size).map(|sink| Box::new(sink) as Box<dyn FrameSink>)
    }
}

/// Encoder for one annotated output video.
pub struct VideoFileSink {
    writer: Option<VideoWriter>,
    path: PathBuf,
}

impl VideoFileSink {
    pub fn open(path: &Path, fps: f64, frame_size: (i32, i32)) -> Result<Self, PipelineError> {
        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')
            .map_err(|e| PipelineError::EncodeFailure(e.message))?;
        let size = Size::new(frame_size.0, frame_size.1);
        let writer = VideoWriter::new(&path.to_string_lossy(), fourcc, fps, size, true)
            .map_err(|e| PipelineError::EncodeFailure(e.message))?;

        let opened = writer
            .is_opened()
            .map_err(|e| PipelineError::EncodeFailure(e.message))?;
        if !opened {
            return Err(PipelineError::EncodeFailure(format!(
                "cannot open output encoder: {}",
                path.display()
            )));
        }

        info!(path = %path.display(), fps, "output encoder opened");

        Ok(Self {
            writer: Some(writer),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSink for VideoFileSink {
    fn write(&mut self, frame: &Mat) -> Result<(), PipelineError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| PipelineError::EncodeFailure("output encoder is closed".to_string()))?;
        writer
            .write(frame)
            .map_err(|e| PipelineError::EncodeFailure(e.message))
    }

    fn close(&mut self) -> Result<(), PipelineError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .release()
                .map_err(|e| PipelineError::EncodeFailure(e.message))?;
        }
        Ok(())
    }
}

impl Drop for VideoFileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.release();
        }
    }
}
