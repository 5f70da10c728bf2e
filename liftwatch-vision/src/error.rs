//! Error types for liftwatch-vision

use thiserror::Error;

/// Pipeline error taxonomy.
///
/// Decode exhaustion is not here on purpose: reaching the end of the stream
/// is a normal terminal state and surfaces as `Ok(None)` from the source,
/// never as an error.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The video source is missing or cannot be opened. Fatal to start; not retried.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// The detector model failed to load. Pipelines refuse to start.
    #[error("Detector unavailable: {0}")]
    DetectorUnavailable(String),

    /// Another pipeline is already running; no state was mutated.
    #[error("Pipeline busy: {0}")]
    PipelineBusy(String),

    /// Realtime poll issued with no active run.
    #[error("Pipeline not running: {0}")]
    NotRunning(String),

    /// Output encoder failed to open or write. Aborts the batch run.
    #[error("Encode failure: {0}")]
    EncodeFailure(String),

    /// Drawing the overlay failed for one frame.
    #[error("Annotation error: {0}")]
    Annotation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Detection error: {0}")]
    Detection(String),

    #[error("OpenCV error: {0}")]
    OpenCv(String),

    #[error("ONNX Runtime error: {0}")]
    Ort(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Stable machine-readable tag for each error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SourceUnavailable(_) => "source_unavailable",
            PipelineError::DetectorUnavailable(_) => "detector_unavailable",
            PipelineError::PipelineBusy(_) => "pipeline_busy",
            PipelineError::NotRunning(_) => "not_running",
            PipelineError::EncodeFailure(_) => "encode_failure",
            PipelineError::Annotation(_) => "annotation",
            PipelineError::Config(_) => "config",
            PipelineError::Detection(_) => "detection",
            PipelineError::OpenCv(_) => "opencv",
            PipelineError::Ort(_) => "ort",
            PipelineError::Io(_) => "io",
        }
    }
}

impl From<opencv::Error> for PipelineError {
    fn from(err: opencv::Error) -> Self {
        PipelineError::OpenCv(err.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_message() {
        let err = PipelineError::SourceUnavailable("missing.mp4".to_string());
        assert!(err.to_string().contains("Source unavailable"));
        assert!(err.to_string().contains("missing.mp4"));
    }

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(
            PipelineError::SourceUnavailable(String::new()).kind(),
            "source_unavailable"
        );
        assert_eq!(
            PipelineError::DetectorUnavailable(String::new()).kind(),
            "detector_unavailable"
        );
        assert_eq!(
            PipelineError::PipelineBusy(String::new()).kind(),
            "pipeline_busy"
        );
        assert_eq!(
            PipelineError::EncodeFailure(String::new()).kind(),
            "encode_failure"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PipelineError = io_err.into();
        match err {
            PipelineError::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }
}
