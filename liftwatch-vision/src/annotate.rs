//! Detection overlay drawing and transport encoding

use liftwatch_core::Detection;
use opencv::core::{Mat, Point, Rect, Scalar, Vector};
use opencv::{imgcodecs, imgproc};

use crate::error::PipelineError;

const BOX_THICKNESS: i32 = 2;
const CAPTION_SCALE: f64 = 0.7;

fn overlay_color() -> Scalar {
    // BGR green
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

/// Draw a box and `label confidence` caption for every detection.
///
/// Callers pass already filtered, already normalized detections; no
/// thresholding happens here. The frame is the only thing mutated.
pub fn annotate(frame: &mut Mat, detections: &[Detection]) -> Result<(), PipelineError> {
    for det in detections {
        let rect = Rect::new(
            det.bbox.x1,
            det.bbox.y1,
            det.bbox.width(),
            det.bbox.height(),
        );
        imgproc::rectangle(frame, rect, overlay_color(), BOX_THICKNESS, imgproc::LINE_8, 0)
            .map_err(|e| PipelineError::Annotation(format!("failed to draw box: {}", e.message)))?;

        let caption = format!("{} {:.2}", det.label, det.confidence);
        let origin = Point::new(det.bbox.x1, (det.bbox.y1 - 10).max(0));
        imgproc::put_text(
            frame,
            &caption,
            origin,
            imgproc::FONT_HERSHEY_SIMPLEX,
            CAPTION_SCALE,
            overlay_color(),
            BOX_THICKNESS,
            imgproc::LINE_8,
            false,
        )
        .map_err(|e| PipelineError::Annotation(format!("failed to draw caption: {}", e.message)))?;
    }
    Ok(())
}

/// JPEG-encode a frame for transport to polling clients.
pub fn encode_jpeg(frame: &Mat) -> Result<Vec<u8>, PipelineError> {
    let mut buffer = Vector::<u8>::new();
    let ok = imgcodecs::imencode(".jpg", frame, &mut buffer, &Vector::new())
        .map_err(|e| PipelineError::EncodeFailure(format!("JPEG encode failed: {}", e.message)))?;
    if !ok {
        return Err(PipelineError::EncodeFailure(
            "JPEG encoder rejected frame".to_string(),
        ));
    }
    Ok(buffer.to_vec())
}
