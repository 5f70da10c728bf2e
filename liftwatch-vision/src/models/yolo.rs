//! YOLO object detection over ONNX Runtime

use liftwatch_core::{BoundingBox, Detection};
use opencv::core::{Mat, CV_32F};
use opencv::imgproc;
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::Detector;
use crate::error::PipelineError;
use crate::utils::mat_to_chw_tensor;

/// Candidate pruning applied to raw model output before NMS. Model-output
/// hygiene only; the event-policy confidence gate lives in the pipelines.
const CANDIDATE_THRESHOLD: f32 = 0.25;
const NMS_THRESHOLD: f32 = 0.45;

/// YOLO model wrapper implementing the batched [`Detector`] contract.
pub struct YoloDetector {
    session: Arc<Session>,
    input_size: (u32, u32),
    class_names: Vec<String>,
}

impl YoloDetector {
    /// Load the model. Any load failure is `DetectorUnavailable`; callers
    /// treat it as fatal for pipeline start, not retried.
    pub fn new(
        model_path: &Path,
        input_size: (u32, u32),
        class_names: Vec<String>,
    ) -> Result<Self, PipelineError> {
        let _environment = Environment::builder()
            .with_name("liftwatch-vision")
            .build()
            .map_err(|e| {
                PipelineError::DetectorUnavailable(format!("failed to create ONNX environment: {}", e))
            })?;

        let session = Session::builder()
            .with_execution_providers([ort::ExecutionProvider::CPU(Default::default())])
            .commit_from_file(model_path)
            .map_err(|e| {
                PipelineError::DetectorUnavailable(format!(
                    "failed to load model {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        info!(model = %model_path.display(), "detector model loaded");

        Ok(Self {
            session: Arc::new(session),
            input_size,
            class_names,
        })
    }

    /// Resize, convert to RGB float and reshape one frame to CHW.
    fn preprocess(&self, frame: &Mat) -> Result<Vec<f32>, PipelineError> {
        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            opencv::core::Size::new(self.input_size.0 as i32, self.input_size.1 as i32),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )
        .map_err(|e| PipelineError::OpenCv(format!("failed to resize frame: {}", e.message)))?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
            .map_err(|e| PipelineError::OpenCv(format!("failed to convert color: {}", e.message)))?;

        let mut float_mat = Mat::default();
        rgb.convert_to(&mut float_mat, CV_32F, 1.0 / 255.0, 0.0)
            .map_err(|e| PipelineError::OpenCv(format!("failed to convert to float: {}", e.message)))?;

        mat_to_chw_tensor(&float_mat, self.input_size.0, self.input_size.1)
    }

    /// Stack preprocessed frames into one [N, 3, H, W] input tensor.
    fn batch_input(&self, frames: &[Mat]) -> Result<Value, PipelineError> {
        let (width, height) = self.input_size;
        let plane = (width * height) as usize * 3;
        let mut data = Vec::with_capacity(plane * frames.len());
        for frame in frames {
            data.extend(self.preprocess(frame)?);
        }

        let shape = vec![frames.len(), 3, height as usize, width as usize];
        let array = ort::ndarray::Array::from_shape_vec(shape, data)
            .map_err(|e| PipelineError::Ort(format!("failed to create input array: {}", e)))?;
        Value::from_array(array)
            .map_err(|e| PipelineError::Ort(format!("failed to create input value: {}", e)))
    }

    /// Decode one frame's slice of the output tensor.
    ///
    /// Output layout is the YOLO standard [batch, boxes, 5 + classes] with
    /// normalized center-form boxes.
    fn postprocess_frame(
        &self,
        output: &ort::ndarray::ArrayViewD<'_, f32>,
        batch_index: usize,
        frame: &Mat,
    ) -> Vec<Detection> {
        let shape = output.shape();
        if shape.len() < 3 {
            return Vec::new();
        }
        let boxes = shape[1];
        let num_classes = self.class_names.len().min(shape[2].saturating_sub(5));

        let frame_width = frame.cols() as f32;
        let frame_height = frame.rows() as f32;
        if frame_width <= 0.0 || frame_height <= 0.0 {
            return Vec::new();
        }

        let mut detections = Vec::new();
        for b in 0..boxes {
            let conf = match output.get([batch_index, b, 4]) {
                Some(conf) => *conf,
                None => break,
            };
            if conf < CANDIDATE_THRESHOLD {
                continue;
            }

            let mut best_class = 0usize;
            let mut best_prob = 0.0f32;
            for class_idx in 0..num_classes {
                if let Some(prob) = output.get([batch_index, b, 5 + class_idx]) {
                    if *prob > best_prob {
                        best_prob = *prob;
                        best_class = class_idx;
                    }
                }
            }

            let score = conf * best_prob;
            if score < CANDIDATE_THRESHOLD {
                continue;
            }

            let cx = output.get([batch_index, b, 0]).copied().unwrap_or(0.0);
            let cy = output.get([batch_index, b, 1]).copied().unwrap_or(0.0);
            let w = output.get([batch_index, b, 2]).copied().unwrap_or(0.0);
            let h = output.get([batch_index, b, 3]).copied().unwrap_or(0.0);
            if ![cx, cy, w, h].iter().all(|v| v.is_finite()) {
                continue;
            }
            if !(0.0..=1.0).contains(&cx) || !(0.0..=1.0).contains(&cy) || w <= 0.0 || h <= 0.0 {
                continue;
            }

            let x1 = ((cx - w / 2.0) * frame_width).clamp(0.0, frame_width - 1.0);
            let y1 = ((cy - h / 2.0) * frame_height).clamp(0.0, frame_height - 1.0);
            let x2 = ((cx + w / 2.0) * frame_width).clamp(0.0, frame_width - 1.0);
            let y2 = ((cy + h / 2.0) * frame_height).clamp(0.0, frame_height - 1.0);
            if x2 <= x1 || y2 <= y1 {
                continue;
            }

            detections.push(Detection::new(
                self.class_names[best_class].clone(),
                score,
                BoundingBox::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32),
            ));
        }

        non_max_suppression(detections, NMS_THRESHOLD)
    }
}

impl Detector for YoloDetector {
    fn detect(&self, frames: &[Mat]) -> Result<Vec<Vec<Detection>>, PipelineError> {
        if frames.is_empty() {
            return Ok(Vec::new());
        }

        let input = self.batch_input(frames)?;
        let outputs = self
            .session
            .run(vec![input])
            .map_err(|e| PipelineError::Ort(format!("inference failed: {}", e)))?;

        if outputs.is_empty() {
            return Err(PipelineError::Ort("model produced no output".to_string()));
        }
        let output = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Ort(format!("failed to extract output tensor: {}", e)))?;

        debug!(batch = frames.len(), shape = ?output.shape(), "detector output");

        let results = frames
            .iter()
            .enumerate()
            .map(|(i, frame)| self.postprocess_frame(&output, i, frame))
            .collect();
        Ok(results)
    }
}

/// Greedy NMS over corner-form boxes, highest confidence first.
fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return detections;
    }

    detections.retain(|d| d.confidence.is_finite());
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in detections {
        let overlaps = keep
            .iter()
            .any(|kept| iou(&kept.bbox, &candidate.bbox) > iou_threshold);
        if !overlaps {
            keep.push(candidate);
        }
    }
    keep
}

fn iou(a: &liftwatch_core::BoundingBox, b: &liftwatch_core::BoundingBox) -> f32 {
    let inter_x1 = a.x1.max(b.x1);
    let inter_y1 = a.y1.max(b.y1);
    let inter_x2 = a.x2.min(b.x2);
    let inter_y2 = a.y2.min(b.y2);
    if inter_x2 <= inter_x1 || inter_y2 <= inter_y1 {
        return 0.0;
    }

    let inter = ((inter_x2 - inter_x1) as f32) * ((inter_y2 - inter_y1) as f32);
    let area_a = (a.width() as f32) * (a.height() as f32);
    let area_b = (b.width() as f32) * (b.height() as f32);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        return 0.0;
    }
    inter / union
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, confidence: f32, bbox: (i32, i32, i32, i32)) -> Detection {
        Detection::new(
            label,
            confidence,
            BoundingBox::new(bbox.0, bbox.1, bbox.2, bbox.3),
        )
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(20, 20, 30, 30);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_iou_identical_is_one() {
        let a = BoundingBox::new(0, 0, 10, 10);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlapping_lower_confidence() {
        let dets = vec![
            det("EMT", 0.9, (0, 0, 100, 100)),
            det("EMT", 0.7, (5, 5, 105, 105)),
            det("person", 0.8, (200, 200, 260, 260)),
        ];
        let kept = non_max_suppression(dets, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert!(kept.iter().any(|d| d.label == "person"));
    }

    #[test]
    fn test_nms_keeps_non_overlapping() {
        let dets = vec![
            det("EMT", 0.9, (0, 0, 10, 10)),
            det("EMT", 0.8, (50, 50, 60, 60)),
        ];
        let kept = non_max_suppression(dets, 0.45);
        assert_eq!(kept.len(), 2);
    }
}
