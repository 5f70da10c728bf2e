//! Utility functions for frame processing

use opencv::core::{Mat, Vec3f};
use opencv::prelude::*;

use crate::error::PipelineError;

/// Copy a resized CV_32FC3 frame into CHW channel order.
///
/// Expects the Mat to already be `width` x `height`, float, and channel
/// order RGB; the caller handles resize/color conversion so this stays a
/// plain reshape.
pub fn mat_to_chw_tensor(mat: &Mat, width: u32, height: u32) -> Result<Vec<f32>, PipelineError> {
    let plane = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| PipelineError::OpenCv("tensor dimensions overflow".to_string()))?;

    let pixels = mat
        .data_typed::<Vec3f>()
        .map_err(|e| PipelineError::OpenCv(format!("failed to read frame data: {}", e.message)))?;
    if pixels.len() != plane {
        return Err(PipelineError::OpenCv(format!(
            "frame is {} pixels, expected {}x{}",
            pixels.len(),
            width,
            height
        )));
    }

    let mut tensor = vec![0.0f32; plane * 3];
    for (i, px) in pixels.iter().enumerate() {
        for c in 0..3 {
            tensor[c * plane + i] = px[c];
        }
    }
    Ok(tensor)
}
