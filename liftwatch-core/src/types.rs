//! Detection records produced by the detector adapter

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates (corner form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }
}

/// One classifier output for one frame. Transient; never stored as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Raw label as emitted by the model (pre-normalization).
    pub label: String,
    /// Confidence in [0, 1].
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_dimensions() {
        let bbox = BoundingBox::new(10, 20, 110, 80);
        assert_eq!(bbox.width(), 100);
        assert_eq!(bbox.height(), 60);
    }

    #[test]
    fn test_bbox_degenerate_is_clamped() {
        let bbox = BoundingBox::new(50, 50, 40, 40);
        assert_eq!(bbox.width(), 0);
        assert_eq!(bbox.height(), 0);
    }

    #[test]
    fn test_detection_serialization() {
        let det = Detection::new("EMT", 0.92, BoundingBox::new(1, 2, 3, 4));
        let json = serde_json::to_string(&det).unwrap();
        let back: Detection = serde_json::from_str(&json).unwrap();
        assert_eq!(back.label, "EMT");
        assert_eq!(back.bbox, det.bbox);
    }
}
