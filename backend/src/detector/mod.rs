pub mod annotate;
pub mod postprocess;
#[cfg(test)]
pub mod stub;
pub mod torch;
pub mod video;

use std::path::Path;

pub use torch::TorchDetector;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Failed to load model {path}: {source}")]
    ModelLoad {
        path: String,
        source: tch::TchError,
    },
    #[error("Model error: {0}")]
    Model(#[from] tch::TchError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Unexpected model output shape {0:?}")]
    OutputShape(Vec<i64>),
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),
    #[error("Video processing failed: {0}")]
    Video(String),
    #[error("Model lock poisoned")]
    Poisoned,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Box in original image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: usize,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Class-name comparison shared by the scanner and the annotator; case is ignored, Unicode included.
pub fn label_matches(name: &str, target: &str) -> bool {
    name.to_lowercase() == target.to_lowercase()
}

/// Detections for one image or one video frame.
#[derive(Debug, Clone, Default)]
pub struct Prediction {
    pub names: Vec<String>,
    pub boxes: Vec<BoundingBox>,
}

impl Prediction {
    /// Class names of the boxes; indices without a name are skipped.
    pub fn class_labels(&self) -> impl Iterator<Item = &str> {
        self.boxes
            .iter()
            .filter_map(|b| self.names.get(b.class_id))
            .map(String::as_str)
    }
}

/// Object detector that writes annotated output for `source` into `output_dir`.
pub trait Detector: Send + Sync {
    fn predict(&self, source: &Path, output_dir: &Path) -> Result<Vec<Prediction>, InferenceError>;
}
