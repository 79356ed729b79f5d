use super::{BoundingBox, InferenceError};
use crate::config::ModelConfig;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::{ArrayView2, Axis, s};

const PAD_VALUE: u8 = 114;

#[derive(Debug, Clone, Copy)]
pub struct DetectionParams {
    pub input_size: u32,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl From<&ModelConfig> for DetectionParams {
    fn from(config: &ModelConfig) -> Self {
        Self {
            input_size: config.input_size,
            conf_threshold: config.conf_threshold,
            iou_threshold: config.iou_threshold,
            max_detections: config.max_detections,
        }
    }
}

/// Aspect-preserving resize onto a square, gray-padded canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub gain: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub scaled_w: u32,
    pub scaled_h: u32,
    pub width: u32,
    pub height: u32,
    pub size: u32,
}

impl Letterbox {
    pub fn new(width: u32, height: u32, size: u32) -> Self {
        let gain = (size as f32 / width as f32).min(size as f32 / height as f32);
        let scaled_w = ((width as f32 * gain).round() as u32).clamp(1, size);
        let scaled_h = ((height as f32 * gain).round() as u32).clamp(1, size);
        Self {
            gain,
            pad_x: (size - scaled_w) / 2,
            pad_y: (size - scaled_h) / 2,
            scaled_w,
            scaled_h,
            width,
            height,
            size,
        }
    }

    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let resized = imageops::resize(image, self.scaled_w, self.scaled_h, FilterType::Triangle);
        let mut canvas = RgbImage::from_pixel(self.size, self.size, Rgb([PAD_VALUE; 3]));
        imageops::overlay(&mut canvas, &resized, self.pad_x as i64, self.pad_y as i64);
        canvas
    }

    /// Maps a point on the model canvas back onto the source image.
    pub fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        let ox = (x - self.pad_x as f32) / self.gain;
        let oy = (y - self.pad_y as f32) / self.gain;
        (
            ox.clamp(0.0, self.width as f32),
            oy.clamp(0.0, self.height as f32),
        )
    }
}

/// RGB pixels as planar `[3, h, w]` floats in `[0, 1]`.
pub fn to_chw(image: &RgbImage) -> Vec<f32> {
    let (w, h) = image.dimensions();
    let plane = (w * h) as usize;
    let mut chw = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in image.enumerate_pixels() {
        let idx = (y * w + x) as usize;
        for c in 0..3 {
            chw[c * plane + idx] = pixel[c] as f32 / 255.0;
        }
    }
    chw
}

/// Decodes YOLO output of shape `[1, 4 + nc, N]` or `[1, N, 4 + nc]`.
///
/// Each anchor holds `cx, cy, w, h` on the letterboxed canvas followed by one
/// score per class.
pub fn decode(
    output: &[f32],
    shape: &[i64],
    num_classes: usize,
    params: &DetectionParams,
    letterbox: &Letterbox,
) -> Result<Vec<BoundingBox>, InferenceError> {
    let attrs = 4 + num_classes;
    let shape_err = || InferenceError::OutputShape(shape.to_vec());

    let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
    let view = match dims.as_slice() {
        &[1, a, n] if a == attrs => ArrayView2::from_shape((a, n), output).map_err(|_| shape_err())?,
        &[1, n, a] if a == attrs => ArrayView2::from_shape((n, a), output)
            .map_err(|_| shape_err())?
            .reversed_axes(),
        _ => return Err(shape_err()),
    };

    let mut candidates = Vec::new();
    for anchor in view.axis_iter(Axis(1)) {
        let scores = anchor.slice(s![4..]);
        let Some((class_id, &confidence)) = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
        else {
            continue;
        };
        if confidence < params.conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        let (x1, y1) = letterbox.unmap(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.unmap(cx + w / 2.0, cy + h / 2.0);
        candidates.push(BoundingBox {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
        });
    }

    Ok(nms(candidates, params.iou_threshold, params.max_detections))
}

/// Greedy non-maximum suppression, highest confidence first.
pub fn nms(mut boxes: Vec<BoundingBox>, iou_threshold: f32, max_detections: usize) -> Vec<BoundingBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<BoundingBox> = Vec::new();
    for candidate in boxes {
        if keep.len() >= max_detections {
            break;
        }
        if keep.iter().all(|kept| kept.iou(&candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}
