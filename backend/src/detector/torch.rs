use super::annotate::draw_boxes;
use super::postprocess::{DetectionParams, Letterbox, decode, to_chw};
use super::video::Ffmpeg;
use super::{BoundingBox, Detector, InferenceError, Prediction};
use crate::config::{ModelConfig, VideoConfig};
use image::RgbImage;
use log::{debug, info};
use shared::{AllowedExtension, MediaKind};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tch::{CModule, Device, IValue, Kind, Tensor};

/// TorchScript YOLO detector. Inference calls are serialized on the module lock.
#[derive(Clone)]
pub struct TorchDetector {
    model: Arc<Mutex<CModule>>,
    device: Device,
    class_names: Vec<String>,
    target_label: String,
    params: DetectionParams,
    ffmpeg: Ffmpeg,
}

pub fn parse_device(spec: &str) -> Result<Device, InferenceError> {
    match spec.trim().to_ascii_lowercase().as_str() {
        "auto" => Ok(Device::cuda_if_available()),
        "cpu" => Ok(Device::Cpu),
        "cuda" => Ok(Device::Cuda(0)),
        other => other
            .strip_prefix("cuda:")
            .and_then(|index| index.parse().ok())
            .map(Device::Cuda)
            .ok_or_else(|| InferenceError::UnsupportedInput(format!("device {}", spec))),
    }
}

impl TorchDetector {
    pub fn load(model: &ModelConfig, video: &VideoConfig) -> Result<Self, InferenceError> {
        let device = parse_device(&model.device)?;
        let module =
            CModule::load_on_device(&model.path, device).map_err(|source| InferenceError::ModelLoad {
                path: model.path.display().to_string(),
                source,
            })?;
        info!(
            "Loaded model {} on {:?} with {} classes",
            model.path.display(),
            device,
            model.class_names.len()
        );

        Ok(Self {
            model: Arc::new(Mutex::new(module)),
            device,
            class_names: model.class_names.clone(),
            target_label: model.target_label.clone(),
            params: DetectionParams::from(model),
            ffmpeg: Ffmpeg::new(video.ffmpeg.clone(), video.sample_fps),
        })
    }

    fn forward(&self, input: Tensor) -> Result<Tensor, InferenceError> {
        let model = self.model.lock().map_err(|_| InferenceError::Poisoned)?;
        let output = tch::no_grad(|| model.forward_is(&[IValue::Tensor(input)]))?;
        match output {
            IValue::Tensor(tensor) => Ok(tensor),
            IValue::Tuple(values) | IValue::GenericList(values) => values
                .into_iter()
                .find_map(|value| match value {
                    IValue::Tensor(tensor) => Some(tensor),
                    _ => None,
                })
                .ok_or_else(|| InferenceError::OutputShape(Vec::new())),
            IValue::TensorList(mut tensors) if !tensors.is_empty() => Ok(tensors.remove(0)),
            _ => Err(InferenceError::OutputShape(Vec::new())),
        }
    }

    fn detect(&self, image: &RgbImage) -> Result<Vec<BoundingBox>, InferenceError> {
        let (width, height) = image.dimensions();
        let letterbox = Letterbox::new(width, height, self.params.input_size);
        let canvas = letterbox.apply(image);
        let size = self.params.input_size as i64;

        let input = Tensor::from_slice(&to_chw(&canvas))
            .view([1, 3, size, size])
            .to_device(self.device);
        let output = self
            .forward(input)?
            .to_device(Device::Cpu)
            .to_kind(Kind::Float)
            .contiguous();

        let shape = output.size();
        let numel = output.numel();
        let mut data = vec![0.0f32; numel];
        output.copy_data(&mut data, numel);

        decode(&data, &shape, self.class_names.len(), &self.params, &letterbox)
    }

    /// Detects on `input` and writes the annotated image to `output`.
    fn annotate_file(&self, input: &Path, output: &Path) -> Result<Prediction, InferenceError> {
        let mut image = image::open(input)?.to_rgb8();
        let boxes = self.detect(&image)?;
        draw_boxes(&mut image, &boxes, &self.class_names, &self.target_label);
        image.save(output)?;
        debug!("{} boxes in {}", boxes.len(), input.display());
        Ok(Prediction {
            names: self.class_names.clone(),
            boxes,
        })
    }

    fn predict_video(&self, source: &Path, output: &Path) -> Result<Vec<Prediction>, InferenceError> {
        let frames_dir = tempfile::Builder::new().prefix("frames-").tempdir()?;
        let frames = self.ffmpeg.extract_frames(source, frames_dir.path())?;
        info!(
            "Running detection on {} frames of {} at {} fps",
            frames.len(),
            source.display(),
            self.ffmpeg.fps()
        );

        let predictions = frames
            .iter()
            .map(|frame| self.annotate_file(frame, frame))
            .collect::<Result<Vec<_>, _>>()?;
        self.ffmpeg.encode_frames(frames_dir.path(), output)?;
        Ok(predictions)
    }
}

impl Detector for TorchDetector {
    fn predict(&self, source: &Path, output_dir: &Path) -> Result<Vec<Prediction>, InferenceError> {
        let file_name = source
            .file_name()
            .ok_or_else(|| InferenceError::UnsupportedInput(source.display().to_string()))?;
        let ext = AllowedExtension::from_filename(&file_name.to_string_lossy())
            .ok_or_else(|| InferenceError::UnsupportedInput(source.display().to_string()))?;

        let predictions = match ext.media_kind() {
            MediaKind::Image => vec![self.annotate_file(source, &output_dir.join(file_name))?],
            MediaKind::Video => {
                let stem = source
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "video".to_string());
                self.predict_video(source, &output_dir.join(format!("{}.mp4", stem)))?
            }
        };

        info!(
            "Prediction for {} wrote {} result(s) to {}",
            source.display(),
            predictions.len(),
            output_dir.display()
        );
        Ok(predictions)
    }
}
