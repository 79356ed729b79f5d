use super::InferenceError;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const FRAME_PATTERN: &str = "frame_%06d.png";

/// Synchronous wrapper around the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    bin: String,
    fps: u32,
}

impl Ffmpeg {
    pub fn new(bin: impl Into<String>, fps: u32) -> Self {
        Self {
            bin: bin.into(),
            fps: fps.max(1),
        }
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Samples `source` at the configured rate into PNG frames, returned in order.
    pub fn extract_frames(&self, source: &Path, frames_dir: &Path) -> Result<Vec<PathBuf>, InferenceError> {
        let pattern = frames_dir.join(FRAME_PATTERN);
        self.run(&[
            "-i".into(),
            source.display().to_string(),
            "-vf".into(),
            format!("fps={}", self.fps),
            pattern.display().to_string(),
        ])?;
        list_frames(frames_dir)
    }

    /// Encodes the frames in `frames_dir` into an H.264 file browsers can play.
    pub fn encode_frames(&self, frames_dir: &Path, output: &Path) -> Result<(), InferenceError> {
        let pattern = frames_dir.join(FRAME_PATTERN);
        self.run(&[
            "-framerate".into(),
            self.fps.to_string(),
            "-i".into(),
            pattern.display().to_string(),
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            output.display().to_string(),
        ])
    }

    fn run(&self, args: &[String]) -> Result<(), InferenceError> {
        debug!("Running {} {}", self.bin, args.join(" "));
        let output = Command::new(&self.bin)
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(args)
            .output()
            .map_err(|e| InferenceError::Video(format!("failed to start {}: {}", self.bin, e)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(InferenceError::Video(format!(
                "{} exited with {}: {}",
                self.bin,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

/// PNG frames in `dir`, sorted by name.
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, InferenceError> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "png") {
            frames.push(path);
        }
    }
    frames.sort();
    if frames.is_empty() {
        return Err(InferenceError::Video("no frames decoded".to_string()));
    }
    Ok(frames)
}
