use super::{BoundingBox, Detector, InferenceError, Prediction};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Copies the source into the run directory and reports canned classes per frame.
pub struct StubDetector {
    names: Vec<String>,
    frames: Vec<Vec<usize>>,
    fail: bool,
    calls: Mutex<Vec<PathBuf>>,
}

impl StubDetector {
    pub fn new(names: &[&str], frames: Vec<Vec<usize>>) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            frames,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[], Vec::new())
        }
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl Detector for StubDetector {
    fn predict(&self, source: &Path, output_dir: &Path) -> Result<Vec<Prediction>, InferenceError> {
        self.calls.lock().unwrap().push(source.to_path_buf());
        if self.fail {
            return Err(InferenceError::Video("stub failure".to_string()));
        }
        if let Some(name) = source.file_name() {
            fs::copy(source, output_dir.join(name))?;
        }
        Ok(self
            .frames
            .iter()
            .map(|classes| Prediction {
                names: self.names.clone(),
                boxes: classes
                    .iter()
                    .map(|&class_id| BoundingBox {
                        x1: 0.0,
                        y1: 0.0,
                        x2: 8.0,
                        y2: 8.0,
                        confidence: 0.8,
                        class_id,
                    })
                    .collect(),
            })
            .collect())
    }
}
