use crate::detector::{Detector, InferenceError};
use crate::run::RunId;
use crate::scanner;
use crate::upload::SavedUpload;
use log::{info, warn};
use shared::DetectionOutcome;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to prepare run directory {path}: {source}")]
    RunDir {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Runs the detector on a stored upload in a fresh run directory and scans for `target_label`.
pub fn run_detection(
    detector: &dyn Detector,
    upload: &SavedUpload,
    predictions_root: &Path,
    target_label: &str,
) -> Result<DetectionOutcome, PipelineError> {
    let run_id = RunId::generate();
    let run_dir = predictions_root.join(run_id.as_str());
    fs::create_dir_all(&run_dir).map_err(|source| PipelineError::RunDir {
        path: run_dir.display().to_string(),
        source,
    })?;

    info!("Run {}: detecting on {}", run_id, upload.path.display());
    let predictions = match detector.predict(&upload.path, &run_dir) {
        Ok(predictions) => predictions,
        Err(e) => {
            if let Err(cleanup) = fs::remove_dir_all(&run_dir) {
                warn!("Run {}: failed to remove {}: {}", run_id, run_dir.display(), cleanup);
            }
            return Err(e.into());
        }
    };
    let drowning = scanner::contains_label(&predictions, target_label);
    info!(
        "Run {}: {} result(s), {} detected: {}",
        run_id,
        predictions.len(),
        target_label,
        drowning
    );

    Ok(DetectionOutcome {
        filename: upload.filename.clone(),
        run_id: run_id.to_string(),
        drowning,
        frames: predictions.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::stub::StubDetector;
    use shared::MediaKind;
    use tempfile::tempdir;

    fn saved(dir: &Path, name: &str, kind: MediaKind) -> SavedUpload {
        let path = dir.join(name);
        fs::write(&path, b"media").unwrap();
        SavedUpload {
            filename: name.to_string(),
            path,
            kind,
        }
    }

    #[test]
    fn writes_output_into_its_own_run_directory() {
        let uploads = tempdir().unwrap();
        let root = tempdir().unwrap();
        let upload = saved(uploads.path(), "sample.jpg", MediaKind::Image);
        let detector = StubDetector::new(&["Swimming", "Drowning"], vec![vec![0]]);

        let outcome = run_detection(&detector, &upload, root.path(), "drowning").unwrap();

        assert!(!outcome.drowning);
        assert_eq!(outcome.frames, 1);
        assert_eq!(detector.calls(), vec![upload.path.clone()]);
        assert!(root.path().join(&outcome.run_id).join("sample.jpg").is_file());
    }

    #[test]
    fn flags_drowning_in_any_frame() {
        let uploads = tempdir().unwrap();
        let root = tempdir().unwrap();
        let upload = saved(uploads.path(), "swimmer.mp4", MediaKind::Video);
        let detector =
            StubDetector::new(&["Swimming", "Drowning"], vec![vec![0], vec![], vec![0, 1]]);

        let outcome = run_detection(&detector, &upload, root.path(), "drowning").unwrap();

        assert!(outcome.drowning);
        assert_eq!(outcome.frames, 3);
        assert_eq!(outcome.filename, "swimmer.mp4");
    }

    #[test]
    fn consecutive_runs_do_not_share_directories() {
        let uploads = tempdir().unwrap();
        let root = tempdir().unwrap();
        let upload = saved(uploads.path(), "sample.jpg", MediaKind::Image);
        let detector = StubDetector::new(&["Drowning"], vec![vec![0]]);

        let first = run_detection(&detector, &upload, root.path(), "drowning").unwrap();
        let second = run_detection(&detector, &upload, root.path(), "drowning").unwrap();
        assert_ne!(first.run_id, second.run_id);
    }

    #[test]
    fn detector_failure_propagates() {
        let uploads = tempdir().unwrap();
        let root = tempdir().unwrap();
        let upload = saved(uploads.path(), "sample.jpg", MediaKind::Image);

        let err = run_detection(&StubDetector::failing(), &upload, root.path(), "drowning")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Inference(_)));
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
